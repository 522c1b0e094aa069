//! Scatter plot of cohort AF against gnomAD AF, coloured by subtype.

use crate::chart::{Axis, Figure, Layout, Legend, Marker, Mode, Trace, TraceType};
use crate::error::ChartError;
use crate::frame::Frame;

use serde_json::Value;

/// Label of the group holding rows without a subtype.
pub const NO_SUBTYPE: &str = "(none)";

/// Plotly's default qualitative palette, cycled across groups.
const PALETTE: [&str; 10] = [
    "#636efa", "#EF553B", "#00cc96", "#ab63fa", "#FFA15A", "#19d3f3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

const HOVER_TEMPLATE: &str = "subtype=%{fullData.name}<br>af=%{x}<br>gnomad_af=%{y}<br>\
ID=%{customdata[0]}<br>symbol=%{customdata[1]}<br>mean_diff=%{customdata[2]}<extra></extra>";

/// Points of one subtype.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Group {
    pub subtype: String,
    pub af: Vec<f64>,
    pub gnomad_af: Vec<f64>,
    /// `[ID, symbol, mean_diff]` per point
    pub hover: Vec<[Value; 3]>,
}

/// Group rows by subtype, in order of first appearance over all rows.
///
/// Rows without a finite `af` and `gnomad_af` still register their subtype but add no point, so
/// legend order and colours do not depend on which rows are plottable.
///
/// # Arguments
///
/// * `frame`: Result with `ID`, `symbol`, `subtype`, `af`, `gnomad_af` and `mean_diff` columns
pub fn group(frame: &Frame) -> Result<Vec<Group>, ChartError> {
    let ids = frame.strings("ID")?;
    let symbols = frame.strings("symbol")?;
    let subtypes = frame.strings("subtype")?;
    let af = frame.floats("af")?;
    let gnomad_af = frame.floats("gnomad_af")?;
    let mean_diff = frame.floats("mean_diff")?;

    let mut groups: Vec<Group> = Vec::new();
    for row in 0..frame.num_rows() {
        let subtype = subtypes[row].as_deref().unwrap_or(NO_SUBTYPE);
        let index = match groups.iter().position(|g| g.subtype == subtype) {
            Some(index) => index,
            None => {
                groups.push(Group {
                    subtype: subtype.to_string(),
                    ..Default::default()
                });
                groups.len() - 1
            }
        };
        let (Some(x), Some(y)) = (af[row], gnomad_af[row]) else {
            continue;
        };
        if !x.is_finite() || !y.is_finite() {
            continue;
        }
        let group = &mut groups[index];
        group.af.push(x);
        group.gnomad_af.push(y);
        group.hover.push([
            ids[row].clone().map_or(Value::Null, Value::from),
            symbols[row].clone().map_or(Value::Null, Value::from),
            mean_diff[row]
                .filter(|v| v.is_finite())
                .map_or(Value::Null, Value::from),
        ]);
    }
    Ok(groups)
}

/// Convert groups into a figure with one marker trace per subtype.
pub fn figure(groups: Vec<Group>) -> Figure {
    let mut layout = Layout::white(
        "AF vs gnomAD AF Scatter Plot",
        Axis::titled("af"),
        Axis::titled("gnomad_af"),
    );
    layout.legend = Some(Legend {
        title: Some("subtype".into()),
    });
    let mut figure = Figure::new(layout);
    for (i, group) in groups.into_iter().enumerate() {
        let mut trace = Trace::new(
            TraceType::Scatter,
            &group.subtype,
            Mode::Markers,
            group.af,
            group.gnomad_af,
        );
        trace.marker = Some(Marker {
            color: Some(PALETTE[i % PALETTE.len()].to_string()),
            ..Default::default()
        });
        trace.legendgroup = Some(group.subtype);
        trace.customdata = Some(group.hover.into_iter().map(Vec::from).collect());
        trace.hovertemplate = Some(HOVER_TEMPLATE.to_string());
        figure.add_trace(trace);
    }
    figure
}

/// Build the scatter figure from a query result.
pub fn build(frame: &Frame) -> Result<Figure, ChartError> {
    Ok(figure(group(frame)?))
}
