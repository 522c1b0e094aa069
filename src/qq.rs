//! Q-Q plot of control against case frequency per subtype.

use crate::chart::{Axis, Dash, Figure, Layout, Line, Marker, Mode, Trace, TraceType};
use crate::error::ChartError;
use crate::frame::Frame;

use ndarray::Array1;
use ndarray_stats::QuantileExt;
use strum_macros::Display;

/// Message returned in place of a chart when the query returns no rows.
pub const NO_DATA_MESSAGE: &str = "No valid data returned from BigQuery";

/// Subtypes compared in the Q-Q plot.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Subtype {
    AIS,
    IIS,
    JIS,
}

impl Subtype {
    /// All subtypes in plotting order.
    pub const ALL: [Subtype; 3] = [Subtype::AIS, Subtype::IIS, Subtype::JIS];

    /// Marker colour.
    pub fn color(self) -> &'static str {
        match self {
            Self::AIS => "#1f77b4",
            Self::IIS => "#ff7f0e",
            Self::JIS => "#2ca02c",
        }
    }
}

/// Sorted, equal-length control and case frequencies for one subtype.
#[derive(Clone, Debug, PartialEq)]
pub struct QqSeries {
    pub subtype: Subtype,
    pub control: Vec<f64>,
    pub case: Vec<f64>,
}

/// Data behind a Q-Q plot.
#[derive(Clone, Debug, PartialEq)]
pub struct QqPlot {
    /// One series per subtype present, in [Subtype::ALL] order
    pub series: Vec<QqSeries>,
    /// Lower and upper end of the `y = x` reference line
    pub diagonal: (f64, f64),
}

/// Sort control and case values independently and truncate both to the shorter length.
pub fn quantile_pairs(mut control: Vec<f64>, mut case: Vec<f64>) -> (Vec<f64>, Vec<f64>) {
    control.sort_by(f64::total_cmp);
    case.sort_by(f64::total_cmp);
    let len = control.len().min(case.len());
    control.truncate(len);
    case.truncate(len);
    (control, case)
}

/// Build the Q-Q plot data from a query result.
///
/// Returns `None` if the result has no rows. Rows with nulls or non-finite values are then
/// dropped. If none survive, the plot has no series and a NaN diagonal.
///
/// # Arguments
///
/// * `frame`: Result with `subtype`, `control_percent` and `case_percent` columns
pub fn build(frame: Frame) -> Result<Option<QqPlot>, ChartError> {
    if frame.is_empty() {
        return Ok(None);
    }
    let frame = frame.drop_invalid();
    let subtypes = frame.strings("subtype")?;
    // Cleaned frames hold no nulls.
    let control: Array1<f64> = frame.floats("control_percent")?.into_iter().flatten().collect();
    let case: Array1<f64> = frame.floats("case_percent")?.into_iter().flatten().collect();

    let mut series = Vec::with_capacity(Subtype::ALL.len());
    for subtype in Subtype::ALL {
        let label = subtype.to_string();
        let rows: Vec<usize> = subtypes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.as_deref() == Some(label.as_str()))
            .map(|(i, _)| i)
            .collect();
        if rows.is_empty() {
            continue;
        }
        let (control, case) = quantile_pairs(
            rows.iter().map(|i| control[*i]).collect(),
            rows.iter().map(|i| case[*i]).collect(),
        );
        series.push(QqSeries {
            subtype,
            control,
            case,
        });
    }

    let min = control.min_skipnan().min(*case.min_skipnan());
    let max = control.max_skipnan().max(*case.max_skipnan());
    Ok(Some(QqPlot {
        series,
        diagonal: (min, max),
    }))
}

impl QqPlot {
    /// Convert into a figure: one WebGL marker trace per subtype plus a dashed diagonal.
    pub fn figure(self) -> Figure {
        let mut layout = Layout::white(
            "QQ Plot: Control vs Case Frequency (AIS, IIS, JIS)",
            Axis {
                showline: Some(true),
                ..Axis::titled("Control Frequency")
            },
            Axis {
                showline: Some(true),
                ..Axis::titled("Case Frequency")
            },
        );
        layout.width = Some(1000);
        layout.height = Some(700);
        let mut figure = Figure::new(layout);

        for series in self.series {
            let mut trace = Trace::new(
                TraceType::Scattergl,
                &series.subtype.to_string(),
                Mode::Markers,
                series.control,
                series.case,
            );
            trace.marker = Some(Marker {
                size: Some(4.0),
                opacity: Some(0.6),
                color: Some(series.subtype.color().to_string()),
            });
            figure.add_trace(trace);
        }

        let (min, max) = self.diagonal;
        let mut diagonal = Trace::new(
            TraceType::Scatter,
            "y = x",
            Mode::Lines,
            vec![min, max],
            vec![min, max],
        );
        diagonal.line = Some(Line {
            dash: Some(Dash::Dash),
            color: Some("black".to_string()),
        });
        figure.add_trace(diagonal);
        figure
    }
}
