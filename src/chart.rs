//! Plotly figure model and HTML rendering.
//!
//! Only the subset of the Plotly schema used by the charts in this crate is modelled. Figures
//! are serialised with serde and rendered client-side by plotly.js loaded from the CDN.

use crate::error::ChartError;

use serde::{Serialize, Serializer};
use strum_macros::Display;

/// plotly.js bundle referenced by rendered pages.
pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Serialise floats, writing non-finite values as `null` (a gap in Plotly).
fn finite_or_null<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(values.iter().map(|v| v.is_finite().then_some(*v)))
}

/// Trace type.
#[derive(Clone, Copy, Debug, Display, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TraceType {
    /// SVG scatter
    Scatter,
    /// WebGL scatter, for large point counts
    Scattergl,
}

/// Drawing mode of a scatter trace.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Markers,
    Lines,
}

/// Line dash style.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dash {
    Solid,
    Dash,
    Dot,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Marker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Line {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<Dash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A scatter trace.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub trace_type: TraceType,
    pub name: String,
    pub mode: Mode,
    #[serde(serialize_with = "finite_or_null")]
    pub x: Vec<f64>,
    #[serde(serialize_with = "finite_or_null")]
    pub y: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legendgroup: Option<String>,
    /// Per-point values available to the hover template as `%{customdata[i]}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customdata: Option<Vec<Vec<serde_json::Value>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovertemplate: Option<String>,
}

impl Trace {
    /// Return a new trace with no styling.
    pub fn new(trace_type: TraceType, name: &str, mode: Mode, x: Vec<f64>, y: Vec<f64>) -> Self {
        Trace {
            trace_type,
            name: name.to_string(),
            mode,
            x,
            y,
            marker: None,
            line: None,
            legendgroup: None,
            customdata: None,
            hovertemplate: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

impl From<&str> for Title {
    fn from(text: &str) -> Self {
        Title {
            text: text.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gridcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zeroline: Option<bool>,
}

impl Axis {
    /// An axis with a title, styled for a white background.
    pub fn titled(title: &str) -> Self {
        Axis {
            title: Some(title.into()),
            gridcolor: Some("#ebf0f8".to_string()),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Legend {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    pub xaxis: Axis,
    pub yaxis: Axis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_bgcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_bgcolor: Option<String>,
}

impl Layout {
    /// A layout on a white background, approximating Plotly's `plotly_white` template.
    pub fn white(title: &str, xaxis: Axis, yaxis: Axis) -> Self {
        Layout {
            title: Some(title.into()),
            xaxis,
            yaxis,
            paper_bgcolor: Some("white".to_string()),
            plot_bgcolor: Some("white".to_string()),
            ..Default::default()
        }
    }
}

/// A figure: traces plus layout.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn new(layout: Layout) -> Self {
        Figure {
            data: vec![],
            layout,
        }
    }

    pub fn add_trace(&mut self, trace: Trace) {
        self.data.push(trace);
    }

    /// Render the figure as a self-contained HTML document.
    ///
    /// plotly.js is loaded from [PLOTLY_CDN].
    pub fn to_html(&self) -> Result<String, ChartError> {
        let data = script_json(&self.data)?;
        let layout = script_json(&self.layout)?;
        let title = self
            .layout
            .title
            .as_ref()
            .map(|t| html_escape(&t.text))
            .unwrap_or_default();
        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<title>{title}</title>
<script src="{PLOTLY_CDN}" charset="utf-8"></script>
</head>
<body>
<div id="chart" class="plotly-graph-div" style="height:100%; width:100%;"></div>
<script type="text/javascript">
Plotly.newPlot("chart", {data}, {layout}, {{"responsive": true}});
</script>
</body>
</html>
"#
        ))
    }
}

/// Serialise a value as JSON safe for embedding in a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> Result<String, ChartError> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
