//! Serde types for the chart and table payloads the page renders.
//!
//! The shapes mirror what the client-side charting runtime expects: a figure
//! is `{data, layout}`, each trace is a flat map carrying a `type` tag.
//! Fields that are unset are omitted from the wire output entirely.

use serde::Serialize;

/// Muted translucent style for the per-patient overlay lines.
const PATIENT_LINE: &str = "rgba(192,192,192,0.5)";
/// Highlighted style for the mean line.
const MEAN_LINE: &str = "rgba(255,165,0,0.8)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scatter(ScatterTrace),
    Scatterpolar(PolarTrace),
}

/// A markers-only 2-D scatter trace; point identity rides on `hovertext`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterTrace {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub mode: &'static str,
    pub hovertext: Vec<String>,
    pub hoverinfo: &'static str,
}

impl ScatterTrace {
    pub fn markers(x: Vec<f64>, y: Vec<f64>, hovertext: Vec<String>) -> Self {
        Self {
            x,
            y,
            mode: "markers",
            hovertext,
            hoverinfo: "text",
        }
    }
}

/// One radial line: the angular categories are the feature names, the radius
/// values are one patient's phenotype vector (or the selection mean).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolarTrace {
    pub r: Vec<Option<f64>>,
    pub theta: Vec<String>,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectgaps: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovertext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<LineStyle>,
}

impl PolarTrace {
    /// The empty trace shown before any selection: keeps the angular axis
    /// labels visible with nothing plotted.
    pub fn skeleton(theta: Vec<String>) -> Self {
        Self {
            r: Vec::new(),
            theta,
            mode: "lines",
            name: None,
            showlegend: None,
            connectgaps: None,
            hovertext: None,
            line: None,
        }
    }

    /// One selected patient's profile, muted, without a legend entry.
    /// Missing values stay as gaps and are visually connected.
    pub fn patient(key: &str, r: Vec<Option<f64>>, theta: Vec<String>) -> Self {
        Self {
            r,
            theta,
            mode: "lines",
            name: None,
            showlegend: Some(false),
            connectgaps: Some(true),
            hovertext: Some(key.to_string()),
            line: Some(LineStyle { color: PATIENT_LINE }),
        }
    }

    /// The feature-wise mean over the selection, highlighted and legended.
    pub fn mean(r: Vec<Option<f64>>, theta: Vec<String>) -> Self {
        Self {
            r,
            theta,
            mode: "lines",
            name: Some("mean".to_string()),
            showlegend: Some(true),
            connectgaps: Some(true),
            hovertext: None,
            line: Some(LineStyle { color: MEAN_LINE }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dragmode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovermode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
}

impl Layout {
    /// Scatter layout: lasso is the default drag tool so selection works
    /// without reaching for the modebar first.
    pub fn lasso() -> Self {
        Self {
            dragmode: Some("lasso"),
            hovermode: Some("closest"),
            showlegend: None,
        }
    }
}

/// Column definition for the metadata table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub key: String,
    pub cells: Vec<String>,
}

/// The metadata table spec: columns plus one row per selected patient.
/// `row_selectable` and `sortable` are rendered client-side as checkboxes
/// and click-to-sort headers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSpec {
    pub columns: Vec<Column>,
    pub rows: Vec<TableRow>,
    pub row_selectable: bool,
    pub sortable: bool,
}

impl TableSpec {
    /// The pre-selection state: no rows, no columns, nothing interactive.
    pub fn placeholder() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            row_selectable: false,
            sortable: false,
        }
    }

    pub fn with_columns(columns: Vec<Column>, rows: Vec<TableRow>) -> Self {
        Self {
            columns,
            rows,
            row_selectable: true,
            sortable: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polar_trace_is_tagged_and_omits_unset_fields() {
        let trace = Trace::Scatterpolar(PolarTrace::skeleton(vec!["A".into(), "B".into()]));
        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(json["type"], "scatterpolar");
        assert_eq!(json["mode"], "lines");
        assert_eq!(json["r"], serde_json::json!([]));
        assert_eq!(json["theta"], serde_json::json!(["A", "B"]));
        assert!(json.get("showlegend").is_none());
        assert!(json.get("line").is_none());
    }

    #[test]
    fn missing_radius_values_serialize_as_nulls() {
        let trace = PolarTrace::patient("P1", vec![Some(2.0), None], vec!["A".into(), "B".into()]);
        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(json["r"], serde_json::json!([2.0, null]));
        assert_eq!(json["connectgaps"], true);
        assert_eq!(json["showlegend"], false);
        assert_eq!(json["hovertext"], "P1");
        assert_eq!(json["line"]["color"], PATIENT_LINE);
    }

    #[test]
    fn mean_trace_carries_legend_entry() {
        let trace = PolarTrace::mean(vec![Some(3.0)], vec!["A".into()]);
        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(json["name"], "mean");
        assert_eq!(json["showlegend"], true);
        assert_eq!(json["line"]["color"], MEAN_LINE);
    }

    #[test]
    fn default_layout_serializes_empty() {
        let json = serde_json::to_string(&Layout::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
