//! Plot payloads handed to the front end.

use super::color::{ColorChannel, ColorEncoding, ColorType};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Line printed before the payload JSON on stdout.
pub const PLOT_DATA_START: &str = "=== PLOT_DATA_START ===";
/// Line printed after the payload JSON on stdout.
pub const PLOT_DATA_END: &str = "=== PLOT_DATA_END ===";

/// A renderable scatter: coordinates plus color channel, index-aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotPayload {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Same values as `color_values`, kept for older front ends.
    pub color: ColorChannel,
    pub color_values: ColorChannel,
    pub color_type: ColorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    pub method: String,
    pub n_cells: usize,
    pub available_columns: Vec<String>,
    pub used_color_column: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_path: Option<String>,
}

/// Payload returned in place of a plot when the pipeline fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    pub success: bool,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub color: Vec<f64>,
    pub color_type: String,
}

impl ErrorPayload {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            success: false,
            x: Vec::new(),
            y: Vec::new(),
            color: Vec::new(),
            color_type: "error".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlotResponse {
    Plot(PlotPayload),
    Error(ErrorPayload),
}

impl PlotResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Plot(_))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// JSON framed by the start/end marker lines.
    pub fn to_framed_json(&self) -> Result<String> {
        Ok(format!(
            "{}\n{}\n{}",
            PLOT_DATA_START,
            self.to_json()?,
            PLOT_DATA_END
        ))
    }
}

impl From<PlotPayload> for PlotResponse {
    fn from(payload: PlotPayload) -> Self {
        Self::Plot(payload)
    }
}

impl From<ErrorPayload> for PlotResponse {
    fn from(payload: ErrorPayload) -> Self {
        Self::Error(payload)
    }
}

/// Merge coordinates and a color encoding into one payload.
///
/// Index `i` of `x`, `y` and the color channel all refer to input sample `i`.
pub fn build_payload(
    coordinates: &[[f64; 2]],
    encoding: &ColorEncoding,
    method_name: &str,
    sample_count: usize,
    available_columns: &[String],
    selected_column: &str,
) -> PlotPayload {
    PlotPayload {
        x: coordinates.iter().map(|c| c[0]).collect(),
        y: coordinates.iter().map(|c| c[1]).collect(),
        color: encoding.channel.clone(),
        color_values: encoding.channel.clone(),
        color_type: encoding.color_type,
        categories: encoding.categories.clone(),
        method: method_name.to_uppercase(),
        n_cells: sample_count,
        available_columns: available_columns.to_vec(),
        used_color_column: selected_column.to_string(),
        success: true,
        saved_path: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Variable;
    use crate::encode::color::{encode_categorical, encode_continuous};
    use serde_json::Value;

    fn create_test_encoding() -> ColorEncoding {
        encode_categorical(
            "cluster",
            &[
                Variable::Categorical("T".into()),
                Variable::Missing,
                Variable::Categorical("B".into()),
            ],
        )
    }

    #[test]
    fn test_index_alignment() {
        let coords = [[1.0, -1.0], [2.0, -2.0], [3.0, -3.0]];
        let payload = build_payload(
            &coords,
            &create_test_encoding(),
            "umap",
            3,
            &["cluster".to_string()],
            "cluster",
        );

        assert_eq!(payload.x, vec![1.0, 2.0, 3.0]);
        assert_eq!(payload.y, vec![-1.0, -2.0, -3.0]);
        assert_eq!(payload.color_values, ColorChannel::Codes(vec![0, 2, 1]));
        assert_eq!(payload.color, payload.color_values);
        assert_eq!(payload.method, "UMAP");
        assert_eq!(payload.n_cells, 3);
    }

    #[test]
    fn test_json_shape() {
        let payload = build_payload(
            &[[0.5, 0.25]],
            &encode_continuous("score", &[Variable::Continuous(2.5)]),
            "pca",
            1,
            &["score".to_string()],
            "score",
        );
        let text = PlotResponse::from(payload).to_json().unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(json["color_type"], "continuous");
        assert_eq!(json["success"], true);
        assert_eq!(json["color_values"][0], 2.5);
        assert!(json.get("categories").is_none());
        assert!(json.get("saved_path").is_none());
    }

    #[test]
    fn test_error_payload() {
        let response = PlotResponse::from(ErrorPayload::new("analysis failed: empty table"));
        assert!(!response.is_success());

        let framed = response.to_framed_json().unwrap();
        let lines: Vec<&str> = framed.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], PLOT_DATA_START);
        assert_eq!(lines[2], PLOT_DATA_END);

        let json: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["color_type"], "error");
        assert_eq!(json["x"], Value::Array(vec![]));
        assert_eq!(json["color"], Value::Array(vec![]));
    }
}
