//! Error types for the cellscape library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum CellscapeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid numeric value '{value}' at row {row}, column {col}")]
    InvalidValue {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Duplicate identifier '{0}'")]
    DuplicateIdentifier(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Cannot construct dataset: {0}")]
    Construction(String),

    #[error("Reduction method '{0}' is not available in this engine")]
    UnsupportedMethod(String),

    #[error("Unknown reduction method '{0}'")]
    UnknownMethod(String),

    #[error("Degenerate data: {0}")]
    DegenerateData(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, CellscapeError>;
