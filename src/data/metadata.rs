//! Per-sample metadata handling.

use super::sample_table::ensure_unique;
use crate::error::{CellscapeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label used for samples or values that could not be resolved.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Tokens read as missing values.
const MISSING_TOKENS: [&str; 8] = ["", "NA", "na", "NaN", "nan", "N/A", "null", "None"];

/// Check whether a raw cell should be read as missing.
pub fn is_missing_token(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw.trim())
}

/// An annotation value that can be categorical, continuous or absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Categorical variable with string levels.
    Categorical(String),
    /// Continuous numeric variable.
    Continuous(f64),
    /// Missing in the source table.
    Missing,
    /// The sample had no counterpart in the source table.
    Unknown,
}

impl Variable {
    /// Check if this value is missing or unresolved.
    pub fn is_missing(&self) -> bool {
        matches!(self, Variable::Missing | Variable::Unknown)
    }

    /// Try to get as categorical string.
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Variable::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as continuous f64.
    pub fn as_continuous(&self) -> Option<f64> {
        match self {
            Variable::Continuous(v) => Some(*v),
            _ => None,
        }
    }

    /// Render the value as a table cell.
    pub fn to_cell(&self) -> String {
        match self {
            Variable::Categorical(s) => s.clone(),
            Variable::Continuous(v) => v.to_string(),
            Variable::Missing => String::new(),
            Variable::Unknown => UNKNOWN_LABEL.to_string(),
        }
    }
}

/// Declared kind of an annotation column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Categorical,
    Continuous,
    /// Echo of the row identifier; unique per row.
    Identifier,
}

/// Sample metadata keyed by sample identifier.
#[derive(Debug, Clone)]
pub struct MetadataTable {
    /// Sample IDs in order.
    sample_ids: Vec<String>,
    /// Column names.
    column_names: Vec<String>,
    /// Data stored as sample_id -> column_name -> Variable.
    data: HashMap<String, HashMap<String, Variable>>,
    /// Kind of each column.
    column_types: HashMap<String, VariableType>,
}

impl MetadataTable {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self {
            sample_ids: Vec::new(),
            column_names: Vec::new(),
            data: HashMap::new(),
            column_types: HashMap::new(),
        }
    }

    /// Build metadata from raw string cells.
    ///
    /// Columns are inferred as continuous if every non-missing value parses as
    /// a number, otherwise categorical. Rows shorter than the header are padded
    /// with missing values.
    pub fn from_raw(column_names: Vec<String>, rows: Vec<(String, Vec<String>)>) -> Result<Self> {
        let ids: Vec<String> = rows.iter().map(|(id, _)| id.clone()).collect();
        ensure_unique(&ids)?;
        ensure_unique(&column_names)?;

        let mut column_types = HashMap::new();
        for (col_idx, col_name) in column_names.iter().enumerate() {
            let all_numeric = rows.iter().all(|(_, values)| match values.get(col_idx) {
                None => true,
                Some(v) => is_missing_token(v) || v.trim().parse::<f64>().is_ok(),
            });
            let var_type = if all_numeric {
                VariableType::Continuous
            } else {
                VariableType::Categorical
            };
            column_types.insert(col_name.clone(), var_type);
        }

        let mut data = HashMap::new();
        for (sample_id, values) in rows {
            let mut sample_data = HashMap::new();
            for (col_idx, col_name) in column_names.iter().enumerate() {
                let var = match values.get(col_idx) {
                    None => Variable::Missing,
                    Some(raw) if is_missing_token(raw) => Variable::Missing,
                    Some(raw) => match column_types.get(col_name) {
                        Some(VariableType::Continuous) => raw
                            .trim()
                            .parse::<f64>()
                            .map(Variable::Continuous)
                            .unwrap_or(Variable::Missing),
                        _ => Variable::Categorical(raw.trim().to_string()),
                    },
                };
                sample_data.insert(col_name.clone(), var);
            }
            data.insert(sample_id, sample_data);
        }

        Ok(Self {
            sample_ids: ids,
            column_names,
            data,
            column_types,
        })
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Number of columns (variables).
    pub fn n_columns(&self) -> usize {
        self.column_names.len()
    }

    /// Get a variable value for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Variable> {
        self.data.get(sample_id).and_then(|m| m.get(column))
    }

    /// Get all values for a column, in sample order.
    pub fn column(&self, column: &str) -> Result<Vec<&Variable>> {
        if !self.has_column(column) {
            return Err(CellscapeError::MissingColumn(column.to_string()));
        }
        Ok(self
            .sample_ids
            .iter()
            .map(|sid| {
                self.data
                    .get(sid)
                    .and_then(|m| m.get(column))
                    .unwrap_or(&Variable::Missing)
            })
            .collect())
    }

    /// Get the kind of a column.
    pub fn column_type(&self, column: &str) -> Option<VariableType> {
        self.column_types.get(column).copied()
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.data.contains_key(sample_id)
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }
}

impl Default for MetadataTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_row(id: &str, values: &[&str]) -> (String, Vec<String>) {
        (id.to_string(), values.iter().map(|s| s.to_string()).collect())
    }

    fn create_test_metadata() -> MetadataTable {
        MetadataTable::from_raw(
            vec!["cluster".into(), "n_counts".into(), "batch".into()],
            vec![
                raw_row("AAAC-1", &["T cell", "1200", "1"]),
                raw_row("AAAG-1", &["B cell", "NA", "2"]),
                raw_row("AAAT-1", &["", "800", "b3"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_load_metadata() {
        let meta = create_test_metadata();
        assert_eq!(meta.n_samples(), 3);
        assert_eq!(meta.n_columns(), 3);
        assert_eq!(meta.sample_ids(), &["AAAC-1", "AAAG-1", "AAAT-1"]);
    }

    #[test]
    fn test_column_type_inference() {
        let meta = create_test_metadata();
        assert_eq!(meta.column_type("cluster"), Some(VariableType::Categorical));
        assert_eq!(meta.column_type("n_counts"), Some(VariableType::Continuous));
        // one non-numeric value makes the whole column categorical
        assert_eq!(meta.column_type("batch"), Some(VariableType::Categorical));
    }

    #[test]
    fn test_missing_values() {
        let meta = create_test_metadata();
        assert_eq!(meta.get("AAAG-1", "n_counts"), Some(&Variable::Missing));
        assert_eq!(meta.get("AAAT-1", "cluster"), Some(&Variable::Missing));
        assert_eq!(meta.get("AAAC-1", "n_counts").unwrap().as_continuous(), Some(1200.0));
    }

    #[test]
    fn test_short_rows_padded() {
        let meta = MetadataTable::from_raw(
            vec!["a".into(), "b".into()],
            vec![raw_row("s1", &["x"])],
        )
        .unwrap();
        assert_eq!(meta.get("s1", "b"), Some(&Variable::Missing));
    }

    #[test]
    fn test_duplicate_rows_rejected() {
        let result = MetadataTable::from_raw(
            vec!["a".into()],
            vec![raw_row("s1", &["x"]), raw_row("s1", &["y"])],
        );
        assert!(matches!(result, Err(CellscapeError::DuplicateIdentifier(_))));
    }

    #[test]
    fn test_missing_column() {
        let meta = create_test_metadata();
        assert!(matches!(meta.column("nope"), Err(CellscapeError::MissingColumn(_))));
    }
}
