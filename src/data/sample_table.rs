//! Dense expression table as delivered by a table reader.

use crate::error::{CellscapeError, Result};
use nalgebra::DMatrix;
use std::collections::HashSet;

/// An expression matrix with labelled axes.
///
/// Rows represent features (genes), columns represent samples (cells),
/// matching the layout of most exported expression matrices.
#[derive(Debug, Clone)]
pub struct SampleTable {
    /// Dense values (features × samples)
    data: DMatrix<f64>,
    /// Feature identifiers (row names)
    feature_ids: Vec<String>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
}

impl SampleTable {
    /// Create a new SampleTable from a dense matrix and identifiers.
    ///
    /// Fails when the identifier counts disagree with the matrix shape or when
    /// an identifier repeats within an axis.
    pub fn new(
        data: DMatrix<f64>,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != feature_ids.len() {
            return Err(CellscapeError::DimensionMismatch {
                expected: nrows,
                actual: feature_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(CellscapeError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        ensure_unique(&feature_ids)?;
        ensure_unique(&sample_ids)?;
        Ok(Self {
            data,
            feature_ids,
            sample_ids,
        })
    }

    /// Build a table from row-major feature rows.
    pub fn from_rows(
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
        rows: &[Vec<f64>],
    ) -> Result<Self> {
        let n_samples = sample_ids.len();
        if rows.len() != feature_ids.len() {
            return Err(CellscapeError::DimensionMismatch {
                expected: feature_ids.len(),
                actual: rows.len(),
            });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != n_samples) {
            return Err(CellscapeError::DimensionMismatch {
                expected: n_samples,
                actual: bad.len(),
            });
        }
        let data = DMatrix::from_fn(rows.len(), n_samples, |r, c| rows[r][c]);
        Self::new(data, feature_ids, sample_ids)
    }

    /// Get the value at (feature, sample).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Number of features (rows).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Feature identifiers.
    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get the underlying matrix.
    #[inline]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Count strictly-positive entries per sample.
    pub fn expressed_per_sample(&self) -> Vec<usize> {
        self.data
            .column_iter()
            .map(|col| col.iter().filter(|&&v| v > 0.0).count())
            .collect()
    }

    /// Count strictly-positive entries per feature.
    pub fn expressed_per_feature(&self) -> Vec<usize> {
        self.data
            .row_iter()
            .map(|row| row.iter().filter(|&&v| v > 0.0).count())
            .collect()
    }
}

pub(crate) fn ensure_unique(ids: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(CellscapeError::DuplicateIdentifier(id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_table() -> SampleTable {
        // 3 features × 4 samples
        SampleTable::from_rows(
            vec!["GAPDH".into(), "CD3E".into(), "MS4A1".into()],
            vec!["c1".into(), "c2".into(), "c3".into(), "c4".into()],
            &[
                vec![10.0, 20.0, 0.0, 5.0],
                vec![1.0, 0.0, 0.0, 3.0],
                vec![0.0, 0.0, -1.0, 0.5],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_dimensions() {
        let table = create_test_table();
        assert_eq!(table.n_features(), 3);
        assert_eq!(table.n_samples(), 4);
        assert_eq!(table.get(0, 1), 20.0);
    }

    #[test]
    fn test_expressed_counts_ignore_non_positive() {
        let table = create_test_table();
        assert_eq!(table.expressed_per_sample(), vec![2, 1, 0, 3]);
        assert_eq!(table.expressed_per_feature(), vec![3, 2, 1]);
    }

    #[test]
    fn test_duplicate_sample_rejected() {
        let result = SampleTable::from_rows(
            vec!["g1".into()],
            vec!["c1".into(), "c1".into()],
            &[vec![1.0, 2.0]],
        );
        assert!(matches!(result, Err(CellscapeError::DuplicateIdentifier(id)) if id == "c1"));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = SampleTable::from_rows(
            vec!["g1".into(), "g2".into()],
            vec!["c1".into(), "c2".into()],
            &[vec![1.0, 2.0], vec![1.0]],
        );
        assert!(matches!(
            result,
            Err(CellscapeError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_zero_features_allowed_at_table_level() {
        let table = SampleTable::from_rows(vec![], vec!["c1".into()], &[]).unwrap();
        assert_eq!(table.n_features(), 0);
        assert_eq!(table.n_samples(), 1);
    }
}
