//! The assembled samples × features dataset.

use super::metadata::{Variable, VariableType};
use crate::error::{CellscapeError, Result};
use crate::reduce::ReductionMethod;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};
use std::collections::HashMap;

/// A named annotation column with a declared kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationColumn {
    pub name: String,
    pub kind: VariableType,
    pub values: Vec<Variable>,
}

impl AnnotationColumn {
    pub fn new(name: &str, kind: VariableType, values: Vec<Variable>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            values,
        }
    }

    /// Build a continuous column from counts.
    pub fn from_counts(name: &str, counts: &[usize]) -> Self {
        Self::new(
            name,
            VariableType::Continuous,
            counts.iter().map(|&c| Variable::Continuous(c as f64)).collect(),
        )
    }

    /// Build an identifier echo column.
    pub fn from_ids(name: &str, ids: &[String]) -> Self {
        Self::new(
            name,
            VariableType::Identifier,
            ids.iter().map(|id| Variable::Categorical(id.clone())).collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered annotation columns sharing one row axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    n_rows: usize,
    columns: Vec<AnnotationColumn>,
}

impl Annotations {
    pub fn new(n_rows: usize) -> Self {
        Self {
            n_rows,
            columns: Vec::new(),
        }
    }

    /// Insert a column, replacing any column with the same name in place.
    pub fn insert(&mut self, column: AnnotationColumn) -> Result<()> {
        if column.len() != self.n_rows {
            return Err(CellscapeError::DimensionMismatch {
                expected: self.n_rows,
                actual: column.len(),
            });
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AnnotationColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn columns(&self) -> &[AnnotationColumn] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Keep only the given rows, in the given order.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            n_rows: indices.len(),
            columns: self
                .columns
                .iter()
                .map(|c| AnnotationColumn {
                    name: c.name.clone(),
                    kind: c.kind,
                    values: indices.iter().map(|&i| c.values[i].clone()).collect(),
                })
                .collect(),
        }
    }
}

/// 2D coordinates produced by one reduction method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub method: ReductionMethod,
    pub coordinates: Vec<[f64; 2]>,
}

impl Embedding {
    pub fn xs(&self) -> Vec<f64> {
        self.coordinates.iter().map(|c| c[0]).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.coordinates.iter().map(|c| c[1]).collect()
    }
}

/// Unified annotated dataset: samples as rows, features as columns.
#[derive(Debug, Clone)]
pub struct AssembledDataset {
    /// Sparse matrix in CSR format (samples × features)
    x: CsMat<f64>,
    sample_ids: Vec<String>,
    feature_ids: Vec<String>,
    /// Per-sample annotations
    obs: Annotations,
    /// Per-feature annotations
    var: Annotations,
    embeddings: Vec<Embedding>,
}

impl AssembledDataset {
    /// Create a dataset with empty annotations.
    pub fn new(x: CsMat<f64>, sample_ids: Vec<String>, feature_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = x.shape();
        if nrows != sample_ids.len() {
            return Err(CellscapeError::DimensionMismatch {
                expected: nrows,
                actual: sample_ids.len(),
            });
        }
        if ncols != feature_ids.len() {
            return Err(CellscapeError::DimensionMismatch {
                expected: ncols,
                actual: feature_ids.len(),
            });
        }
        Ok(Self {
            x,
            obs: Annotations::new(sample_ids.len()),
            var: Annotations::new(feature_ids.len()),
            sample_ids,
            feature_ids,
            embeddings: Vec::new(),
        })
    }

    /// Build the sparse matrix from a dense samples × features matrix.
    pub fn sparse_from_dense(dense: &DMatrix<f64>) -> CsMat<f64> {
        let (nrows, ncols) = dense.shape();
        let mut tri_mat = TriMat::new((nrows, ncols));
        for row in 0..nrows {
            for col in 0..ncols {
                let val = dense[(row, col)];
                if val != 0.0 {
                    tri_mat.add_triplet(row, col, val);
                }
            }
        }
        tri_mat.to_csr()
    }

    /// Number of samples.
    #[inline]
    pub fn n_obs(&self) -> usize {
        self.x.rows()
    }

    /// Number of features.
    #[inline]
    pub fn n_vars(&self) -> usize {
        self.x.cols()
    }

    /// Total number of stored non-zero entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.x.nnz()
    }

    #[inline]
    pub fn x(&self) -> &CsMat<f64> {
        &self.x
    }

    /// Value at (sample, feature), 0 for absent entries.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.x.get(row, col).copied().unwrap_or(0.0)
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    pub fn obs(&self) -> &Annotations {
        &self.obs
    }

    pub fn obs_mut(&mut self) -> &mut Annotations {
        &mut self.obs
    }

    pub fn var(&self) -> &Annotations {
        &self.var
    }

    pub fn var_mut(&mut self) -> &mut Annotations {
        &mut self.var
    }

    /// Names of the per-sample annotation columns, in order.
    pub fn available_columns(&self) -> Vec<String> {
        self.obs.names()
    }

    /// Attach an embedding, replacing one from the same method.
    pub fn set_embedding(&mut self, embedding: Embedding) -> Result<()> {
        if embedding.coordinates.len() != self.n_obs() {
            return Err(CellscapeError::DimensionMismatch {
                expected: self.n_obs(),
                actual: embedding.coordinates.len(),
            });
        }
        self.embeddings.retain(|e| e.method != embedding.method);
        self.embeddings.push(embedding);
        Ok(())
    }

    pub fn embedding(&self, method: ReductionMethod) -> Option<&Embedding> {
        self.embeddings.iter().find(|e| e.method == method)
    }

    /// Most recently attached embedding.
    pub fn latest_embedding(&self) -> Option<&Embedding> {
        self.embeddings.last()
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    /// Replace the matrix values, keeping both axes.
    pub fn replace_matrix(&mut self, x: CsMat<f64>) -> Result<()> {
        if x.rows() != self.x.rows() {
            return Err(CellscapeError::DimensionMismatch {
                expected: self.x.rows(),
                actual: x.rows(),
            });
        }
        if x.cols() != self.x.cols() {
            return Err(CellscapeError::DimensionMismatch {
                expected: self.x.cols(),
                actual: x.cols(),
            });
        }
        self.x = x;
        Ok(())
    }

    /// Dense copy of the matrix (samples × features).
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.n_obs(), self.n_vars());
        for (row, row_vec) in self.x.outer_iterator().enumerate() {
            for (col, &val) in row_vec.iter() {
                dense[(row, col)] = val;
            }
        }
        dense
    }

    /// Dense copy of one sample row.
    pub fn row_dense(&self, row: usize) -> Vec<f64> {
        let mut dense = vec![0.0; self.n_vars()];
        if let Some(row_vec) = self.x.outer_view(row) {
            for (col, &val) in row_vec.iter() {
                dense[col] = val;
            }
        }
        dense
    }

    /// Count strictly-positive entries per sample.
    pub fn expressed_per_sample(&self) -> Vec<usize> {
        self.x
            .outer_iterator()
            .map(|row| row.iter().filter(|(_, v)| **v > 0.0).count())
            .collect()
    }

    /// Count strictly-positive entries per feature.
    pub fn expressed_per_feature(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_vars()];
        for row_vec in self.x.outer_iterator() {
            for (col, &val) in row_vec.iter() {
                if val > 0.0 {
                    counts[col] += 1;
                }
            }
        }
        counts
    }

    /// Keep only the given samples, in the given order.
    pub fn subset_samples(&mut self, indices: &[usize]) -> Result<()> {
        let n_features = self.n_vars();
        let mut tri_mat = TriMat::new((indices.len(), n_features));
        let mut new_sample_ids = Vec::with_capacity(indices.len());

        for (new_row, &old_row) in indices.iter().enumerate() {
            if old_row >= self.n_obs() {
                return Err(CellscapeError::InvalidParameter(format!(
                    "Sample index {} out of bounds",
                    old_row
                )));
            }
            new_sample_ids.push(self.sample_ids[old_row].clone());
            if let Some(row_vec) = self.x.outer_view(old_row) {
                for (col, &val) in row_vec.iter() {
                    tri_mat.add_triplet(new_row, col, val);
                }
            }
        }

        self.x = tri_mat.to_csr();
        self.sample_ids = new_sample_ids;
        self.obs = self.obs.subset(indices);
        for embedding in &mut self.embeddings {
            embedding.coordinates = indices.iter().map(|&i| embedding.coordinates[i]).collect();
        }
        Ok(())
    }

    /// Keep only the given features, in the given order.
    pub fn subset_features(&mut self, indices: &[usize]) -> Result<()> {
        let col_map: HashMap<usize, usize> = indices
            .iter()
            .enumerate()
            .map(|(new_idx, &old_idx)| (old_idx, new_idx))
            .collect();

        let mut new_feature_ids = Vec::with_capacity(indices.len());
        for &old_col in indices {
            if old_col >= self.n_vars() {
                return Err(CellscapeError::InvalidParameter(format!(
                    "Feature index {} out of bounds",
                    old_col
                )));
            }
            new_feature_ids.push(self.feature_ids[old_col].clone());
        }

        let mut tri_mat = TriMat::new((self.n_obs(), indices.len()));
        for (row, row_vec) in self.x.outer_iterator().enumerate() {
            for (old_col, &val) in row_vec.iter() {
                if let Some(&new_col) = col_map.get(&old_col) {
                    tri_mat.add_triplet(row, new_col, val);
                }
            }
        }

        self.x = tri_mat.to_csr();
        self.feature_ids = new_feature_ids;
        self.var = self.var.subset(indices);
        Ok(())
    }
}
