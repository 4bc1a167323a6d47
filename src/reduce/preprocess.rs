//! Quick preprocessing ahead of dimensionality reduction.
//!
//! Filtering, per-sample depth normalization, log transform and selection of
//! the most variable features. Every step keeps the dataset's annotations
//! aligned with the samples and features that remain.

use crate::assemble::attach_derived_columns;
use crate::data::AssembledDataset;
use crate::error::{CellscapeError, Result};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sprs::TriMat;
use statrs::statistics::Statistics;

/// Preprocessing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Drop samples with fewer expressed features.
    pub min_genes: usize,
    /// Drop features expressed in fewer samples.
    pub min_cells: usize,
    /// Per-sample total after depth normalization.
    pub target_sum: f64,
    /// Apply `ln(1 + x)` after normalization.
    pub log_transform: bool,
    /// Number of highest-variance features kept.
    pub n_top_genes: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            min_genes: 50,
            min_cells: 1,
            target_sum: 1e4,
            log_transform: true,
            n_top_genes: 2000,
        }
    }
}

/// Run every preprocessing step in order.
pub fn preprocess(dataset: &mut AssembledDataset, config: &PreprocessConfig) -> Result<()> {
    let (n_obs, n_vars) = (dataset.n_obs(), dataset.n_vars());

    filter_cells(dataset, config.min_genes)?;
    filter_genes(dataset, config.min_cells)?;
    normalize_total(dataset, config.target_sum)?;
    if config.log_transform {
        log1p(dataset)?;
    }
    select_variable_features(dataset, config.n_top_genes)?;
    attach_derived_columns(dataset)?;

    info!(
        "preprocessed {} x {} -> {} samples x {} features",
        n_obs,
        n_vars,
        dataset.n_obs(),
        dataset.n_vars()
    );
    Ok(())
}

/// Keep samples with at least `min_genes` expressed features.
///
/// Returns the number of samples removed.
pub fn filter_cells(dataset: &mut AssembledDataset, min_genes: usize) -> Result<usize> {
    let keep: Vec<usize> = dataset
        .expressed_per_sample()
        .iter()
        .enumerate()
        .filter(|(_, &n)| n >= min_genes)
        .map(|(i, _)| i)
        .collect();

    if keep.is_empty() {
        return Err(CellscapeError::DegenerateData(format!(
            "no samples have at least {} expressed features",
            min_genes
        )));
    }

    let removed = dataset.n_obs() - keep.len();
    if removed > 0 {
        dataset.subset_samples(&keep)?;
        debug!("filter_cells removed {} samples", removed);
    }
    Ok(removed)
}

/// Keep features expressed in at least `min_cells` samples.
///
/// Returns the number of features removed.
pub fn filter_genes(dataset: &mut AssembledDataset, min_cells: usize) -> Result<usize> {
    let keep: Vec<usize> = dataset
        .expressed_per_feature()
        .iter()
        .enumerate()
        .filter(|(_, &n)| n >= min_cells)
        .map(|(i, _)| i)
        .collect();

    if keep.is_empty() {
        return Err(CellscapeError::DegenerateData(format!(
            "no features are expressed in at least {} samples",
            min_cells
        )));
    }

    let removed = dataset.n_vars() - keep.len();
    if removed > 0 {
        dataset.subset_features(&keep)?;
        debug!("filter_genes removed {} features", removed);
    }
    Ok(removed)
}

/// Scale every sample so its values sum to `target_sum`.
///
/// Samples summing to zero are left unchanged.
pub fn normalize_total(dataset: &mut AssembledDataset, target_sum: f64) -> Result<()> {
    if target_sum <= 0.0 {
        return Err(CellscapeError::InvalidParameter(format!(
            "target_sum must be positive, got {}",
            target_sum
        )));
    }

    let x = dataset.x();
    let totals: Vec<f64> = (0..dataset.n_obs())
        .into_par_iter()
        .map(|row| {
            x.outer_view(row)
                .map(|v| v.iter().map(|(_, &val)| val).sum::<f64>())
                .unwrap_or(0.0)
        })
        .collect();

    let mut tri_mat = TriMat::new((dataset.n_obs(), dataset.n_vars()));
    for (row, row_vec) in x.outer_iterator().enumerate() {
        let factor = if totals[row] > 0.0 {
            target_sum / totals[row]
        } else {
            1.0
        };
        for (col, &val) in row_vec.iter() {
            tri_mat.add_triplet(row, col, val * factor);
        }
    }
    dataset.replace_matrix(tri_mat.to_csr())
}

/// Apply `ln(1 + x)` to every stored value.
pub fn log1p(dataset: &mut AssembledDataset) -> Result<()> {
    let transformed = dataset.x().map(|v| v.ln_1p());
    dataset.replace_matrix(transformed)
}

/// Per-feature sample variance (0 when undefined).
pub fn feature_variances(dataset: &AssembledDataset) -> Vec<f64> {
    let dense = dataset.to_dense();
    (0..dense.ncols())
        .into_par_iter()
        .map(|col| {
            let variance = dense.column(col).iter().variance();
            if variance.is_finite() {
                variance
            } else {
                0.0
            }
        })
        .collect()
}

/// Keep the `n_top` highest-variance features, preserving their order.
///
/// Does nothing when the dataset has `n_top` features or fewer.
pub fn select_variable_features(dataset: &mut AssembledDataset, n_top: usize) -> Result<()> {
    if n_top == 0 || dataset.n_vars() <= n_top {
        return Ok(());
    }

    let variances = feature_variances(dataset);
    let mut ranked: Vec<usize> = (0..variances.len()).collect();
    ranked.sort_by(|&a, &b| variances[b].total_cmp(&variances[a]).then(a.cmp(&b)));
    ranked.truncate(n_top);
    ranked.sort_unstable();

    debug!(
        "selected {} of {} features by variance",
        ranked.len(),
        dataset.n_vars()
    );
    dataset.subset_features(&ranked)
}
