//! Principal component embedding via SVD.

use crate::data::{AssembledDataset, Embedding};
use crate::error::{CellscapeError, Result};
use crate::reduce::engine::{ReductionEngine, ReductionMethod};
use crate::reduce::preprocess::{preprocess, PreprocessConfig};
use log::{debug, info};
use nalgebra::DMatrix;

/// Preprocess, then project samples onto the first two principal components.
#[derive(Debug, Clone, Default)]
pub struct PcaEngine {
    config: PreprocessConfig,
}

impl PcaEngine {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }
}

impl ReductionEngine for PcaEngine {
    fn name(&self) -> &str {
        "pca"
    }

    fn supports(&self, method: ReductionMethod) -> bool {
        method == ReductionMethod::Pca
    }

    fn reduce(&self, dataset: &mut AssembledDataset, method: ReductionMethod) -> Result<()> {
        if !self.supports(method) {
            return Err(CellscapeError::UnsupportedMethod(
                method.display_name().to_string(),
            ));
        }

        preprocess(dataset, &self.config)?;
        let coordinates = principal_components_2d(&dataset.to_dense())?;
        info!("computed PCA embedding for {} samples", coordinates.len());
        dataset.set_embedding(Embedding {
            method,
            coordinates,
        })
    }
}

/// Scores on the first two principal components of a samples × features matrix.
///
/// Columns are centered before decomposition. Each component's sign is fixed
/// so its largest-magnitude loading on the sample axis is positive. A missing
/// second component (rank below 2) is reported as zeros.
pub fn principal_components_2d(data: &DMatrix<f64>) -> Result<Vec<[f64; 2]>> {
    let (n_samples, n_features) = data.shape();
    if n_samples == 0 || n_features == 0 {
        return Err(CellscapeError::DegenerateData(format!(
            "cannot decompose a {} x {} matrix",
            n_samples, n_features
        )));
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(CellscapeError::DegenerateData(
            "matrix contains non-finite values".to_string(),
        ));
    }

    let mut centered = data.clone();
    for mut col in centered.column_iter_mut() {
        let mean = col.mean();
        col.add_scalar_mut(-mean);
    }

    let svd = centered.svd(true, false);
    let u = svd.u.ok_or_else(|| {
        CellscapeError::DegenerateData("SVD did not produce left singular vectors".to_string())
    })?;
    let singular = svd.singular_values;

    let mut order: Vec<usize> = (0..singular.len()).collect();
    order.sort_by(|&a, &b| singular[b].total_cmp(&singular[a]));
    debug!(
        "leading singular values: {:?}",
        order.iter().take(2).map(|&i| singular[i]).collect::<Vec<_>>()
    );

    let mut coordinates = vec![[0.0; 2]; n_samples];
    for (component, &idx) in order.iter().take(2).enumerate() {
        let loading = u.column(idx);
        let pivot = loading.iamax();
        let sign = if loading[pivot] < 0.0 { -1.0 } else { 1.0 };
        for (sample, coord) in coordinates.iter_mut().enumerate() {
            coord[component] = sign * loading[sample] * singular[idx];
        }
    }

    Ok(coordinates)
}
