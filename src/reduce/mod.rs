//! Dimensionality reduction into 2D embeddings.

pub mod engine;
pub mod pca;
pub mod preprocess;

pub use engine::{ReductionEngine, ReductionMethod};
pub use pca::{principal_components_2d, PcaEngine};
pub use preprocess::{
    feature_variances, filter_cells, filter_genes, log1p, normalize_total, preprocess,
    select_variable_features, PreprocessConfig,
};
