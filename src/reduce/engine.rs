//! Reduction method names and the engine seam.

use crate::data::AssembledDataset;
use crate::error::{CellscapeError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A dimensionality-reduction method producing 2D coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionMethod {
    Pca,
    Umap,
    Tsne,
}

impl ReductionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pca => "pca",
            Self::Umap => "umap",
            Self::Tsne => "tsne",
        }
    }

    /// Name shown in plot payloads.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pca => "PCA",
            Self::Umap => "UMAP",
            Self::Tsne => "TSNE",
        }
    }
}

impl FromStr for ReductionMethod {
    type Err = CellscapeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pca" => Ok(Self::Pca),
            "umap" => Ok(Self::Umap),
            "tsne" | "t-sne" => Ok(Self::Tsne),
            other => Err(CellscapeError::UnknownMethod(other.to_string())),
        }
    }
}

impl std::fmt::Display for ReductionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes an embedding for an assembled dataset.
///
/// Implementations may drop samples or features while preprocessing; the
/// dataset's annotations must stay aligned with whatever samples remain, and
/// the embedding is attached through [`AssembledDataset::set_embedding`].
pub trait ReductionEngine {
    fn name(&self) -> &str;

    fn supports(&self, method: ReductionMethod) -> bool;

    fn reduce(&self, dataset: &mut AssembledDataset, method: ReductionMethod) -> Result<()>;
}
