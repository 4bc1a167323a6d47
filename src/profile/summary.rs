//! Structural summary of an assembled dataset.

use crate::assemble::N_GENES_COLUMN;
use crate::data::{AssembledDataset, Variable};
use crate::error::Result;
use crate::pipeline::Processor;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Column-name fragments that mark a clustering result.
const CLUSTERING_KEYWORDS: [&str; 3] = ["cluster", "leiden", "louvain"];

/// Above this many samples, a fast embedding is suggested.
pub const LARGE_DATASET_CELLS: usize = 10_000;
/// Below this many samples, finer parameters are suggested.
pub const SMALL_DATASET_CELLS: usize = 1_000;

/// Dimensions, annotations and quality indicators of a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub n_cells: usize,
    pub n_genes: usize,
    pub obs_columns: Vec<String>,
    pub var_columns: Vec<String>,
    /// Display names of attached embeddings.
    pub available_embeddings: Vec<String>,
    pub clustering_columns: Vec<String>,
    /// Mean of the `n_genes` column, when present.
    pub avg_genes_per_cell: Option<f64>,
    /// Proportion of zero entries.
    pub sparsity: f64,
    pub suggestions: Vec<String>,
}

impl DatasetSummary {
    pub fn has_embedding(&self) -> bool {
        !self.available_embeddings.is_empty()
    }

    pub fn has_clustering(&self) -> bool {
        !self.clustering_columns.is_empty()
    }
}

impl std::fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Dataset Summary")?;
        writeln!(f, "  Cells:              {}", self.n_cells)?;
        writeln!(f, "  Genes:              {}", self.n_genes)?;
        writeln!(f, "  Sparsity:           {:.2}%", self.sparsity * 100.0)?;
        if let Some(avg) = self.avg_genes_per_cell {
            writeln!(f, "  Avg genes per cell: {:.1}", avg)?;
        }
        writeln!(f, "  Obs columns:        {}", self.obs_columns.join(", "))?;
        writeln!(f, "  Var columns:        {}", self.var_columns.join(", "))?;
        if self.has_embedding() {
            writeln!(f, "  Embeddings:         {}", self.available_embeddings.join(", "))?;
        }
        if self.has_clustering() {
            writeln!(f, "  Clustering columns: {}", self.clustering_columns.join(", "))?;
        }
        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "Suggestions:")?;
            for suggestion in &self.suggestions {
                writeln!(f, "  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

fn is_clustering_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    CLUSTERING_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Summarize an assembled dataset.
pub fn summarize(dataset: &AssembledDataset) -> DatasetSummary {
    let n_cells = dataset.n_obs();
    let n_genes = dataset.n_vars();
    let obs_columns = dataset.obs().names();

    let total = n_cells * n_genes;
    let sparsity = if total == 0 {
        0.0
    } else {
        1.0 - dataset.nnz() as f64 / total as f64
    };

    let avg_genes_per_cell = dataset.obs().get(N_GENES_COLUMN).and_then(|column| {
        let values: Vec<f64> = column
            .values
            .iter()
            .filter_map(Variable::as_continuous)
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    });

    let available_embeddings: Vec<String> = dataset
        .embeddings()
        .iter()
        .map(|e| e.method.display_name().to_string())
        .collect();
    let clustering_columns: Vec<String> = obs_columns
        .iter()
        .filter(|c| is_clustering_column(c))
        .cloned()
        .collect();

    let mut suggestions = Vec::new();
    if available_embeddings.is_empty() {
        suggestions.push("Run a dimensionality reduction (PCA, UMAP or t-SNE) first".to_string());
    }
    if clustering_columns.is_empty() {
        suggestions.push("Cluster the cells to obtain a grouping column".to_string());
    }
    if n_cells > LARGE_DATASET_CELLS {
        suggestions.push("Large dataset: UMAP is recommended for fast visualization".to_string());
    } else if n_cells < SMALL_DATASET_CELLS {
        suggestions.push("Small dataset: finer analysis parameters are worth trying".to_string());
    }

    DatasetSummary {
        n_cells,
        n_genes,
        obs_columns,
        var_columns: dataset.var().names(),
        available_embeddings,
        clustering_columns,
        avg_genes_per_cell,
        sparsity,
        suggestions,
    }
}

/// Load and assemble the input files, then summarize them.
pub fn summarize_files(
    processor: &Processor,
    expression_path: &Path,
    metadata_path: Option<&Path>,
) -> Result<DatasetSummary> {
    let (expression, metadata) = processor.load(expression_path, metadata_path)?;
    let assembly = processor.assemble(&expression, metadata.as_ref())?;
    Ok(summarize(&assembly.dataset))
}
