//! Sample Identity Reconciliation and Scatter Encoding for Expression Matrices
//!
//! This library turns a gene-expression matrix, optionally paired with a
//! per-sample metadata table, into a renderable 2D scatter payload.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (SampleTable, MetadataTable, AssembledDataset)
//! - **align**: Sample identifier matching and alignment strategies
//! - **assemble**: Unified samples × features dataset with derived columns
//! - **reduce**: Preprocessing and dimensionality reduction (PCA)
//! - **encode**: Color column resolution, encoding and plot payloads
//! - **io**: Delimited table reading and TSV dataset writing
//! - **profile**: Dataset summaries
//! - **pipeline**: End-to-end processing from files to payload
//!
//! # Example
//!
//! ```no_run
//! use cellscape::prelude::*;
//!
//! let request = PlotRequest::new("expression.tsv")
//!     .metadata("metadata.csv")
//!     .method("pca")
//!     .color_by("cluster");
//!
//! let response = Processor::default().run(&request);
//! println!("{}", response.to_framed_json().unwrap());
//! ```

pub mod align;
pub mod assemble;
pub mod config;
pub mod data;
pub mod encode;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod profile;
pub mod reduce;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::align::{
        are_equivalent, Alignment, AlignmentConfig, AlignmentReport, AlignmentStrategy,
        IdentityAligner, IdentityMapping,
    };
    pub use crate::assemble::{Assembly, DatasetAssembler};
    pub use crate::config::AnalysisConfig;
    pub use crate::data::{
        AnnotationColumn, Annotations, AssembledDataset, Embedding, MetadataTable, SampleTable,
        Variable, VariableType,
    };
    pub use crate::encode::{
        build_payload, ColorChannel, ColorConfig, ColorEncoder, ColorEncoding, ColorType,
        ErrorPayload, PlotPayload, PlotResponse,
    };
    pub use crate::error::{CellscapeError, Result};
    pub use crate::io::{
        DatasetWriter, DelimitedTableReader, TableFormat, TableReader, TsvDatasetWriter,
        WriteSummary,
    };
    pub use crate::pipeline::{run_plot, PlotRequest, Processor};
    pub use crate::profile::{summarize, DatasetSummary};
    pub use crate::reduce::{PcaEngine, PreprocessConfig, ReductionEngine, ReductionMethod};
}
