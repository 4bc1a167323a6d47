//! Data structures for expression tables, metadata and the assembled dataset.

mod dataset;
mod metadata;
mod sample_table;

pub use dataset::{AnnotationColumn, Annotations, AssembledDataset, Embedding};
pub use metadata::{is_missing_token, MetadataTable, Variable, VariableType, UNKNOWN_LABEL};
pub use sample_table::SampleTable;
