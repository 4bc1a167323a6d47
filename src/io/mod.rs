//! Table readers and dataset writers.

mod reader;
mod writer;

pub use reader::{DelimitedTableReader, TableFormat, TableReader, MISSING_WARN_RATIO};
pub use writer::{output_stem, DatasetWriter, TsvDatasetWriter, WriteSummary};
