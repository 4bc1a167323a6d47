//! Dataset profiling for quick inspection before plotting.

mod summary;

pub use summary::{
    summarize, summarize_files, DatasetSummary, LARGE_DATASET_CELLS, SMALL_DATASET_CELLS,
};
