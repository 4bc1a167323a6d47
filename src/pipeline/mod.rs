//! End-to-end processing from input files to a plot payload.

mod runner;

pub use runner::{run_plot, PlotRequest, Processor};
