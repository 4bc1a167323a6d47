//! Color encoding and plot payload assembly.

pub mod color;
pub mod payload;

pub use color::{
    encode_categorical, encode_continuous, positional_groups, ColorChannel, ColorConfig,
    ColorEncoder, ColorEncoding, ColorType, DEFAULT_PRIORITY_COLUMNS, POSITIONAL_GROUPING,
};
pub use payload::{
    build_payload, ErrorPayload, PlotPayload, PlotResponse, PLOT_DATA_END, PLOT_DATA_START,
};
