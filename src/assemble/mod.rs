//! Dataset assembly from aligned expression and metadata tables.

mod assembler;

pub use assembler::{
    attach_derived_columns, Assembly, DatasetAssembler, CELL_ID_COLUMN, GENE_NAME_COLUMN,
    N_CELLS_COLUMN, N_GENES_COLUMN,
};
