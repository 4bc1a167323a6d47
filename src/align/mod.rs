//! Sample identity reconciliation between expression and metadata tables.

pub mod aligner;
pub mod matcher;

pub use aligner::{
    exact_intersection, fuzzy_match, Alignment, AlignmentConfig, AlignmentReport,
    AlignmentStrategy, IdentityAligner, IdentityMapping, EXACT_MATCH_COVERAGE,
    FUZZY_MATCH_COVERAGE,
};
pub use matcher::{are_equivalent, strip_affixes, KNOWN_PREFIXES, KNOWN_SUFFIXES};
