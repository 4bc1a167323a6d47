//! Fuzzy equivalence between sample identifiers.
//!
//! Identifiers exported by different tools for the same cell often differ by
//! case, by a labelling prefix (`Cell_`, `barcode_`) or by a lane/sample
//! suffix (`-1`, `_2`). The rules here are applied in a fixed order and the
//! first one that holds decides.

/// Prefixes stripped from the start of an identifier, tried once each in order.
pub const KNOWN_PREFIXES: [&str; 5] = ["cell_", "Cell_", "CELL_", "barcode_", "Barcode_"];

/// Suffixes stripped from the end of an identifier, tried once each in order.
pub const KNOWN_SUFFIXES: [&str; 6] = ["_1", "_2", ".1", ".2", "-1", "-2"];

/// Remove known labelling prefixes and numeric suffixes.
pub fn strip_affixes(id: &str) -> &str {
    let mut core = id;
    for prefix in KNOWN_PREFIXES {
        if let Some(rest) = core.strip_prefix(prefix) {
            core = rest;
        }
    }
    for suffix in KNOWN_SUFFIXES {
        if let Some(rest) = core.strip_suffix(suffix) {
            core = rest;
        }
    }
    core
}

/// Decide whether two identifiers name the same sample.
///
/// Tried in order, after trimming whitespace:
/// 1. exact equality
/// 2. case-insensitive equality
/// 3. equality after [`strip_affixes`] (case-insensitive)
/// 4. one stripped form contains the other (case-insensitive)
///
/// Stripped forms that end up empty never match through rules 3 and 4.
pub fn are_equivalent(id_a: &str, id_b: &str) -> bool {
    let a = id_a.trim();
    let b = id_b.trim();

    if a == b {
        return true;
    }
    if a.to_lowercase() == b.to_lowercase() {
        return true;
    }

    let a_core = strip_affixes(a).to_lowercase();
    let b_core = strip_affixes(b).to_lowercase();
    if a_core.is_empty() || b_core.is_empty() {
        return false;
    }

    a_core == b_core || a_core.contains(&b_core) || b_core.contains(&a_core)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflexive() {
        for id in ["", "s1", "Cell_AAACCTGAG-1", "  padded ", "多字节"] {
            assert!(are_equivalent(id, id), "{id:?} should match itself");
        }
    }

    #[test]
    fn test_whitespace_and_case() {
        assert!(are_equivalent(" S1", "s1 "));
        assert!(are_equivalent("AAACCTGAG", "aaacctgag"));
    }

    #[test]
    fn test_prefix_and_suffix() {
        assert!(are_equivalent("Cell_AAACCTGAG-1", "aaacctgag"));
        assert!(are_equivalent("barcode_ACGT.2", "ACGT"));
        assert!(are_equivalent("s3", "s3_1"));
    }

    #[test]
    fn test_prefix_only_stripped_at_start() {
        assert_eq!(strip_affixes("xcell_ACGT"), "xcell_ACGT");
        assert_eq!(strip_affixes("cell_ACGT"), "ACGT");
    }

    #[test]
    fn test_suffixes_stripped_in_order() {
        // "_1" goes first, then "-1" on what remains
        assert_eq!(strip_affixes("ACGT-1_1"), "ACGT");
        // only single lane digits are known suffixes
        assert_eq!(strip_affixes("ACGT-3"), "ACGT-3");
    }

    #[test]
    fn test_substring_containment() {
        assert!(are_equivalent("ACGTACGT", "sample_ACGTACGT_lane"));
        assert!(are_equivalent("pbmc_ACGT", "acgt"));
    }

    #[test]
    fn test_non_matching() {
        assert!(!are_equivalent("AAAC", "GGGT"));
        assert!(!are_equivalent("s1", "s2"));
    }

    #[test]
    fn test_empty_core_never_matches_by_containment() {
        assert!(!are_equivalent("", "abc"));
        assert!(!are_equivalent("cell_", "abc"));
        assert!(!are_equivalent("cell_", "barcode_"));
    }
}
