//! Reconcile expression sample identifiers with metadata row identifiers.

use super::matcher::are_equivalent;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Exact intersection is accepted when it covers at least this share of
/// expression samples.
pub const EXACT_MATCH_COVERAGE: f64 = 0.8;

/// Fuzzy matching is accepted when it covers at least this share of expression
/// samples.
pub const FUZZY_MATCH_COVERAGE: f64 = 0.5;

/// Strategy that produced an identity mapping, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentStrategy {
    ExactIntersection,
    Fuzzy,
    Positional,
    Partial,
}

impl AlignmentStrategy {
    /// Anything past the exact intersection is a degraded alignment.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, AlignmentStrategy::ExactIntersection)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ExactIntersection => "exact_intersection",
            Self::Fuzzy => "fuzzy",
            Self::Positional => "positional",
            Self::Partial => "partial",
        }
    }
}

impl std::fmt::Display for AlignmentStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Expression identifier → metadata identifier.
///
/// At most one metadata id per expression id. Several expression ids may share
/// a metadata id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMapping {
    pairs: HashMap<String, String>,
}

impl IdentityMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an expression id; an existing binding is kept.
    pub fn insert(&mut self, expression_id: &str, metadata_id: &str) {
        self.pairs
            .entry(expression_id.to_string())
            .or_insert_with(|| metadata_id.to_string());
    }

    pub fn get(&self, expression_id: &str) -> Option<&str> {
        self.pairs.get(expression_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Share of `n_expression` identifiers that are mapped.
    pub fn coverage(&self, n_expression: usize) -> f64 {
        if n_expression == 0 {
            0.0
        } else {
            self.len() as f64 / n_expression as f64
        }
    }
}

/// Alignment thresholds and matching policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Minimum coverage for the exact intersection.
    pub exact_coverage: f64,
    /// Minimum coverage for fuzzy matching.
    pub fuzzy_coverage: f64,
    /// Remove bound metadata ids from the fuzzy candidate pool.
    pub exclusive_fuzzy: bool,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            exact_coverage: EXACT_MATCH_COVERAGE,
            fuzzy_coverage: FUZZY_MATCH_COVERAGE,
            exclusive_fuzzy: false,
        }
    }
}

/// Diagnostics recorded for one alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub strategy: AlignmentStrategy,
    pub n_expression: usize,
    pub n_metadata: usize,
    /// Size of the exact intersection.
    pub n_exact: usize,
    pub n_mapped: usize,
    pub coverage: f64,
    pub warnings: Vec<String>,
}

impl AlignmentReport {
    pub fn is_degraded(&self) -> bool {
        self.strategy.is_degraded()
    }
}

/// Result of [`IdentityAligner::align`].
#[derive(Debug, Clone)]
pub struct Alignment {
    pub mapping: IdentityMapping,
    pub report: AlignmentReport,
}

impl Alignment {
    pub fn strategy(&self) -> AlignmentStrategy {
        self.report.strategy
    }
}

/// Escalates through exact, fuzzy, positional and partial alignment.
#[derive(Debug, Clone, Default)]
pub struct IdentityAligner {
    config: AlignmentConfig,
}

impl IdentityAligner {
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// Align expression identifiers to metadata identifiers.
    ///
    /// Both slices are taken in table order, which matters for fuzzy
    /// first-match binding and for positional alignment. Never fails: when
    /// nothing better is available the exact intersection (possibly empty) is
    /// returned as a partial alignment.
    pub fn align(&self, expression_ids: &[String], metadata_ids: &[String]) -> Alignment {
        let n_expression = expression_ids.len();
        let n_metadata = metadata_ids.len();
        let mut warnings = Vec::new();

        if n_expression == 0 || n_metadata == 0 {
            let msg = format!(
                "nothing to align ({} expression ids, {} metadata ids)",
                n_expression, n_metadata
            );
            warn!("{}", msg);
            warnings.push(msg);
            return self.finish(
                IdentityMapping::new(),
                AlignmentStrategy::Partial,
                n_expression,
                n_metadata,
                0,
                warnings,
            );
        }

        let exact = exact_intersection(expression_ids, metadata_ids);
        let n_exact = exact.len();
        debug!("exact intersection: {}/{} samples", n_exact, n_expression);
        if n_exact > 0 && meets(n_exact, n_expression, self.config.exact_coverage) {
            return self.finish(
                exact,
                AlignmentStrategy::ExactIntersection,
                n_expression,
                n_metadata,
                n_exact,
                warnings,
            );
        }

        let fuzzy = fuzzy_match(expression_ids, metadata_ids, self.config.exclusive_fuzzy);
        debug!("fuzzy matching: {}/{} samples", fuzzy.len(), n_expression);
        if !fuzzy.is_empty() && meets(fuzzy.len(), n_expression, self.config.fuzzy_coverage) {
            warnings.push(format!(
                "exact intersection covered {}/{} samples; used fuzzy identifier matching",
                n_exact, n_expression
            ));
            return self.finish(
                fuzzy,
                AlignmentStrategy::Fuzzy,
                n_expression,
                n_metadata,
                n_exact,
                warnings,
            );
        }

        if n_expression == n_metadata {
            let msg = "identifiers do not correspond; aligned by position, \
                       assuming both tables list samples in the same order"
                .to_string();
            warn!("{}", msg);
            warnings.push(msg);
            let mut mapping = IdentityMapping::new();
            for (expr_id, meta_id) in expression_ids.iter().zip(metadata_ids) {
                mapping.insert(expr_id, meta_id);
            }
            return self.finish(
                mapping,
                AlignmentStrategy::Positional,
                n_expression,
                n_metadata,
                n_exact,
                warnings,
            );
        }

        let msg = format!(
            "metadata only partially matched: {}/{} samples; unmatched samples are marked unknown",
            n_exact, n_expression
        );
        warn!("{}", msg);
        warnings.push(msg);
        self.finish(
            exact,
            AlignmentStrategy::Partial,
            n_expression,
            n_metadata,
            n_exact,
            warnings,
        )
    }

    fn finish(
        &self,
        mapping: IdentityMapping,
        strategy: AlignmentStrategy,
        n_expression: usize,
        n_metadata: usize,
        n_exact: usize,
        warnings: Vec<String>,
    ) -> Alignment {
        let coverage = mapping.coverage(n_expression);
        info!(
            "aligned {}/{} samples using {} strategy",
            mapping.len(),
            n_expression,
            strategy
        );
        Alignment {
            report: AlignmentReport {
                strategy,
                n_expression,
                n_metadata,
                n_exact,
                n_mapped: mapping.len(),
                coverage,
                warnings,
            },
            mapping,
        }
    }
}

fn meets(n_mapped: usize, n_expression: usize, threshold: f64) -> bool {
    n_mapped as f64 >= n_expression as f64 * threshold
}

/// Identity mapping restricted to identifiers present in both tables.
pub fn exact_intersection(expression_ids: &[String], metadata_ids: &[String]) -> IdentityMapping {
    let metadata: HashSet<&str> = metadata_ids.iter().map(String::as_str).collect();
    let mut mapping = IdentityMapping::new();
    for id in expression_ids {
        if metadata.contains(id.as_str()) {
            mapping.insert(id, id);
        }
    }
    mapping
}

/// Bind each expression id to the first equivalent metadata id.
///
/// An identical metadata id wins over everything else, then a case-insensitive
/// one, then the first equivalent id in table order. With `exclusive` set, a
/// metadata id bound once is removed from the pool.
pub fn fuzzy_match(
    expression_ids: &[String],
    metadata_ids: &[String],
    exclusive: bool,
) -> IdentityMapping {
    let mut mapping = IdentityMapping::new();
    let mut taken = vec![false; metadata_ids.len()];

    for expr_id in expression_ids {
        let target = expr_id.trim();
        let target_lower = target.to_lowercase();
        let available = |idx: usize| !exclusive || !taken[idx];
        let hit = first_available(metadata_ids, &available, |meta_id| meta_id.trim() == target)
            .or_else(|| {
                first_available(metadata_ids, &available, |meta_id| {
                    meta_id.trim().to_lowercase() == target_lower
                })
            })
            .or_else(|| {
                first_available(metadata_ids, &available, |meta_id| {
                    are_equivalent(expr_id, meta_id)
                })
            });
        if let Some((idx, meta_id)) = hit {
            mapping.insert(expr_id, meta_id);
            taken[idx] = true;
        }
    }
    mapping
}

fn first_available<'a>(
    metadata_ids: &'a [String],
    available: &dyn Fn(usize) -> bool,
    matches: impl Fn(&str) -> bool,
) -> Option<(usize, &'a String)> {
    metadata_ids
        .iter()
        .enumerate()
        .filter(|(idx, _)| available(*idx))
        .find(|(_, meta_id)| matches(meta_id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_identical_sets_use_exact_intersection() {
        let samples = ids(&["AAAC-1", "AAAG-1", "AAAT-1"]);
        let alignment = IdentityAligner::default().align(&samples, &samples);

        assert_eq!(alignment.strategy(), AlignmentStrategy::ExactIntersection);
        assert!(!alignment.report.is_degraded());
        for id in &samples {
            assert_eq!(alignment.mapping.get(id), Some(id.as_str()));
        }
        assert_eq!(alignment.report.coverage, 1.0);
    }

    #[test]
    fn test_exact_threshold_boundary() {
        // 4 of 5 = 80% is enough
        let expr = ids(&["a1", "a2", "a3", "a4", "zz"]);
        let meta = ids(&["a1", "a2", "a3", "a4", "q"]);
        let alignment = IdentityAligner::default().align(&expr, &meta);
        assert_eq!(alignment.strategy(), AlignmentStrategy::ExactIntersection);
        assert_eq!(alignment.mapping.len(), 4);
        assert_eq!(alignment.mapping.get("zz"), None);
    }

    #[test]
    fn test_fuzzy_matching() {
        let expr = ids(&["s1", "s2", "s3"]);
        let meta = ids(&["S1", "s2", "s3_1"]);
        let alignment = IdentityAligner::default().align(&expr, &meta);

        assert_eq!(alignment.strategy(), AlignmentStrategy::Fuzzy);
        assert_eq!(alignment.mapping.get("s1"), Some("S1"));
        assert_eq!(alignment.mapping.get("s2"), Some("s2"));
        assert_eq!(alignment.mapping.get("s3"), Some("s3_1"));
        assert_eq!(alignment.report.n_exact, 1);
        assert!(alignment.report.is_degraded());
    }

    #[test]
    fn test_fuzzy_prefers_identical_id_over_containment() {
        let expr = ids(&["s1", "s2", "s3"]);
        let meta = ids(&["s10", "s1", "s2_b", "s3_b"]);
        let alignment = IdentityAligner::default().align(&expr, &meta);

        assert_eq!(alignment.strategy(), AlignmentStrategy::Fuzzy);
        assert_eq!(alignment.mapping.get("s1"), Some("s1"));
        assert_eq!(alignment.mapping.get("s2"), Some("s2_b"));
        assert_eq!(alignment.mapping.get("s3"), Some("s3_b"));
    }

    #[test]
    fn test_fuzzy_prefers_case_insensitive_id() {
        let expr = ids(&["ab"]);
        let meta = ids(&["xab", "AB"]);
        let mapping = fuzzy_match(&expr, &meta, false);
        assert_eq!(mapping.get("ab"), Some("AB"));
    }

    #[test]
    fn test_fuzzy_first_match_allows_reuse() {
        let expr = ids(&["ACGT_x", "ACGT_y"]);
        let meta = ids(&["ACGT", "TTTT"]);
        let mapping = fuzzy_match(&expr, &meta, false);
        assert_eq!(mapping.get("ACGT_x"), Some("ACGT"));
        assert_eq!(mapping.get("ACGT_y"), Some("ACGT"));
    }

    #[test]
    fn test_exclusive_fuzzy_removes_bound_candidates() {
        let expr = ids(&["ACGT_x", "ACGT_y"]);
        let meta = ids(&["ACGT", "ACGT_y"]);
        let mapping = fuzzy_match(&expr, &meta, true);
        assert_eq!(mapping.get("ACGT_x"), Some("ACGT"));
        assert_eq!(mapping.get("ACGT_y"), Some("ACGT_y"));
    }

    #[test]
    fn test_disjoint_equal_size_falls_back_to_positional() {
        let expr = ids(&["a", "b", "c"]);
        let meta = ids(&["x", "y", "z"]);
        let alignment = IdentityAligner::default().align(&expr, &meta);

        assert_eq!(alignment.strategy(), AlignmentStrategy::Positional);
        assert_eq!(alignment.mapping.len(), 3);
        assert_eq!(alignment.mapping.get("a"), Some("x"));
        assert_eq!(alignment.mapping.get("b"), Some("y"));
        assert_eq!(alignment.mapping.get("c"), Some("z"));
        assert_eq!(alignment.report.warnings.len(), 1);
    }

    #[test]
    fn test_partial_keeps_exact_intersection() {
        let expr = ids(&["a", "b", "c", "d"]);
        let meta = ids(&["a", "x", "y"]);
        let alignment = IdentityAligner::default().align(&expr, &meta);

        assert_eq!(alignment.strategy(), AlignmentStrategy::Partial);
        assert_eq!(alignment.mapping.len(), 1);
        assert_eq!(alignment.mapping.get("a"), Some("a"));
        assert_eq!(alignment.report.coverage, 0.25);
    }

    #[test]
    fn test_empty_inputs_are_partial() {
        let aligner = IdentityAligner::default();
        let empty: Vec<String> = Vec::new();

        let alignment = aligner.align(&empty, &ids(&["a"]));
        assert_eq!(alignment.strategy(), AlignmentStrategy::Partial);
        assert!(alignment.mapping.is_empty());

        let alignment = aligner.align(&ids(&["a"]), &empty);
        assert_eq!(alignment.strategy(), AlignmentStrategy::Partial);
        assert!(alignment.mapping.is_empty());
    }

    #[test]
    fn test_custom_thresholds() {
        let config = AlignmentConfig {
            exact_coverage: 0.25,
            ..Default::default()
        };
        let expr = ids(&["a", "b", "c", "d"]);
        let meta = ids(&["a", "x", "y"]);
        let alignment = IdentityAligner::new(config).align(&expr, &meta);
        assert_eq!(alignment.strategy(), AlignmentStrategy::ExactIntersection);
    }
}
