//! Turn an annotation column into a per-sample color channel.
//!
//! Column resolution falls through four levels: the requested column, a
//! priority list of conventional clustering/cell-type names, the first
//! categorical column, and finally a positional grouping over the first
//! embedding axis. Encoding itself never fails.

use crate::data::{AnnotationColumn, AssembledDataset, Variable, VariableType, UNKNOWN_LABEL};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column name reported when samples are grouped by position.
pub const POSITIONAL_GROUPING: &str = "positional grouping";

/// Conventional names of clustering and cell-type columns, in preference order.
pub const DEFAULT_PRIORITY_COLUMNS: [&str; 9] = [
    "cluster",
    "clusters",
    "louvain",
    "leiden",
    "cell_type",
    "celltype",
    "cell_types",
    "seurat_clusters",
    "RNA_snn_res",
];

/// How a color channel should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorType {
    Categorical,
    Continuous,
    /// Positional grouping used when no annotation column applies.
    Default,
}

impl ColorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Categorical => "categorical",
            Self::Continuous => "continuous",
            Self::Default => "default",
        }
    }
}

impl std::fmt::Display for ColorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-sample channel values: category codes or raw numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorChannel {
    Codes(Vec<usize>),
    Values(Vec<f64>),
}

impl ColorChannel {
    pub fn len(&self) -> usize {
        match self {
            Self::Codes(codes) => codes.len(),
            Self::Values(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Channel values as floats.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            Self::Codes(codes) => codes.iter().map(|&c| c as f64).collect(),
            Self::Values(values) => values.clone(),
        }
    }
}

/// A resolved color assignment, aligned with the dataset's sample order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorEncoding {
    pub channel: ColorChannel,
    pub color_type: ColorType,
    /// Labels indexed by code; `None` for continuous channels.
    pub categories: Option<Vec<String>>,
    /// Column the channel was taken from, or [`POSITIONAL_GROUPING`].
    pub column: String,
    /// Set when no annotation column could be used.
    pub fallback: bool,
}

impl ColorEncoding {
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

/// Column preferences and positional grouping parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub priority_columns: Vec<String>,
    pub max_groups: usize,
    pub min_groups: usize,
    /// Samples per positional group before another group is added.
    pub cells_per_group: usize,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            priority_columns: DEFAULT_PRIORITY_COLUMNS.iter().map(|s| s.to_string()).collect(),
            max_groups: 8,
            min_groups: 2,
            cells_per_group: 500,
        }
    }
}

impl ColorConfig {
    /// Number of positional groups for `n_samples` samples.
    pub fn group_count(&self, n_samples: usize) -> usize {
        let by_size = n_samples.checked_div(self.cells_per_group).unwrap_or(0);
        by_size.max(self.min_groups).min(self.max_groups).max(1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColorEncoder {
    config: ColorConfig,
}

impl ColorEncoder {
    pub fn new(config: ColorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ColorConfig {
        &self.config
    }

    /// Pick the annotation column to color by, if any applies.
    ///
    /// An empty request (or a quoted empty string) counts as no request.
    pub fn resolve_column<'a>(
        &self,
        dataset: &'a AssembledDataset,
        requested: Option<&str>,
    ) -> Option<&'a AnnotationColumn> {
        let obs = dataset.obs();

        if let Some(name) = requested.map(normalize_request).filter(|n| !n.is_empty()) {
            match obs.get(name) {
                Some(column) => return Some(column),
                None => info!("requested color column '{}' not found", name),
            }
        }

        if let Some(column) = self
            .config
            .priority_columns
            .iter()
            .find_map(|name| obs.get(name))
        {
            debug!("coloring by priority column '{}'", column.name);
            return Some(column);
        }

        obs.columns()
            .iter()
            .find(|column| column.kind == VariableType::Categorical)
    }

    /// Encode the resolved column, or group samples by position.
    pub fn encode(&self, dataset: &AssembledDataset, requested: Option<&str>) -> ColorEncoding {
        match self.resolve_column(dataset, requested) {
            Some(column) => match column.kind {
                VariableType::Continuous => encode_continuous(&column.name, &column.values),
                VariableType::Categorical | VariableType::Identifier => {
                    encode_categorical(&column.name, &column.values)
                }
            },
            None => {
                let xs = dataset
                    .latest_embedding()
                    .map(|e| e.xs())
                    .unwrap_or_else(|| vec![0.0; dataset.n_obs()]);
                info!(
                    "no usable color column; grouping {} samples by position",
                    xs.len()
                );
                positional_groups(&xs, &self.config)
            }
        }
    }
}

fn normalize_request(requested: &str) -> &str {
    let trimmed = requested.trim();
    if trimmed == "\"\"" || trimmed == "''" {
        ""
    } else {
        trimmed
    }
}

fn category_label(value: &Variable) -> Option<String> {
    match value {
        Variable::Categorical(s) => Some(s.clone()),
        Variable::Continuous(v) => Some(v.to_string()),
        Variable::Missing | Variable::Unknown => None,
    }
}

/// Codes in first-encountered order; unresolved values share the final code.
///
/// A literal `unknown` value already in the column absorbs the unresolved ones
/// so the legend never lists it twice.
pub fn encode_categorical(name: &str, values: &[Variable]) -> ColorEncoding {
    let mut categories: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut pending: Vec<Option<usize>> = Vec::with_capacity(values.len());

    for value in values {
        let code = category_label(value).map(|label| {
            *index.entry(label).or_insert_with_key(|label| {
                categories.push(label.clone());
                categories.len() - 1
            })
        });
        pending.push(code);
    }

    let n_unknown = pending.iter().filter(|c| c.is_none()).count();
    let unknown_code = match index.get(UNKNOWN_LABEL) {
        Some(&code) => code,
        None => {
            if n_unknown > 0 {
                categories.push(UNKNOWN_LABEL.to_string());
            }
            categories.len().saturating_sub(1)
        }
    };
    if n_unknown > 0 {
        debug!("{} samples have no value in '{}'", n_unknown, name);
    }

    ColorEncoding {
        channel: ColorChannel::Codes(
            pending
                .into_iter()
                .map(|c| c.unwrap_or(unknown_code))
                .collect(),
        ),
        color_type: ColorType::Categorical,
        categories: Some(categories),
        column: name.to_string(),
        fallback: false,
    }
}

/// Raw numeric values with missing entries as 0.
pub fn encode_continuous(name: &str, values: &[Variable]) -> ColorEncoding {
    let channel = values
        .iter()
        .map(|value| match value {
            Variable::Continuous(v) if v.is_finite() => *v,
            Variable::Categorical(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .unwrap_or(0.0),
            _ => 0.0,
        })
        .collect();

    ColorEncoding {
        channel: ColorChannel::Values(channel),
        color_type: ColorType::Continuous,
        categories: None,
        column: name.to_string(),
        fallback: false,
    }
}

/// Equal-width bins over `xs`, renumbered so that only occupied bins get codes.
///
/// Labels keep the bin's position (`Group 1` is the leftmost bin). Non-finite
/// coordinates are treated as 0; a zero-width range puts everything in the
/// first bin.
pub fn positional_groups(xs: &[f64], config: &ColorConfig) -> ColorEncoding {
    let n_groups = config.group_count(xs.len());
    let xs: Vec<f64> = xs.iter().map(|&x| if x.is_finite() { x } else { 0.0 }).collect();

    let min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / n_groups as f64;

    let bins: Vec<usize> = xs
        .iter()
        .map(|&x| {
            if width > 0.0 {
                (((x - min) / width).floor() as usize).min(n_groups - 1)
            } else {
                0
            }
        })
        .collect();

    let mut occupied = vec![false; n_groups];
    for &bin in &bins {
        occupied[bin] = true;
    }
    let mut remap = vec![0usize; n_groups];
    let mut categories = Vec::new();
    for (bin, _) in occupied.iter().enumerate().filter(|(_, &used)| used) {
        remap[bin] = categories.len();
        categories.push(format!("Group {}", bin + 1));
    }

    ColorEncoding {
        channel: ColorChannel::Codes(bins.iter().map(|&b| remap[b]).collect()),
        color_type: ColorType::Default,
        categories: Some(categories),
        column: POSITIONAL_GROUPING.to_string(),
        fallback: true,
    }
}
