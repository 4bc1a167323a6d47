//! Analysis configuration loaded from YAML.

use crate::align::AlignmentConfig;
use crate::encode::ColorConfig;
use crate::error::{CellscapeError, Result};
use crate::reduce::PreprocessConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for every pipeline stage. Missing sections and fields take defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub alignment: AlignmentConfig,
    pub preprocess: PreprocessConfig,
    pub color: ColorConfig,
}

impl AnalysisConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(CellscapeError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(CellscapeError::from)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Reject settings no stage can work with.
    pub fn validate(&self) -> Result<()> {
        let alignment = &self.alignment;
        for (name, value) in [
            ("exact_coverage", alignment.exact_coverage),
            ("fuzzy_coverage", alignment.fuzzy_coverage),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CellscapeError::InvalidParameter(format!(
                    "alignment.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.preprocess.target_sum <= 0.0 {
            return Err(CellscapeError::InvalidParameter(format!(
                "preprocess.target_sum must be positive, got {}",
                self.preprocess.target_sum
            )));
        }
        if self.color.min_groups == 0 || self.color.min_groups > self.color.max_groups {
            return Err(CellscapeError::InvalidParameter(format!(
                "color group bounds must satisfy 1 <= min_groups <= max_groups, got {}..{}",
                self.color.min_groups, self.color.max_groups
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_yaml_roundtrip_defaults() {
        let yaml = AnalysisConfig::default().to_yaml().unwrap();
        assert!(yaml.contains("exact_coverage"));
        assert!(yaml.contains("n_top_genes"));

        let parsed = AnalysisConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.preprocess.min_genes, 50);
        assert_eq!(parsed.color.max_groups, 8);
        assert!(!parsed.alignment.exclusive_fuzzy);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
alignment:
  exclusive_fuzzy: true
preprocess:
  min_genes: 10
"#;
        let config = AnalysisConfig::from_yaml(yaml).unwrap();
        assert!(config.alignment.exclusive_fuzzy);
        assert_eq!(config.alignment.fuzzy_coverage, 0.5);
        assert_eq!(config.preprocess.min_genes, 10);
        assert_eq!(config.preprocess.n_top_genes, 2000);
        assert_eq!(config.color.priority_columns[0], "cluster");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let yaml = "alignment:\n  exact_coverage: 1.5\n";
        assert!(matches!(
            AnalysisConfig::from_yaml(yaml),
            Err(CellscapeError::InvalidParameter(_))
        ));

        let yaml = "color:\n  min_groups: 9\n";
        assert!(AnalysisConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "color:\n  cells_per_group: 100").unwrap();
        file.flush().unwrap();

        let config = AnalysisConfig::from_file(file.path()).unwrap();
        assert_eq!(config.color.cells_per_group, 100);
    }
}
