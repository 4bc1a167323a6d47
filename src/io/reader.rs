//! Delimited expression and metadata tables.
//!
//! Expression tables carry features as rows and samples as columns: the
//! header row names the samples and the first field of every row names the
//! feature. Metadata tables carry one row per sample, keyed by the first field.

use crate::data::{is_missing_token, MetadataTable, SampleTable};
use crate::error::{CellscapeError, Result};
use log::{debug, info, warn};
use std::path::Path;

/// Missing-value share above which a warning is logged.
pub const MISSING_WARN_RATIO: f64 = 0.1;

/// Supported delimited formats, picked by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Tsv,
}

impl TableFormat {
    /// `.tsv` and `.txt` are tab-delimited, Excel and HDF5 files are rejected
    /// and anything else is read as CSV.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "tsv" | "txt" => Ok(Self::Tsv),
            "xlsx" | "xls" => Err(CellscapeError::UnsupportedFormat(format!(
                "Excel workbooks are not supported, export {} as CSV or TSV",
                path.as_ref().display()
            ))),
            "h5ad" | "h5" => Err(CellscapeError::UnsupportedFormat(format!(
                "HDF5 inputs are not supported, export the matrix in {} as CSV or TSV",
                path.as_ref().display()
            ))),
            _ => Ok(Self::Csv),
        }
    }

    #[inline]
    pub fn delimiter(&self) -> u8 {
        match self {
            Self::Csv => b',',
            Self::Tsv => b'\t',
        }
    }
}

/// Source of expression and metadata tables.
pub trait TableReader {
    fn read_expression(&self, path: &Path) -> Result<SampleTable>;

    fn read_metadata(&self, path: &Path) -> Result<MetadataTable>;
}

/// Reads CSV, TSV and TXT tables with the `csv` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedTableReader;

impl DelimitedTableReader {
    pub fn new() -> Self {
        Self
    }

    /// Header fields and records, with the first column split off as labels.
    fn read_labelled(&self, path: &Path) -> Result<(Vec<String>, Vec<(String, Vec<String>)>)> {
        let format = TableFormat::from_path(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(format.delimiter())
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let header: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
        if header.is_empty() {
            return Err(CellscapeError::Construction(format!(
                "{} has no header row",
                path.display()
            )));
        }
        let columns = header[1..].to_vec();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut fields = record.iter();
            let Some(label) = fields.next() else {
                continue;
            };
            if label.is_empty() && record.len() == 1 {
                continue;
            }
            rows.push((label.to_string(), fields.map(|s| s.to_string()).collect()));
        }

        debug!(
            "read {} rows x {} columns from {}",
            rows.len(),
            columns.len(),
            path.display()
        );
        Ok((columns, rows))
    }
}

impl TableReader for DelimitedTableReader {
    /// Missing cells are read as 0.
    fn read_expression(&self, path: &Path) -> Result<SampleTable> {
        let (sample_ids, rows) = self.read_labelled(path)?;
        if sample_ids.is_empty() {
            return Err(CellscapeError::Construction(format!(
                "{} has no sample columns",
                path.display()
            )));
        }

        let n_samples = sample_ids.len();
        let mut feature_ids = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        let mut n_missing = 0usize;

        for (row_idx, (feature_id, fields)) in rows.into_iter().enumerate() {
            let mut row = Vec::with_capacity(n_samples);
            for col_idx in 0..n_samples {
                let raw = fields.get(col_idx).map(String::as_str).unwrap_or("");
                if is_missing_token(raw) {
                    n_missing += 1;
                    row.push(0.0);
                    continue;
                }
                let value: f64 = raw.parse().map_err(|_| CellscapeError::InvalidValue {
                    value: raw.to_string(),
                    row: row_idx,
                    col: col_idx,
                })?;
                row.push(value);
            }
            feature_ids.push(feature_id);
            values.push(row);
        }

        let n_cells = feature_ids.len() * n_samples;
        if n_cells > 0 {
            let ratio = n_missing as f64 / n_cells as f64;
            if ratio > MISSING_WARN_RATIO {
                warn!(
                    "{:.1}% of expression values in {} are missing and were read as 0",
                    ratio * 100.0,
                    path.display()
                );
            }
        }

        let table = SampleTable::from_rows(feature_ids, sample_ids, &values)?;
        info!(
            "loaded expression table: {} features x {} samples",
            table.n_features(),
            table.n_samples()
        );
        Ok(table)
    }

    fn read_metadata(&self, path: &Path) -> Result<MetadataTable> {
        let (columns, rows) = self.read_labelled(path)?;
        let metadata = MetadataTable::from_raw(columns, rows)?;
        info!(
            "loaded metadata: {} samples, columns {:?}",
            metadata.n_samples(),
            metadata.column_names()
        );
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Variable, VariableType};
    use std::io::Write;
    use tempfile::Builder;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(TableFormat::from_path("a.tsv").unwrap(), TableFormat::Tsv);
        assert_eq!(TableFormat::from_path("a.TXT").unwrap(), TableFormat::Tsv);
        assert_eq!(TableFormat::from_path("a.csv").unwrap(), TableFormat::Csv);
        assert_eq!(TableFormat::from_path("matrix").unwrap(), TableFormat::Csv);
        assert!(matches!(
            TableFormat::from_path("a.xlsx"),
            Err(CellscapeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_hdf5_input_rejected() {
        let result = DelimitedTableReader::new().read_expression(Path::new("pbmc.h5ad"));
        assert!(matches!(
            result,
            Err(CellscapeError::UnsupportedFormat(msg)) if msg.contains("HDF5")
        ));
        assert!(matches!(
            TableFormat::from_path("pbmc.H5"),
            Err(CellscapeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_read_expression_tsv() {
        let file = write_temp(".tsv", "gene\ts1\ts2\ts3\nCD3E\t5\t0\t1\nLYZ\t0\t2.5\t4\n");
        let table = DelimitedTableReader::new().read_expression(file.path()).unwrap();

        assert_eq!(table.n_features(), 2);
        assert_eq!(table.n_samples(), 3);
        assert_eq!(table.sample_ids(), &["s1", "s2", "s3"]);
        assert_eq!(table.feature_ids(), &["CD3E", "LYZ"]);
        assert_eq!(table.get(1, 1), 2.5);
    }

    #[test]
    fn test_read_expression_csv_missing_as_zero() {
        let file = write_temp(".csv", "gene,s1,s2\ng1,NA,3\ng2,1\n");
        let table = DelimitedTableReader::new().read_expression(file.path()).unwrap();
        assert_eq!(table.get(0, 0), 0.0);
        assert_eq!(table.get(0, 1), 3.0);
        // short row padded
        assert_eq!(table.get(1, 1), 0.0);
    }

    #[test]
    fn test_read_expression_invalid_value() {
        let file = write_temp(".csv", "gene,s1\ng1,abc\n");
        let result = DelimitedTableReader::new().read_expression(file.path());
        assert!(matches!(
            result,
            Err(CellscapeError::InvalidValue { row: 0, col: 0, .. })
        ));
    }

    #[test]
    fn test_read_expression_duplicate_sample() {
        let file = write_temp(".csv", "gene,s1,s1\ng1,1,2\n");
        let result = DelimitedTableReader::new().read_expression(file.path());
        assert!(matches!(result, Err(CellscapeError::DuplicateIdentifier(_))));
    }

    #[test]
    fn test_read_metadata() {
        let file = write_temp(
            ".csv",
            "cell,cluster,score\nS1,X,0.5\ns2,Y,\ns3_1,Z,1.5\n",
        );
        let meta = DelimitedTableReader::new().read_metadata(file.path()).unwrap();

        assert_eq!(meta.sample_ids(), &["S1", "s2", "s3_1"]);
        assert_eq!(meta.column_names(), &["cluster", "score"]);
        assert_eq!(meta.column_type("cluster"), Some(VariableType::Categorical));
        assert_eq!(meta.column_type("score"), Some(VariableType::Continuous));
        assert_eq!(meta.get("s2", "score"), Some(&Variable::Missing));
        assert_eq!(meta.get("S1", "cluster"), Some(&Variable::Categorical("X".into())));
    }
}
