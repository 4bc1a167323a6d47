//! Persist an assembled dataset as a set of TSV files.

use crate::data::{Annotations, AssembledDataset};
use crate::error::{CellscapeError, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const H5AD_SUFFIX: &str = ".h5ad";

/// What was written, echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteSummary {
    /// Path of the matrix file.
    pub file_path: String,
    pub files: Vec<String>,
    pub n_cells: usize,
    pub n_genes: usize,
    pub obs_columns: Vec<String>,
    pub var_columns: Vec<String>,
}

/// Destination for assembled datasets.
pub trait DatasetWriter {
    fn write(&self, dataset: &AssembledDataset, path: &Path) -> Result<WriteSummary>;
}

/// Writes `<stem>.obs.tsv`, `<stem>.var.tsv` and `<stem>.matrix.tsv`.
///
/// The matrix file keeps the expression-table layout (features as rows), so
/// it can be read back with [`crate::io::DelimitedTableReader`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TsvDatasetWriter;

impl TsvDatasetWriter {
    pub fn new() -> Self {
        Self
    }
}

/// Output stem for a requested path, without any `.h5ad` suffix.
pub fn output_stem(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            CellscapeError::InvalidParameter(format!("invalid output path {}", path.display()))
        })?;
    let stem = name.strip_suffix(H5AD_SUFFIX).unwrap_or(name);
    if stem.is_empty() {
        return Err(CellscapeError::InvalidParameter(format!(
            "output path {} has an empty file name",
            path.display()
        )));
    }
    Ok(path.with_file_name(stem))
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn tsv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    Ok(csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?)
}

fn write_annotations(path: &Path, ids: &[String], annotations: &Annotations) -> Result<()> {
    let mut writer = tsv_writer(path)?;

    let mut header = vec!["index".to_string()];
    header.extend(annotations.names());
    writer.write_record(&header)?;

    for (row, id) in ids.iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(id.clone());
        for column in annotations.columns() {
            record.push(column.values[row].to_cell());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_matrix(path: &Path, dataset: &AssembledDataset) -> Result<()> {
    let mut writer = tsv_writer(path)?;

    let mut header = vec!["gene".to_string()];
    header.extend(dataset.sample_ids().iter().cloned());
    writer.write_record(&header)?;

    let dense = dataset.to_dense();
    for (col, feature_id) in dataset.feature_ids().iter().enumerate() {
        let mut record = Vec::with_capacity(dataset.n_obs() + 1);
        record.push(feature_id.clone());
        record.extend(dense.column(col).iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

impl DatasetWriter for TsvDatasetWriter {
    fn write(&self, dataset: &AssembledDataset, path: &Path) -> Result<WriteSummary> {
        let stem = output_stem(path)?;
        if let Some(parent) = stem.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let obs_path = with_suffix(&stem, ".obs.tsv");
        let var_path = with_suffix(&stem, ".var.tsv");
        let matrix_path = with_suffix(&stem, ".matrix.tsv");

        write_annotations(&obs_path, dataset.sample_ids(), dataset.obs())?;
        write_annotations(&var_path, dataset.feature_ids(), dataset.var())?;
        write_matrix(&matrix_path, dataset)?;

        info!(
            "wrote {} samples x {} features to {}.*.tsv",
            dataset.n_obs(),
            dataset.n_vars(),
            stem.display()
        );

        Ok(WriteSummary {
            file_path: matrix_path.display().to_string(),
            files: [&obs_path, &var_path, &matrix_path]
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            n_cells: dataset.n_obs(),
            n_genes: dataset.n_vars(),
            obs_columns: dataset.obs().names(),
            var_columns: dataset.var().names(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::DatasetAssembler;
    use crate::data::{MetadataTable, SampleTable};
    use crate::io::{DelimitedTableReader, TableReader};
    use tempfile::tempdir;

    fn create_test_dataset() -> AssembledDataset {
        let expression = SampleTable::from_rows(
            vec!["g1".into(), "g2".into()],
            vec!["c1".into(), "c2".into()],
            &[vec![1.0, 0.0], vec![2.5, 3.0]],
        )
        .unwrap();
        let meta = MetadataTable::from_raw(
            vec!["cluster".into()],
            vec![
                ("c1".into(), vec!["A".into()]),
                ("c2".into(), vec!["NA".into()]),
            ],
        )
        .unwrap();
        DatasetAssembler::default()
            .assemble(&expression, Some(&meta))
            .unwrap()
            .dataset
    }

    #[test]
    fn test_output_stem_strips_h5ad() {
        assert_eq!(
            output_stem(Path::new("out/pbmc.h5ad")).unwrap(),
            PathBuf::from("out/pbmc")
        );
        assert_eq!(output_stem(Path::new("pbmc")).unwrap(), PathBuf::from("pbmc"));
        assert!(output_stem(Path::new("out/.h5ad")).is_err());
    }

    #[test]
    fn test_write_files() {
        let dir = tempdir().unwrap();
        let dataset = create_test_dataset();
        let summary = TsvDatasetWriter::new()
            .write(&dataset, &dir.path().join("nested/pbmc.h5ad"))
            .unwrap();

        assert_eq!(summary.n_cells, 2);
        assert_eq!(summary.n_genes, 2);
        assert_eq!(summary.obs_columns, vec!["cluster", "cell_id", "n_genes"]);
        assert_eq!(summary.var_columns, vec!["gene_name", "n_cells"]);
        assert_eq!(summary.files.len(), 3);

        let obs = std::fs::read_to_string(dir.path().join("nested/pbmc.obs.tsv")).unwrap();
        let lines: Vec<&str> = obs.lines().collect();
        assert_eq!(lines[0], "index\tcluster\tcell_id\tn_genes");
        assert_eq!(lines[1], "c1\tA\tc1\t2");
        assert_eq!(lines[2], "c2\t\tc2\t1");
    }

    #[test]
    fn test_matrix_reads_back() {
        let dir = tempdir().unwrap();
        let dataset = create_test_dataset();
        let summary = TsvDatasetWriter::new()
            .write(&dataset, &dir.path().join("pbmc"))
            .unwrap();

        let table = DelimitedTableReader::new()
            .read_expression(Path::new(&summary.file_path))
            .unwrap();
        assert_eq!(table.sample_ids(), &["c1", "c2"]);
        assert_eq!(table.feature_ids(), &["g1", "g2"]);
        assert_eq!(table.get(1, 0), 2.5);
        assert_eq!(table.get(0, 1), 0.0);
    }
}
