//! Build the annotated dataset from an expression table and optional metadata.

use crate::align::{AlignmentConfig, AlignmentReport, IdentityAligner, IdentityMapping};
use crate::data::{
    AnnotationColumn, AssembledDataset, MetadataTable, SampleTable, Variable, VariableType,
};
use crate::error::{CellscapeError, Result};
use log::{debug, info};
use sprs::TriMat;

/// Per-sample identifier echo column.
pub const CELL_ID_COLUMN: &str = "cell_id";
/// Per-sample count of expressed features.
pub const N_GENES_COLUMN: &str = "n_genes";
/// Per-feature identifier echo column.
pub const GENE_NAME_COLUMN: &str = "gene_name";
/// Per-feature count of expressing samples.
pub const N_CELLS_COLUMN: &str = "n_cells";

/// An assembled dataset with the alignment that produced it.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub dataset: AssembledDataset,
    /// Present when metadata was supplied.
    pub alignment: Option<AlignmentReport>,
}

/// Merges expression values and metadata onto one sample axis.
#[derive(Debug, Clone, Default)]
pub struct DatasetAssembler {
    aligner: IdentityAligner,
}

impl DatasetAssembler {
    pub fn new(config: AlignmentConfig) -> Self {
        Self {
            aligner: IdentityAligner::new(config),
        }
    }

    /// Assemble a samples × features dataset.
    ///
    /// Metadata columns come first, in metadata order, followed by the derived
    /// `cell_id` and `n_genes` columns. Samples without a metadata counterpart
    /// get [`Variable::Unknown`] in categorical columns and `0` in continuous
    /// ones.
    pub fn assemble(
        &self,
        expression: &SampleTable,
        metadata: Option<&MetadataTable>,
    ) -> Result<Assembly> {
        if expression.n_samples() == 0 {
            return Err(CellscapeError::Construction(
                "expression table has no samples".to_string(),
            ));
        }
        if expression.n_features() == 0 {
            return Err(CellscapeError::Construction(
                "expression table has no features".to_string(),
            ));
        }

        let mut dataset = AssembledDataset::new(
            transpose_to_sparse(expression),
            expression.sample_ids().to_vec(),
            expression.feature_ids().to_vec(),
        )?;

        let alignment = match metadata {
            Some(meta) => {
                let alignment = self.aligner.align(expression.sample_ids(), meta.sample_ids());
                attach_metadata(&mut dataset, meta, &alignment.mapping)?;
                Some(alignment.report)
            }
            None => {
                debug!("no metadata supplied; dataset carries derived columns only");
                None
            }
        };

        attach_derived_columns(&mut dataset)?;

        info!(
            "assembled dataset: {} samples x {} features, columns {:?}",
            dataset.n_obs(),
            dataset.n_vars(),
            dataset.available_columns()
        );
        Ok(Assembly { dataset, alignment })
    }
}

/// Features × samples dense table into a samples × features CSR matrix.
fn transpose_to_sparse(expression: &SampleTable) -> sprs::CsMat<f64> {
    let matrix = expression.matrix();
    let mut tri_mat = TriMat::new((expression.n_samples(), expression.n_features()));
    for feature in 0..expression.n_features() {
        for sample in 0..expression.n_samples() {
            let val = matrix[(feature, sample)];
            if val != 0.0 {
                tri_mat.add_triplet(sample, feature, val);
            }
        }
    }
    tri_mat.to_csr()
}

fn attach_metadata(
    dataset: &mut AssembledDataset,
    metadata: &MetadataTable,
    mapping: &IdentityMapping,
) -> Result<()> {
    let sample_ids = dataset.sample_ids().to_vec();
    for column in metadata.column_names() {
        let kind = metadata
            .column_type(column)
            .unwrap_or(VariableType::Categorical);
        let values: Vec<Variable> = sample_ids
            .iter()
            .map(|sid| match mapping.get(sid) {
                Some(meta_id) => metadata
                    .get(meta_id, column)
                    .cloned()
                    .unwrap_or(Variable::Missing),
                None => unmapped_value(kind),
            })
            .collect();
        dataset
            .obs_mut()
            .insert(AnnotationColumn::new(column, kind, values))?;
    }
    Ok(())
}

fn unmapped_value(kind: VariableType) -> Variable {
    match kind {
        VariableType::Continuous => Variable::Continuous(0.0),
        VariableType::Categorical | VariableType::Identifier => Variable::Unknown,
    }
}

/// Recompute the identifier echo and expression count columns.
pub fn attach_derived_columns(dataset: &mut AssembledDataset) -> Result<()> {
    let sample_ids = dataset.sample_ids().to_vec();
    let feature_ids = dataset.feature_ids().to_vec();
    let per_sample = dataset.expressed_per_sample();
    let per_feature = dataset.expressed_per_feature();

    dataset
        .obs_mut()
        .insert(AnnotationColumn::from_ids(CELL_ID_COLUMN, &sample_ids))?;
    dataset
        .obs_mut()
        .insert(AnnotationColumn::from_counts(N_GENES_COLUMN, &per_sample))?;
    dataset
        .var_mut()
        .insert(AnnotationColumn::from_ids(GENE_NAME_COLUMN, &feature_ids))?;
    dataset
        .var_mut()
        .insert(AnnotationColumn::from_counts(N_CELLS_COLUMN, &per_feature))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignmentStrategy;

    fn create_test_expression() -> SampleTable {
        // 3 genes × 3 cells
        SampleTable::from_rows(
            vec!["CD3E".into(), "MS4A1".into(), "LYZ".into()],
            vec!["s1".into(), "s2".into(), "s3".into()],
            &[
                vec![5.0, 0.0, 1.0],
                vec![0.0, 3.0, 2.0],
                vec![0.0, 0.0, 4.0],
            ],
        )
        .unwrap()
    }

    fn metadata(ids: &[&str], clusters: &[&str], scores: &[&str]) -> MetadataTable {
        MetadataTable::from_raw(
            vec!["cluster".into(), "score".into()],
            ids.iter()
                .zip(clusters.iter().zip(scores))
                .map(|(id, (c, s))| (id.to_string(), vec![c.to_string(), s.to_string()]))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_without_metadata_only_derived_columns() {
        let expression = SampleTable::from_rows(
            vec!["g1".into()],
            vec!["a".into(), "b".into()],
            &[vec![1.0, 0.0]],
        )
        .unwrap();
        let assembly = DatasetAssembler::default().assemble(&expression, None).unwrap();

        assert!(assembly.alignment.is_none());
        assert_eq!(assembly.dataset.available_columns(), vec!["cell_id", "n_genes"]);
        assert_eq!(assembly.dataset.var().names(), vec!["gene_name", "n_cells"]);
        assert_eq!(
            assembly.dataset.obs().get("cell_id").unwrap().kind,
            VariableType::Identifier
        );
    }

    #[test]
    fn test_derived_counts() {
        let assembly = DatasetAssembler::default()
            .assemble(&create_test_expression(), None)
            .unwrap();
        let ds = &assembly.dataset;

        assert_eq!(ds.n_obs(), 3);
        assert_eq!(ds.n_vars(), 3);
        let n_genes: Vec<f64> = ds
            .obs()
            .get("n_genes")
            .unwrap()
            .values
            .iter()
            .filter_map(Variable::as_continuous)
            .collect();
        assert_eq!(n_genes, vec![1.0, 1.0, 3.0]);
        let n_cells: Vec<f64> = ds
            .var()
            .get("n_cells")
            .unwrap()
            .values
            .iter()
            .filter_map(Variable::as_continuous)
            .collect();
        assert_eq!(n_cells, vec![2.0, 2.0, 1.0]);
    }

    #[test]
    fn test_transposed_layout_keeps_feature_order() {
        let assembly = DatasetAssembler::default()
            .assemble(&create_test_expression(), None)
            .unwrap();
        let ds = &assembly.dataset;
        assert_eq!(ds.feature_ids(), &["CD3E", "MS4A1", "LYZ"]);
        assert_eq!(ds.row_dense(2), vec![1.0, 2.0, 4.0]);
        assert_eq!(ds.get(1, 1), 3.0);
    }

    #[test]
    fn test_fuzzy_metadata_fully_populated() {
        let meta = metadata(&["S1", "s2", "s3_1"], &["X", "Y", "Z"], &["1", "2", "3"]);
        let assembly = DatasetAssembler::default()
            .assemble(&create_test_expression(), Some(&meta))
            .unwrap();

        let report = assembly.alignment.unwrap();
        assert_eq!(report.strategy, AlignmentStrategy::Fuzzy);
        let cluster = assembly.dataset.obs().get("cluster").unwrap();
        assert_eq!(
            cluster.values,
            vec![
                Variable::Categorical("X".into()),
                Variable::Categorical("Y".into()),
                Variable::Categorical("Z".into()),
            ]
        );
        assert_eq!(
            assembly.dataset.available_columns(),
            vec!["cluster", "score", "cell_id", "n_genes"]
        );
    }

    #[test]
    fn test_unmapped_samples_get_sentinels() {
        // sizes differ and only s1 matches exactly: partial alignment
        let meta = metadata(&["s1", "q1"], &["X", "Y"], &["7", "8"]);
        let assembly = DatasetAssembler::default()
            .assemble(&create_test_expression(), Some(&meta))
            .unwrap();

        assert_eq!(assembly.alignment.unwrap().strategy, AlignmentStrategy::Partial);
        let obs = assembly.dataset.obs();
        assert_eq!(
            obs.get("cluster").unwrap().values,
            vec![
                Variable::Categorical("X".into()),
                Variable::Unknown,
                Variable::Unknown,
            ]
        );
        assert_eq!(
            obs.get("score").unwrap().values,
            vec![
                Variable::Continuous(7.0),
                Variable::Continuous(0.0),
                Variable::Continuous(0.0),
            ]
        );
    }

    #[test]
    fn test_zero_features_fails() {
        let expression = SampleTable::from_rows(vec![], vec!["a".into()], &[]).unwrap();
        let result = DatasetAssembler::default().assemble(&expression, None);
        assert!(matches!(result, Err(CellscapeError::Construction(_))));
    }

    #[test]
    fn test_zero_samples_fails() {
        let expression = SampleTable::from_rows(vec!["g1".into()], vec![], &[vec![]]).unwrap();
        let result = DatasetAssembler::default().assemble(&expression, None);
        assert!(matches!(result, Err(CellscapeError::Construction(_))));
    }
}
