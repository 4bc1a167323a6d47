//! Processor driving read → assemble → (write) → reduce → encode → payload.

use crate::assemble::{Assembly, DatasetAssembler};
use crate::config::AnalysisConfig;
use crate::data::{AssembledDataset, MetadataTable, SampleTable};
use crate::encode::{build_payload, ColorEncoder, ErrorPayload, PlotPayload, PlotResponse};
use crate::error::{CellscapeError, Result};
use crate::io::{DatasetWriter, DelimitedTableReader, TableReader, TsvDatasetWriter, WriteSummary};
use crate::reduce::{PcaEngine, ReductionEngine, ReductionMethod};
use log::{error, info, warn};
use std::path::{Path, PathBuf};

/// One plot request: input files, method, color column and optional save path.
#[derive(Debug, Clone)]
pub struct PlotRequest {
    pub expression_path: PathBuf,
    pub metadata_path: Option<PathBuf>,
    /// Reduction method name, parsed when the request runs.
    pub method: String,
    pub color_by: Option<String>,
    pub save_path: Option<PathBuf>,
}

impl PlotRequest {
    pub fn new<P: AsRef<Path>>(expression_path: P) -> Self {
        Self {
            expression_path: expression_path.as_ref().to_path_buf(),
            metadata_path: None,
            method: ReductionMethod::Pca.to_string(),
            color_by: None,
            save_path: None,
        }
    }

    pub fn metadata<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.metadata_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn color_by(mut self, column: &str) -> Self {
        self.color_by = Some(column.to_string());
        self
    }

    pub fn save_to<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.save_path = Some(path.as_ref().to_path_buf());
        self
    }
}

/// Runs the whole pipeline on owned copies of its inputs.
pub struct Processor {
    reader: Box<dyn TableReader>,
    engine: Box<dyn ReductionEngine>,
    writer: Box<dyn DatasetWriter>,
    assembler: DatasetAssembler,
    encoder: ColorEncoder,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl Processor {
    /// Processor with the delimited reader, PCA engine and TSV writer.
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            reader: Box::new(DelimitedTableReader::new()),
            engine: Box::new(PcaEngine::new(config.preprocess.clone())),
            writer: Box::new(TsvDatasetWriter::new()),
            assembler: DatasetAssembler::new(config.alignment.clone()),
            encoder: ColorEncoder::new(config.color.clone()),
        }
    }

    pub fn with_reader(mut self, reader: Box<dyn TableReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_engine(mut self, engine: Box<dyn ReductionEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_writer(mut self, writer: Box<dyn DatasetWriter>) -> Self {
        self.writer = writer;
        self
    }

    /// Read the expression table and, when present, the metadata table.
    ///
    /// A metadata path that is empty or does not exist is skipped with a
    /// warning rather than failing the request.
    pub fn load(
        &self,
        expression_path: &Path,
        metadata_path: Option<&Path>,
    ) -> Result<(SampleTable, Option<MetadataTable>)> {
        let expression = self.reader.read_expression(expression_path)?;

        let metadata = match metadata_path {
            Some(path) if path.as_os_str().is_empty() => None,
            Some(path) if !path.exists() => {
                warn!(
                    "metadata file {} does not exist, continuing without metadata",
                    path.display()
                );
                None
            }
            Some(path) => Some(self.reader.read_metadata(path)?),
            None => None,
        };

        Ok((expression, metadata))
    }

    pub fn assemble(
        &self,
        expression: &SampleTable,
        metadata: Option<&MetadataTable>,
    ) -> Result<Assembly> {
        let assembly = self.assembler.assemble(expression, metadata)?;
        if let Some(report) = assembly.alignment.as_ref() {
            info!(
                "alignment: {} ({} of {} samples mapped, coverage {:.2})",
                report.strategy, report.n_mapped, report.n_expression, report.coverage
            );
        }
        Ok(assembly)
    }

    /// Reduce an assembled dataset in place and build its plot payload.
    pub fn process_dataset(
        &self,
        dataset: &mut AssembledDataset,
        method: ReductionMethod,
        color_by: Option<&str>,
    ) -> Result<PlotPayload> {
        self.engine.reduce(dataset, method)?;

        let embedding = dataset.embedding(method).ok_or_else(|| {
            CellscapeError::Pipeline(format!(
                "engine '{}' did not attach a {} embedding",
                self.engine.name(),
                method.display_name()
            ))
        })?;
        let encoding = self.encoder.encode(dataset, color_by);

        if embedding.coordinates.len() != encoding.len() {
            return Err(CellscapeError::DimensionMismatch {
                expected: embedding.coordinates.len(),
                actual: encoding.len(),
            });
        }

        info!(
            "coloring {} samples by '{}' ({})",
            dataset.n_obs(),
            encoding.column,
            encoding.color_type
        );
        Ok(build_payload(
            &embedding.coordinates,
            &encoding,
            method.display_name(),
            dataset.n_obs(),
            &dataset.available_columns(),
            &encoding.column,
        ))
    }

    /// Run a request, returning the plot payload or the first hard failure.
    pub fn try_run(&self, request: &PlotRequest) -> Result<PlotPayload> {
        let method: ReductionMethod = request.method.parse()?;
        let (expression, metadata) = self.load(
            &request.expression_path,
            request.metadata_path.as_deref(),
        )?;
        let mut dataset = self.assemble(&expression, metadata.as_ref())?.dataset;

        let saved_path = match request.save_path.as_deref() {
            Some(path) => Some(self.writer.write(&dataset, path)?.file_path),
            None => None,
        };

        let mut payload = self.process_dataset(&mut dataset, method, request.color_by.as_deref())?;
        payload.saved_path = saved_path;
        Ok(payload)
    }

    /// Run a request; failures become an error payload.
    pub fn run(&self, request: &PlotRequest) -> PlotResponse {
        into_response(self.try_run(request))
    }

    /// Run on tables already in memory.
    pub fn run_tables(
        &self,
        expression: &SampleTable,
        metadata: Option<&MetadataTable>,
        method: ReductionMethod,
        color_by: Option<&str>,
    ) -> PlotResponse {
        let result = self
            .assemble(expression, metadata)
            .and_then(|assembly| {
                let mut dataset = assembly.dataset;
                self.process_dataset(&mut dataset, method, color_by)
            });
        into_response(result)
    }

    /// Assemble the input files and write the dataset without reducing it.
    pub fn convert(
        &self,
        expression_path: &Path,
        metadata_path: Option<&Path>,
        output: &Path,
    ) -> Result<WriteSummary> {
        let (expression, metadata) = self.load(expression_path, metadata_path)?;
        let assembly = self.assemble(&expression, metadata.as_ref())?;
        self.writer.write(&assembly.dataset, output)
    }
}

fn into_response(result: Result<PlotPayload>) -> PlotResponse {
    match result {
        Ok(payload) => {
            info!("generated {} coordinates for {}", payload.n_cells, payload.method);
            PlotResponse::Plot(payload)
        }
        Err(e) => {
            error!("analysis failed: {}", e);
            PlotResponse::Error(ErrorPayload::new(format!("analysis failed: {}", e)))
        }
    }
}

/// Run a plot request with default settings.
pub fn run_plot(
    expression_path: &Path,
    metadata_path: Option<&Path>,
    method: &str,
    color_by: Option<&str>,
) -> PlotResponse {
    let mut request = PlotRequest::new(expression_path).method(method);
    if let Some(path) = metadata_path {
        request = request.metadata(path);
    }
    if let Some(column) = color_by {
        request = request.color_by(column);
    }
    Processor::default().run(&request)
}
