//! cellscape - expression matrix to scatter payload CLI
//!
//! Command-line interface for aligning, reducing and color-encoding
//! single-cell expression tables.

use cellscape::config::AnalysisConfig;
use cellscape::error::Result;
use cellscape::pipeline::{PlotRequest, Processor};
use cellscape::profile::summarize_files;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for summaries.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SummaryFormat {
    Text,
    Json,
    Yaml,
}

/// Expression matrix to scatter payload
#[derive(Parser)]
#[command(name = "cellscape")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce a dataset and print the plot payload
    Plot {
        /// Path to expression matrix (CSV, TSV or TXT; genes as rows)
        #[arg(short, long)]
        expression: PathBuf,

        /// Path to per-cell metadata (first column holds cell ids)
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Reduction method: pca, umap or tsne
        #[arg(long, default_value = "pca")]
        method: String,

        /// Annotation column to color by
        #[arg(short, long)]
        color_by: Option<String>,

        /// Analysis configuration YAML
        #[arg(long)]
        config: Option<PathBuf>,

        /// Also write the assembled dataset to this path
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// Assemble expression and metadata and write them as TSV files
    Convert {
        /// Path to expression matrix
        #[arg(short, long)]
        expression: PathBuf,

        /// Path to per-cell metadata
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Output stem (a trailing .h5ad is dropped)
        #[arg(short, long)]
        output: PathBuf,

        /// Analysis configuration YAML
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Summarize an assembled dataset
    Summary {
        /// Path to expression matrix
        #[arg(short, long)]
        expression: PathBuf,

        /// Path to per-cell metadata
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: SummaryFormat,
    },

    /// Write the default analysis configuration
    ExampleConfig {
        /// Output path for the YAML file
        #[arg(short, long, default_value = "cellscape.yaml")]
        output: PathBuf,
    },
}

fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Plot {
            expression,
            metadata,
            method,
            color_by,
            config,
            save,
        } => cmd_plot(expression, metadata, &method, color_by, config.as_ref(), save),

        Commands::Convert {
            expression,
            metadata,
            output,
            config,
        } => cmd_convert(&expression, metadata.as_ref(), &output, config.as_ref()),

        Commands::Summary {
            expression,
            metadata,
            format,
        } => cmd_summary(&expression, metadata.as_ref(), format),

        Commands::ExampleConfig { output } => cmd_example_config(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => {
            eprintln!("Loading configuration from {:?}...", path);
            AnalysisConfig::from_file(path)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

/// Run the plot pipeline and print the framed payload
fn cmd_plot(
    expression: PathBuf,
    metadata: Option<PathBuf>,
    method: &str,
    color_by: Option<String>,
    config_path: Option<&PathBuf>,
    save: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let processor = Processor::new(&config);

    let mut request = PlotRequest::new(&expression).method(method);
    if let Some(path) = metadata {
        request = request.metadata(path);
    }
    if let Some(column) = color_by {
        request = request.color_by(&column);
    }
    if let Some(path) = save {
        request = request.save_to(path);
    }

    eprintln!("Processing {:?} with {}...", expression, method.to_uppercase());
    let response = processor.run(&request);
    println!("{}", response.to_framed_json()?);

    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

/// Assemble inputs and write the dataset
fn cmd_convert(
    expression: &PathBuf,
    metadata: Option<&PathBuf>,
    output: &PathBuf,
    config_path: Option<&PathBuf>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let processor = Processor::new(&config);

    eprintln!("Converting {:?}...", expression);
    let summary = processor.convert(expression, metadata.map(|p| p.as_path()), output)?;

    eprintln!(
        "Done! {} cells x {} genes written",
        summary.n_cells, summary.n_genes
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Print a dataset summary
fn cmd_summary(
    expression: &PathBuf,
    metadata: Option<&PathBuf>,
    format: SummaryFormat,
) -> Result<()> {
    eprintln!("Loading data...");
    let summary = summarize_files(
        &Processor::default(),
        expression,
        metadata.map(|p| p.as_path()),
    )?;

    match format {
        SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        SummaryFormat::Yaml => println!("{}", serde_yaml::to_string(&summary)?),
        SummaryFormat::Text => print!("{}", summary),
    }
    Ok(())
}

/// Write the default configuration
fn cmd_example_config(output_path: &PathBuf) -> Result<()> {
    let yaml = AnalysisConfig::default().to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example configuration to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}
