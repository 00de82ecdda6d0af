//! Offline training: access log (or structured CSV) → isolation forest model file.
//!
//! Hyperparameters come from the `training` section of the service config.

use access_sentinel::{
    config::ServiceConfig,
    features::FeatureExtractor,
    logging::StructuredLogger,
    model::{AnomalyDetector, ForestParams, IsolationForest},
    parser::{LogRow, LogTable, LogTableBuilder},
    storage::{read_rows, write_rows},
};
use clap::Parser;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

/// Train the access-log anomaly model
#[derive(Parser, Debug)]
#[command(name = "access-sentinel-train")]
#[command(version)]
#[command(about = "Train the isolation forest used by access-sentinel", long_about = None)]
struct TrainArgs {
    /// Raw access log, or a structured `.csv` written by a previous run
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Also write the parsed table as CSV
    #[arg(long, value_name = "CSV")]
    structured_out: Option<PathBuf>,

    /// Model destination (defaults to `model_path` from the config)
    #[arg(long, value_name = "PATH")]
    model_out: Option<PathBuf>,
}

#[derive(Serialize)]
struct TrainingReport<'a> {
    input: &'a Path,
    rows: usize,
    dropped_lines: usize,
    trees: usize,
    contamination: f64,
    threshold: f64,
    training_anomalies: usize,
    model_path: &'a Path,
}

fn load_table(input: &Path) -> Result<LogTable, Box<dyn std::error::Error + Send + Sync>> {
    let is_csv = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        let rows = read_rows::<LogRow>(input)?;
        return Ok(LogTable { rows, dropped_lines: 0 });
    }
    let reader = BufReader::new(File::open(input)?);
    Ok(LogTableBuilder::new().build_from_reader(reader)?)
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = TrainArgs::parse();
    let config = ServiceConfig::load(&ServiceConfig::path_from_env());

    StructuredLogger::init(false, &config.log.level);

    let table = load_table(&args.input)?;
    info!(
        input = %args.input.display(),
        rows = table.len(),
        dropped_lines = table.dropped_lines,
        "training data loaded"
    );

    if let Some(out) = &args.structured_out {
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        write_rows(out, &LogRow::COLUMNS, &table.rows)?;
        info!(path = %out.display(), "structured data written");
    }

    let features = FeatureExtractor::new(config.features.clone()).extract(&table);
    let params = ForestParams::from(&config.training);
    let forest = IsolationForest::fit(&features, &params)?;
    let training_anomalies = forest
        .predict(&features)
        .iter()
        .filter(|l| l.is_anomaly())
        .count();

    let model_path = args.model_out.as_deref().unwrap_or(config.model_path.as_path());
    forest.save(model_path)?;
    info!(path = %model_path.display(), "model saved");

    let report = TrainingReport {
        input: &args.input,
        rows: table.len(),
        dropped_lines: table.dropped_lines,
        trees: forest.n_trees(),
        contamination: params.contamination,
        threshold: forest.threshold(),
        training_anomalies,
        model_path,
    };
    StructuredLogger::emit_json(&report, &mut std::io::stdout().lock())?;
    Ok(())
}
