//! Stress CLI - Command-line interface for Stress Flux
//!
//! Commands:
//! - vectorize: Convert a wearable export directory into feature vectors
//! - predict: Run the stress model on one vector or a whole export
//! - serve: Run the single-page prediction form
//! - doctor: Diagnose export layout and model health

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use stress_flux::pipeline::Vectorizer;
use stress_flux::types::{FeatureMatrix, MetricSource};
use stress_flux::web::{self, AppState};
use stress_flux::{ComputeError, Predictor, FEATURE_NAMES, STRESS_VERSION, PRODUCER_NAME};

/// Stress - Wearable exports to stress-model feature vectors
#[derive(Parser)]
#[command(name = "stress")]
#[command(author = "Synheart AI Inc")]
#[command(version = STRESS_VERSION)]
#[command(about = "Vectorize wearable exports and predict stress scores", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a raw export directory into feature vectors
    Vectorize {
        /// Export directory
        #[arg(short, long, env = "STRESS_EXPORT_DIR")]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "csv")]
        format: OutputFormat,

        /// Prefix each row with its date
        #[arg(long)]
        with_dates: bool,
    },

    /// Predict stress scores
    Predict {
        /// Model artifact (JSON)
        #[arg(short, long, env = "STRESS_MODEL_PATH")]
        model: PathBuf,

        /// Comma-separated feature values, in trained order
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, conflicts_with = "input")]
        features: Option<Vec<f64>>,

        /// Export directory to vectorize and predict row by row
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print unclamped model output instead of a 0-100 score
        #[arg(long)]
        raw: bool,
    },

    /// Serve the prediction form
    Serve {
        /// Model artifact (JSON)
        #[arg(short, long, env = "STRESS_MODEL_PATH")]
        model: PathBuf,

        /// Listen address
        #[arg(long, env = "STRESS_ADDR", default_value = "127.0.0.1:5000")]
        addr: String,
    },

    /// Diagnose export layout and model health
    Doctor {
        /// Export directory to check
        #[arg(short, long, env = "STRESS_EXPORT_DIR")]
        input: PathBuf,

        /// Model artifact to check
        #[arg(short, long, env = "STRESS_MODEL_PATH")]
        model: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Comma-separated values, no header
    Csv,
    /// JSON array
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stress_flux=info,stress=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run(cli: Cli) -> Result<(), StressCliError> {
    match cli.command {
        Commands::Vectorize {
            input,
            output,
            format,
            with_dates,
        } => cmd_vectorize(&input, &output, format, with_dates),

        Commands::Predict {
            model,
            features,
            input,
            raw,
        } => cmd_predict(&model, features, input.as_deref(), raw),

        Commands::Serve { model, addr } => cmd_serve(&model, &addr),

        Commands::Doctor { input, model, json } => {
            cmd_doctor(&input, model.as_deref(), json)
        }
    }
}

fn cmd_vectorize(
    input: &Path,
    output: &Path,
    format: OutputFormat,
    with_dates: bool,
) -> Result<(), StressCliError> {
    let matrix = Vectorizer::new(input).vectorize()?;
    let output_data = format_output(&matrix, &format, with_dates)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_predict(
    model: &Path,
    features: Option<Vec<f64>>,
    input: Option<&Path>,
    raw: bool,
) -> Result<(), StressCliError> {
    let predictor = Predictor::load(model)?;
    let predict = |row: &[f64]| predict_row(&predictor, row, raw);

    match (features, input) {
        (Some(features), _) => {
            println!("{}", predict(features.as_slice())?);
        }
        (None, Some(input)) => {
            let matrix = Vectorizer::new(input).vectorize()?;
            for (date, row) in matrix.iter() {
                println!("{},{}", date.format("%Y-%m-%d"), predict(row.as_slice())?);
            }
        }
        (None, None) => return Err(StressCliError::NoInput),
    }

    Ok(())
}

fn predict_row(predictor: &Predictor, row: &[f64], raw: bool) -> Result<f64, ComputeError> {
    if raw {
        predictor.predict_raw(row)
    } else {
        predictor.predict_clamped(row)
    }
}

fn cmd_serve(model: &Path, addr: &str) -> Result<(), StressCliError> {
    let predictor = Arc::new(Predictor::load(model)?);
    let state = AppState::new(predictor);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(web::serve(addr, state))?;
    Ok(())
}

fn cmd_doctor(input: &Path, model: Option<&Path>, json: bool) -> Result<(), StressCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("stress-flux {}", STRESS_VERSION),
    });

    // Check each export source, then the merge across them
    let vectorizer = Vectorizer::new(input);
    let statuses = vectorizer.inspect();
    let all_sources_ok = statuses.iter().all(|s| s.is_ok());

    for status in statuses {
        checks.push(source_check(status.source, &status.result));
    }

    if all_sources_ok {
        checks.push(match vectorizer.vectorize() {
            Ok(matrix) => DoctorCheck {
                name: "merge".to_string(),
                status: CheckStatus::Ok,
                message: format!("{} days present in all sources", matrix.len()),
            },
            Err(e) => DoctorCheck {
                name: "merge".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        });
    }

    if let Some(model) = model {
        checks.push(match Predictor::load(model) {
            Ok(predictor) => DoctorCheck {
                name: "model".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "{} loaded ({} inputs, {} parameters)",
                    predictor.name(),
                    predictor.input_width(),
                    predictor.parameter_count()
                ),
            },
            Err(e) => DoctorCheck {
                name: "model".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        });
    } else {
        checks.push(DoctorCheck {
            name: "model".to_string(),
            status: CheckStatus::Warning,
            message: "No model artifact given".to_string(),
        });
    }

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: STRESS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Stress Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(StressCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn source_check(source: MetricSource, result: &Result<usize, ComputeError>) -> DoctorCheck {
    let (status, message) = match result {
        Ok(0) => (CheckStatus::Error, "no rows extracted".to_string()),
        Ok(days) => (CheckStatus::Ok, format!("{} days", days)),
        Err(e) => (CheckStatus::Error, e.to_string()),
    };
    DoctorCheck {
        name: source.as_str().to_string(),
        status,
        message,
    }
}

fn format_output(
    matrix: &FeatureMatrix,
    format: &OutputFormat,
    with_dates: bool,
) -> Result<String, StressCliError> {
    match format {
        OutputFormat::Csv => {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(Vec::new());
            for (date, row) in matrix.iter() {
                let mut record: Vec<String> = Vec::with_capacity(FEATURE_NAMES.len() + 1);
                if with_dates {
                    record.push(date.format("%Y-%m-%d").to_string());
                }
                record.extend(row.as_slice().iter().map(|v| v.to_string()));
                writer.write_record(&record)?;
            }
            let bytes = writer.into_inner().map_err(|e| e.into_error())?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let value = if with_dates {
                serde_json::to_value(
                    matrix
                        .iter()
                        .map(|(date, row)| DatedRow {
                            date: date.format("%Y-%m-%d").to_string(),
                            features: row.as_slice(),
                        })
                        .collect::<Vec<_>>(),
                )?
            } else {
                serde_json::to_value(matrix.to_rows())?
            };
            if matches!(format, OutputFormat::JsonPretty) {
                Ok(serde_json::to_string_pretty(&value)? + "\n")
            } else {
                Ok(serde_json::to_string(&value)? + "\n")
            }
        }
    }
}

#[derive(serde::Serialize)]
struct DatedRow<'a> {
    date: String,
    features: &'a [f64],
}

// Error types

#[derive(Debug)]
enum StressCliError {
    Io(std::io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    Csv(csv::Error),
    NoInput,
    DoctorFailed,
}

impl From<std::io::Error> for StressCliError {
    fn from(e: std::io::Error) -> Self {
        StressCliError::Io(e)
    }
}

impl From<ComputeError> for StressCliError {
    fn from(e: ComputeError) -> Self {
        StressCliError::Compute(e)
    }
}

impl From<serde_json::Error> for StressCliError {
    fn from(e: serde_json::Error) -> Self {
        StressCliError::Json(e)
    }
}

impl From<csv::Error> for StressCliError {
    fn from(e: csv::Error) -> Self {
        StressCliError::Csv(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<StressCliError> for CliError {
    fn from(e: StressCliError) -> Self {
        match e {
            StressCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            StressCliError::Compute(e) => compute_error(e),
            StressCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            StressCliError::Csv(e) => CliError {
                code: "CSV_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            StressCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "Nothing to predict".to_string(),
                hint: Some("Pass --features or --input".to_string()),
            },
            StressCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

fn compute_error(e: ComputeError) -> CliError {
    let (code, hint) = match &e {
        ComputeError::FileNotFound(_) => (
            "FILE_NOT_FOUND",
            Some("Check the export directory layout with 'stress doctor'"),
        ),
        ComputeError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
        ComputeError::Csv(_)
        | ComputeError::ParseError(_)
        | ComputeError::DateParseError(_)
        | ComputeError::MissingColumn(_)
        | ComputeError::DuplicateDate { .. } => {
            ("PARSE_ERROR", Some("Ensure the files are unmodified device exports"))
        }
        ComputeError::EmptyResult(_) => (
            "EMPTY_RESULT",
            Some("Every source must share at least one day"),
        ),
        ComputeError::ShapeError { .. } => ("SHAPE_ERROR", Some("Pass exactly 11 feature values")),
        ComputeError::LoadError(_) => ("LOAD_ERROR", Some("Check the model artifact path and JSON")),
        ComputeError::JsonError(_) => ("JSON_ERROR", None),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: hint.map(str::to_string),
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stress_flux::model::{Activation, DenseLayer, ModelArtifact};
    use stress_flux::FEATURE_COUNT;

    fn offset_model(bias: f64) -> Predictor {
        Predictor::from_artifact(ModelArtifact {
            name: Some("offset".to_string()),
            input_width: FEATURE_COUNT,
            standardizer: None,
            layers: vec![DenseLayer {
                weights: vec![vec![1.0; FEATURE_COUNT]],
                bias: vec![bias],
                activation: Activation::Linear,
            }],
        })
        .unwrap()
    }

    #[test]
    fn test_predict_defaults_to_clamped() {
        let cli = Cli::try_parse_from(["stress", "predict", "-m", "model.json", "--features", "1,2"]).unwrap();
        let Commands::Predict { raw, .. } = cli.command else {
            panic!("expected predict");
        };
        assert!(!raw);

        let predictor = offset_model(-5.0);
        let row = [0.0; FEATURE_COUNT];
        assert_eq!(predict_row(&predictor, &row, raw).unwrap(), 0.0);
        assert_eq!(predict_row(&predictor, &row, true).unwrap(), -5.0);
    }

    #[test]
    fn test_predict_raw_flag() {
        let cli = Cli::try_parse_from([
            "stress", "predict", "-m", "model.json", "--features", "1,-2", "--raw",
        ])
        .unwrap();
        let Commands::Predict { raw, features, .. } = cli.command else {
            panic!("expected predict");
        };
        assert!(raw);
        assert_eq!(features, Some(vec![1.0, -2.0]));
    }

    #[test]
    fn test_predict_rejects_clamp_flag() {
        let parsed = Cli::try_parse_from([
            "stress", "predict", "-m", "model.json", "--features", "1", "--clamp",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_doctor_requires_input() {
        std::env::remove_var("STRESS_EXPORT_DIR");
        assert!(Cli::try_parse_from(["stress", "doctor"]).is_err());

        let cli = Cli::try_parse_from(["stress", "doctor", "--input", "./export"]).unwrap();
        let Commands::Doctor { input, model, .. } = cli.command else {
            panic!("expected doctor");
        };
        assert_eq!(input, PathBuf::from("./export"));
        assert!(model.is_none());
    }
}
