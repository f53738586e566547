//! Vitals CLI - Command-line interface for Vitals Flux
//!
//! Commands:
//! - run: Read raw exports, compute every table, write CSV outputs
//! - inspect: Summarize the input exports
//! - doctor: Diagnose configuration and input files
//! - config: Print the effective configuration

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use vitals_flux::config::PipelineConfig;
use vitals_flux::ingest::{strength_sets, RawTable};
use vitals_flux::pipeline::{run_pipeline, PipelineInputs};
use vitals_flux::sink::CsvDirSink;
use vitals_flux::workouts::{daily_cardio_minutes, workout_records};
use vitals_flux::{ComputeError, FLUX_VERSION, PRODUCER_NAME};

/// Vitals - Batch compute engine for personal health dashboards
#[derive(Parser)]
#[command(name = "vitals")]
#[command(version = FLUX_VERSION)]
#[command(about = "Turn health, strength and mood exports into dashboard tables", long_about = None)]
struct Cli {
    /// Configuration file merged over the built-in defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the input directory
    #[arg(long, global = true)]
    input_dir: Option<PathBuf>,

    /// Override the output directory
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write every output table
    Run {
        /// Date that closes daily series and anchors custom mood entries
        /// (YYYY-MM-DD, defaults to the local date)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Summarize the input exports
    Inspect {
        /// Date that closes daily series (YYYY-MM-DD, defaults to the local date)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and input files
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), VitalsCliError> {
    let config = load_config(
        cli.config.as_deref(),
        cli.input_dir.clone(),
        cli.output_dir.clone(),
    );

    match cli.command {
        Commands::Run { today } => cmd_run(config?, today.unwrap_or_else(local_today)),
        Commands::Inspect { today, json } => {
            cmd_inspect(&config?, today.unwrap_or_else(local_today), json)
        }
        Commands::Doctor { json } => cmd_doctor(config, json),
        Commands::Config => {
            print!("{}", config?.to_toml_string()?);
            Ok(())
        }
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

fn load_config(
    path: Option<&Path>,
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<PipelineConfig, ComputeError> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::builtin()?,
    };
    if let Some(dir) = input_dir {
        config.paths.input_dir = dir;
    }
    if let Some(dir) = output_dir {
        config.paths.output_dir = dir;
    }
    Ok(config)
}

fn cmd_run(config: PipelineConfig, today: NaiveDate) -> Result<(), VitalsCliError> {
    let mut sink = CsvDirSink::new(&config.paths.output_dir);
    let outputs = run_pipeline(config, today, &mut sink)?;

    let summary = RunSummary {
        output_dir: sink.dir().display().to_string(),
        today: today.to_string(),
        weight_days: outputs.weight_data.len(),
        weightlifting_sets: outputs.weightlifting_data.len(),
        mental_health_rows: outputs.mental_health_data.len(),
        volume_days: outputs.volume_data.len(),
        classified_exercises: outputs.exercise_classifications.as_ref().map(Vec::len),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_inspect(config: &PipelineConfig, today: NaiveDate, json: bool) -> Result<(), VitalsCliError> {
    let inputs = PipelineInputs::load(&config.paths)?;

    let mut tables = vec![
        table_summary(&config.paths.health_records, &inputs.health_records),
        table_summary(&config.paths.strength_log, &inputs.strength_log),
        table_summary(&config.paths.mood_log, &inputs.mood_log),
        table_summary(&config.paths.custom_entries, &inputs.custom_entries),
        table_summary(&config.paths.custom_symptoms, &inputs.custom_symptoms),
    ];
    if let (Some(file), Some(table)) = (
        &config.paths.exercise_muscle_groups,
        &inputs.exercise_muscle_groups,
    ) {
        tables.push(table_summary(file, table));
    }

    let sets = strength_sets(&inputs.strength_log)?;
    let strength_span = span_of(sets.iter().map(|s| s.date));
    let exercises = {
        let mut names: Vec<&str> = sets.iter().filter_map(|s| s.exercise_name.as_deref()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    };

    let workouts_path = config.paths.input(&config.paths.workouts);
    let cardio = if workouts_path.exists() {
        let table = RawTable::from_path(&workouts_path)?;
        tables.push(table_summary(&config.paths.workouts, &table));
        let records = workout_records(&table)?;
        match daily_cardio_minutes(&records, &config.workouts, today) {
            Ok(series) => config
                .workouts
                .activities
                .iter()
                .map(|activity| CardioSummary {
                    activity: activity.clone(),
                    minutes: series.total(activity),
                })
                .collect(),
            Err(ComputeError::EmptyInput(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        }
    } else {
        Vec::new()
    };

    let report = InspectReport {
        input_dir: config.paths.input_dir.display().to_string(),
        tables,
        strength_span,
        exercises,
        cardio,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Vitals Input Report");
        println!("===================");
        println!("Input dir: {}", report.input_dir);
        println!("\nTables:");
        for table in &report.tables {
            println!("  {:<32} {:>8} rows  {} columns", table.file, table.rows, table.columns);
        }
        if let Some((first, last)) = &report.strength_span {
            println!("\nStrength log: {} .. {} ({} exercises)", first, last, report.exercises);
        }
        if !report.cardio.is_empty() {
            println!("\nCardio minutes:");
            for entry in &report.cardio {
                println!("  {:<16} {:>10.1}", entry.activity, entry.minutes);
            }
        }
    }
    Ok(())
}

fn table_summary(file: &str, table: &RawTable) -> TableSummary {
    TableSummary {
        file: file.to_string(),
        rows: table.len(),
        columns: table.headers().len(),
    }
}

fn span_of(dates: impl Iterator<Item = NaiveDate>) -> Option<(String, String)> {
    let (first, last) = dates.fold(None, |acc: Option<(NaiveDate, NaiveDate)>, d| match acc {
        None => Some((d, d)),
        Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
    })?;
    Some((first.to_string(), last.to_string()))
}

fn cmd_doctor(config: Result<PipelineConfig, ComputeError>, json: bool) -> Result<(), VitalsCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    // Check Flux version
    checks.push(DoctorCheck {
        name: "flux_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Vitals Flux version {}", FLUX_VERSION),
    });

    match config {
        Err(e) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot load configuration: {}", e),
        }),
        Ok(config) => {
            checks.push(match config.validate() {
                Ok(()) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Configuration valid ({} score categories, {} exceptional days)",
                        config.mental_health.categories.len(),
                        config.mental_health.exceptional_days.len()
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            });

            let paths = &config.paths;
            let required = [
                &paths.health_records,
                &paths.strength_log,
                &paths.mood_log,
                &paths.custom_entries,
                &paths.custom_symptoms,
            ];
            for file in required {
                checks.push(file_check(&paths.input(file), CheckStatus::Error));
            }
            checks.push(file_check(&paths.input(&paths.workouts), CheckStatus::Warning));
            if let Some(file) = &paths.exercise_muscle_groups {
                checks.push(file_check(&paths.input(file), CheckStatus::Warning));
            }

            checks.push(if paths.output_dir.is_dir() {
                DoctorCheck {
                    name: "output_dir".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("{} exists", paths.output_dir.display()),
                }
            } else {
                DoctorCheck {
                    name: "output_dir".to_string(),
                    status: CheckStatus::Warning,
                    message: format!("{} will be created", paths.output_dir.display()),
                }
            });
        }
    }

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Vitals Doctor Report");
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
        Err(VitalsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn file_check(path: &Path, missing: CheckStatus) -> DoctorCheck {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    if !path.exists() {
        return DoctorCheck {
            name,
            status: missing,
            message: format!("{} not found", path.display()),
        };
    }
    match RawTable::from_path(path) {
        Ok(table) => DoctorCheck {
            name,
            status: CheckStatus::Ok,
            message: format!("{} rows, {} columns", table.len(), table.headers().len()),
        },
        Err(e) => DoctorCheck {
            name,
            status: CheckStatus::Error,
            message: format!("Unreadable: {}", e),
        },
    }
}

// Error types

#[derive(Debug)]
enum VitalsCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for VitalsCliError {
    fn from(e: io::Error) -> Self {
        VitalsCliError::Io(e)
    }
}

impl From<ComputeError> for VitalsCliError {
    fn from(e: ComputeError) -> Self {
        match e {
            ComputeError::Io(e) => VitalsCliError::Io(e),
            other => VitalsCliError::Compute(other),
        }
    }
}

impl From<serde_json::Error> for VitalsCliError {
    fn from(e: serde_json::Error) -> Self {
        VitalsCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<VitalsCliError> for CliError {
    fn from(e: VitalsCliError) -> Self {
        match e {
            VitalsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions; 'vitals doctor' lists expected inputs".to_string()),
            },
            VitalsCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::EmptyInput(_) => (
                        "EMPTY_INPUT",
                        "An export has no usable rows (body mass records, strength sets)",
                    ),
                    ComputeError::InvalidDefinition(_) => (
                        "INVALID_DEFINITION",
                        "Fix the score category in the configuration",
                    ),
                    ComputeError::Config(_) | ComputeError::Toml(_) => (
                        "CONFIG_ERROR",
                        "Run 'vitals config' to see the effective configuration",
                    ),
                    ComputeError::MissingColumn(_) => (
                        "MISSING_COLUMN",
                        "Check the export headers against the expected columns",
                    ),
                    _ => ("PARSE_ERROR", "Check input format"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            VitalsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            VitalsCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct RunSummary {
    output_dir: String,
    today: String,
    weight_days: usize,
    weightlifting_sets: usize,
    mental_health_rows: usize,
    volume_days: usize,
    classified_exercises: Option<usize>,
}

#[derive(serde::Serialize)]
struct InspectReport {
    input_dir: String,
    tables: Vec<TableSummary>,
    strength_span: Option<(String, String)>,
    exercises: usize,
    cardio: Vec<CardioSummary>,
}

#[derive(serde::Serialize)]
struct TableSummary {
    file: String,
    rows: usize,
    columns: usize,
}

#[derive(serde::Serialize)]
struct CardioSummary {
    activity: String,
    minutes: f64,
}

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
