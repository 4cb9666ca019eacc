//! Somnolog CLI - Command-line interface for Somnolog
//!
//! Commands:
//! - analyze: Run the full pipeline over an interval log
//! - validate: Parse and ingest an interval log, reporting rejected records
//! - doctor: Diagnose configuration and environment

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use somnolog::ingest::{IngestOutcome, IntervalAdapter, IntervalRecord};
use somnolog::normalizer::resolve_zone;
use somnolog::pipeline::{analyze_ingested, AnalysisReport};
use somnolog::{PipelineConfig, PRODUCER_NAME, SOMNOLOG_VERSION};

/// Somnolog - Batch analytics engine for overnight sleep-tracking logs
#[derive(Parser)]
#[command(name = "somnolog")]
#[command(version = SOMNOLOG_VERSION)]
#[command(about = "Analyze sleep interval logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the analysis report
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Parse and ingest an interval log without analyzing it
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Keep only records starting in this year
        #[arg(long)]
        target_year: Option<i32>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Pipeline settings; flags override values from `--config`
#[derive(Args)]
struct ConfigArgs {
    /// Load settings from a JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target timezone (IANA format, e.g., "America/Chicago")
    #[arg(long)]
    timezone: Option<String>,

    /// Rolling variance window in data points
    #[arg(long)]
    variance_window: Option<usize>,

    /// Number of outlier days to report
    #[arg(long)]
    outlier_count: Option<usize>,

    /// Occupancy histogram slot width in minutes
    #[arg(long)]
    histogram_minutes: Option<u32>,

    /// Keep only records starting in this year
    #[arg(long)]
    target_year: Option<i32>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<PipelineConfig, SomnologCliError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json(&fs::read_to_string(path)?)?,
            None => PipelineConfig::default(),
        };

        if let Some(timezone) = &self.timezone {
            config.target_timezone = timezone.clone();
        }
        if let Some(window) = self.variance_window {
            config.variance_window_days = window;
        }
        if let Some(count) = self.outlier_count {
            config.outlier_count = count;
        }
        if let Some(minutes) = self.histogram_minutes {
            config.histogram_interval_minutes = minutes;
        }
        if self.target_year.is_some() {
            config.target_year = self.target_year;
        }

        Ok(config)
    }
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one report section per line)
    Ndjson,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), SomnologCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            input_format,
            output_format,
            config,
        } => cmd_analyze(&input, &output, input_format, output_format, &config.resolve()?),
        Commands::Validate {
            input,
            input_format,
            target_year,
            json,
        } => cmd_validate(&input, input_format, target_year, json),
        Commands::Doctor { config, json } => cmd_doctor(&config, json),
    }
}

fn read_input(input: &Path) -> Result<String, SomnologCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_records(data: &str, format: &InputFormat) -> Result<Vec<IntervalRecord>, SomnologCliError> {
    let records = match format {
        InputFormat::Ndjson => IntervalAdapter::parse_ndjson(data)?,
        InputFormat::Json => IntervalAdapter::parse_array(data)?,
    };
    Ok(records)
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: &PipelineConfig,
) -> Result<(), SomnologCliError> {
    config.validate()?;

    let records = parse_records(&read_input(input)?, &input_format)?;
    if records.is_empty() {
        return Err(SomnologCliError::NoRecords);
    }

    let ingested = IntervalAdapter::to_raw_intervals(&records, config.target_year);
    if ingested.intervals.is_empty() {
        return Err(SomnologCliError::NoIntervals);
    }

    let report = analyze_ingested(ingested, config)?;
    let output_data = format_output(&report, &output_format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn format_output(report: &AnalysisReport, format: &OutputFormat) -> Result<String, SomnologCliError> {
    match format {
        OutputFormat::Ndjson => {
            let value = serde_json::to_value(report)?;
            let mut lines: Vec<String> = Vec::new();
            if let serde_json::Value::Object(sections) = value {
                for (section, data) in sections {
                    lines.push(serde_json::to_string(&serde_json::json!({
                        "section": section,
                        "data": data,
                    }))?);
                }
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(report.to_json()? + "\n"),
        OutputFormat::JsonPretty => Ok(report.to_json_pretty()? + "\n"),
    }
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    target_year: Option<i32>,
    json: bool,
) -> Result<(), SomnologCliError> {
    let records = parse_records(&read_input(input)?, &input_format)?;
    let IngestOutcome {
        intervals,
        diagnostics,
        outside_target_year,
        non_positive,
    } = IntervalAdapter::to_raw_intervals(&records, target_year);

    let report = ValidationReport {
        total_records: records.len(),
        accepted_records: intervals.len(),
        incomplete_records: intervals.iter().filter(|i| !i.is_complete()).count(),
        missing_timezone: intervals.iter().filter(|i| i.source_timezone.is_none()).count(),
        outside_target_year,
        non_positive,
        rejected_records: diagnostics.excluded,
        notices: diagnostics.notices.iter().map(|n| n.to_string()).collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:       {}", report.total_records);
        println!("Accepted records:    {}", report.accepted_records);
        println!("Incomplete records:  {}", report.incomplete_records);
        println!("Missing timezone:    {}", report.missing_timezone);
        println!("Outside target year: {}", report.outside_target_year);
        println!("Rejected records:    {}", report.rejected_records);

        if !report.notices.is_empty() {
            println!("\nNotices:");
            for notice in &report.notices {
                println!("  - {}", notice);
            }
        }
    }

    if report.rejected_records > 0 {
        Err(SomnologCliError::ValidationFailed(report.rejected_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(args: &ConfigArgs, json: bool) -> Result<(), SomnologCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "somnolog_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Somnolog version {}", SOMNOLOG_VERSION),
    });

    match args.resolve() {
        Ok(config) => {
            checks.push(match config.validate() {
                Ok(()) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "window {} points, {} outliers, {}-minute slots, policy {}",
                        config.variance_window_days,
                        config.outlier_count,
                        config.histogram_interval_minutes,
                        config.attribution_policy.as_str()
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            });

            checks.push(match resolve_zone(&config.target_timezone) {
                Some(zone) => DoctorCheck {
                    name: "target_timezone".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Target timezone {}", zone.name()),
                },
                None => DoctorCheck {
                    name: "target_timezone".to_string(),
                    status: CheckStatus::Warning,
                    message: format!(
                        "Unknown timezone '{}'; analysis will fall back to UTC",
                        config.target_timezone
                    ),
                },
            });
        }
        Err(e) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot load configuration: {}", CliError::from(e).message),
        }),
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: SOMNOLOG_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Somnolog Doctor Report");
        println!("======================");
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
        Err(SomnologCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum SomnologCliError {
    Io(io::Error),
    Compute(somnolog::ComputeError),
    Json(serde_json::Error),
    NoRecords,
    NoIntervals,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for SomnologCliError {
    fn from(e: io::Error) -> Self {
        SomnologCliError::Io(e)
    }
}

impl From<somnolog::ComputeError> for SomnologCliError {
    fn from(e: somnolog::ComputeError) -> Self {
        SomnologCliError::Compute(e)
    }
}

impl From<serde_json::Error> for SomnologCliError {
    fn from(e: serde_json::Error) -> Self {
        SomnologCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SomnologCliError> for CliError {
    fn from(e: SomnologCliError) -> Self {
        match e {
            SomnologCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SomnologCliError::Compute(somnolog::ComputeError::InvalidConfig(msg)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: msg,
                hint: Some("Run 'somnolog doctor' to inspect the effective configuration".to_string()),
            },
            SomnologCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input is a JSON array or NDJSON of interval records".to_string()),
            },
            SomnologCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SomnologCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            SomnologCliError::NoIntervals => CliError {
                code: "NO_INTERVALS".to_string(),
                message: "No usable intervals after ingestion".to_string(),
                hint: Some("Run 'somnolog validate' to see why records were skipped".to_string()),
            },
            SomnologCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records were rejected", count),
                hint: Some("Fix the reported records and retry".to_string()),
            },
            SomnologCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    accepted_records: usize,
    incomplete_records: usize,
    missing_timezone: usize,
    outside_target_year: usize,
    non_positive: usize,
    rejected_records: usize,
    notices: Vec<String>,
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
