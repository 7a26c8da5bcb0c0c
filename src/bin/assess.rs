//! Assess CLI - Command-line interface for Assessment Metrics
//!
//! Commands:
//! - compute: Compute metrics reports from event logs
//! - attention: Score a standalone attention-test run
//! - validate: Check event logs for structural problems
//! - schema: Print schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use assessment_metrics::encoder::{MetricsEncoder, REPORT_VERSION};
use assessment_metrics::schema::{
    EventLog, EventLogAdapter, RecordKind, ValidationIssue, SCHEMA_VERSION,
};
use assessment_metrics::types::MetricKey;
use assessment_metrics::{EngineConfig, MetricsProcessor, ENGINE_VERSION, PRODUCER_NAME};

/// Assess - deterministic behavioral and cognitive-test metrics
#[derive(Parser)]
#[command(name = "assess")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Compute behavioral metrics from assessment event logs", long_about = None)]
struct Cli {
    /// Log filter when RUST_LOG is not set (e.g. "debug", "assessment_metrics=trace")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a metrics report for each event log
    Compute {
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
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Fixed producer instance ID (defaults to a random UUID)
        #[arg(long)]
        instance_id: Option<String>,
    },

    /// Score an attention-test run ({"stimuli": [...], "responses": [...]})
    Attention {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Validate event logs
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// A single event log document
    Json,
    /// Newline-delimited JSON (one event log per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// One report per line
    Ndjson,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Event log input schema
    Input,
    /// Metrics report output schema
    Output,
    /// Engine configuration with defaults
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

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

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .init();
}

fn run(cli: Cli) -> Result<(), AssessCliError> {
    match cli.command {
        Commands::Compute {
            input,
            output,
            input_format,
            output_format,
            config,
            instance_id,
        } => cmd_compute(
            &input,
            &output,
            input_format,
            output_format,
            config.as_deref(),
            instance_id,
        ),

        Commands::Attention { input } => cmd_attention(&input),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn read_input(input: &Path) -> Result<String, AssessCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            warn!("reading event logs from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_logs(data: &str, format: &InputFormat) -> Result<Vec<EventLog>, AssessCliError> {
    let logs = match format {
        InputFormat::Json => vec![EventLogAdapter::parse(data)?],
        InputFormat::Ndjson => EventLogAdapter::parse_ndjson(data)?,
    };
    if logs.is_empty() {
        return Err(AssessCliError::NoLogs);
    }
    Ok(logs)
}

fn cmd_compute(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
    instance_id: Option<String>,
) -> Result<(), AssessCliError> {
    let config = match config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    let encoder = match instance_id {
        Some(id) => MetricsEncoder::with_instance_id(id),
        None => MetricsEncoder::new(),
    };

    let data = read_input(input)?;
    let logs = parse_logs(&data, &input_format)?;

    let processor = MetricsProcessor::with_config(config)?.with_encoder(encoder);
    debug!(config = ?processor.config(), "engine configuration");

    let mut output_data = String::new();
    for log in &logs {
        let report = processor.process_log(log);
        let line = match output_format {
            OutputFormat::Ndjson => processor.encoder().to_json(&report)?,
            OutputFormat::JsonPretty => processor.encoder().to_json_pretty(&report)?,
        };
        output_data.push_str(&line);
        output_data.push('\n');
    }

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_attention(input: &Path) -> Result<(), AssessCliError> {
    let data = read_input(input)?;
    let processor = MetricsProcessor::new();
    println!("{}", processor.process_attention(&data)?);
    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), AssessCliError> {
    let data = read_input(input)?;
    let logs = parse_logs(&data, &input_format)?;

    let reports: Vec<LogValidation> = logs
        .iter()
        .enumerate()
        .map(|(index, log)| LogValidation::new(index, log, EventLogAdapter::validate(log)))
        .collect();
    let invalid_logs = reports.iter().filter(|r| !r.issues.is_empty()).count();

    let report = ValidationReport {
        total_logs: logs.len(),
        valid_logs: logs.len() - invalid_logs,
        invalid_logs,
        logs: reports,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total logs:   {}", report.total_logs);
        println!("Valid logs:   {}", report.valid_logs);
        println!("Invalid logs: {}", report.invalid_logs);

        for log in report.logs.iter().filter(|l| !l.issues.is_empty()) {
            println!(
                "\nLog {} ({}):",
                log.index,
                log.submission_id.as_deref().unwrap_or("no submission id")
            );
            for issue in &log.issues {
                println!("  - {:?} #{}: {}", issue.kind, issue.index, issue.error);
            }
        }
    }

    if report.invalid_logs > 0 {
        Err(AssessCliError::ValidationFailed(report.invalid_logs))
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), AssessCliError> {
    match schema_type {
        SchemaType::Input => {
            println!("Input Schema: {}", SCHEMA_VERSION);
            println!();
            println!("An event log is one JSON object per submission (all arrays optional):");
            println!();
            println!("- submissionId: string");
            println!("- movements: [{{ x, y, timestamp, targetId?, questionId? }}]");
            println!("- interactions: [{{ targetId, targetType, questionId?, clickX, clickY, targetX, targetY, timestamp }}]");
            println!("- keyboardEvents: [{{ type: key-down | key-up, key, isModifier, timestamp, questionId? }}]");
            println!("- attentionTest: {{");
            println!("    stimuli: [{{ value, isTarget, presentedAt }}],");
            println!("    responses: [{{ stimulusValue, isTarget, responseTime, stimulusIndex }}]");
            println!("  }}");
            println!();
            println!("Timestamps are milliseconds. Records without questionId count toward global metrics only.");
        }
        SchemaType::Output => {
            println!("Output Schema: metrics report {}", REPORT_VERSION);
            println!();
            println!("- reportVersion, producer: {{ name, version, instanceId }}");
            println!("- submissionId, computedAtUtc, eventSummary");
            println!("- global / questions.<id>: one entry per metric");
            println!("  {{ value: number | null, calculated: bool, sampleSize: int }}");
            println!("- attention: detection/omission/commission counts and rates,");
            println!("  averageReactionTime, reactionTimeSd");
            println!();
            println!("Metrics:");
            for key in MetricKey::ALL {
                match key.unit() {
                    Some(unit) => println!("  - {} ({})", key, unit),
                    None => println!("  - {}", key),
                }
            }
            println!();
            println!("Producer: {} {}", PRODUCER_NAME, ENGINE_VERSION);
        }
        SchemaType::Config => {
            println!("{}", serde_json::to_string_pretty(&EngineConfig::default())?);
        }
    }

    Ok(())
}

// Error handling

#[derive(Debug)]
enum AssessCliError {
    Io(io::Error),
    Compute(assessment_metrics::ComputeError),
    Json(serde_json::Error),
    NoLogs,
    ValidationFailed(usize),
}

impl From<io::Error> for AssessCliError {
    fn from(e: io::Error) -> Self {
        AssessCliError::Io(e)
    }
}

impl From<assessment_metrics::ComputeError> for AssessCliError {
    fn from(e: assessment_metrics::ComputeError) -> Self {
        AssessCliError::Compute(e)
    }
}

impl From<serde_json::Error> for AssessCliError {
    fn from(e: serde_json::Error) -> Self {
        AssessCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<AssessCliError> for CliError {
    fn from(e: AssessCliError) -> Self {
        match e {
            AssessCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            AssessCliError::Compute(assessment_metrics::ComputeError::InvalidConfig(msg)) => {
                CliError {
                    code: "CONFIG_ERROR".to_string(),
                    message: msg,
                    hint: Some("Run `assess schema config` for the defaults".to_string()),
                }
            }
            AssessCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {} schema", SCHEMA_VERSION)),
            },
            AssessCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            AssessCliError::NoLogs => CliError {
                code: "NO_LOGS".to_string(),
                message: "No event logs found in input".to_string(),
                hint: Some("Use --input-format ndjson for one log per line".to_string()),
            },
            AssessCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} event log(s) failed validation", count),
                hint: None,
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_logs: usize,
    valid_logs: usize,
    invalid_logs: usize,
    logs: Vec<LogValidation>,
}

#[derive(serde::Serialize)]
struct LogValidation {
    index: usize,
    submission_id: Option<String>,
    issues: Vec<IssueDetail>,
}

impl LogValidation {
    fn new(index: usize, log: &EventLog, issues: Vec<ValidationIssue>) -> Self {
        Self {
            index,
            submission_id: log.submission_id.clone(),
            issues: issues
                .into_iter()
                .map(|i| IssueDetail {
                    kind: i.kind,
                    index: i.index,
                    error: i.error.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(serde::Serialize)]
struct IssueDetail {
    kind: RecordKind,
    index: usize,
    error: String,
}
