//! breath CLI - Command-line interface for breath-flux
//!
//! Commands:
//! - analyze: Derive breathing rate and HRV from a recording
//! - decode: Replay captured sensor notifications into a recording
//! - validate: Check recording invariants
//! - config: Print the default analysis configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use breath_flux::{
    AnalysisConfig, BreathingAnalyser, Notification, Recording, SessionRecorder, FLUX_VERSION,
};

/// breath - Breathing rate and HRV from chest-strap accelerometer and RR streams
#[derive(Parser)]
#[command(name = "breath")]
#[command(version = FLUX_VERSION)]
#[command(about = "Derive breathing rate and HRV from chest-strap recordings", long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive breathing rate and HRV from a recording
    Analyze {
        /// Recording JSON path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Analysis configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Only emit the summary
        #[arg(long)]
        summary_only: bool,
    },

    /// Replay captured notifications (NDJSON) into a recording
    Decode {
        /// Notification log path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Recording output path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Check a recording for non-monotonic times and non-finite values
    Validate {
        /// Recording JSON path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default analysis configuration
    Config,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(
            cli.log_level
                .parse::<tracing_subscriber::filter::LevelFilter>()
                .unwrap_or(tracing_subscriber::filter::LevelFilter::WARN),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

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

fn run(cli: Cli) -> Result<(), BreathCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            config,
            format,
            summary_only,
        } => cmd_analyze(&input, &output, config.as_deref(), format, summary_only),

        Commands::Decode { input, output } => cmd_decode(&input, &output),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Config => {
            println!("{}", AnalysisConfig::default().to_json_pretty()?);
            Ok(())
        }
    }
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    format: OutputFormat,
    summary_only: bool,
) -> Result<(), BreathCliError> {
    let config = match config {
        Some(path) => AnalysisConfig::from_json(&fs::read_to_string(path)?)?,
        None => AnalysisConfig::default(),
    };

    let recording = Recording::from_json(&read_input(input)?)?;
    let analyser = BreathingAnalyser::new(config)?;
    tracing::debug!(config = ?analyser.config(), "analysis configured");
    let analysis = analyser.analyze(&recording)?;

    let output_data = if summary_only {
        format_output(&analysis.summary, &format)?
    } else {
        format_output(&analysis, &format)?
    };
    write_output(output, &output_data)
}

fn cmd_decode(input: &Path, output: &Path) -> Result<(), BreathCliError> {
    if is_stdin(input) && atty::is(atty::Stream::Stdin) {
        eprintln!("Reading notifications from stdin (one JSON object per line, Ctrl-D to end)");
    }

    let notifications = Notification::parse_ndjson(&read_input(input)?)?;
    if notifications.is_empty() {
        return Err(BreathCliError::NoNotifications);
    }

    let mut recorder = SessionRecorder::new();
    let decoded: usize = notifications.iter().map(|n| recorder.replay(n)).sum();
    tracing::info!(
        notifications = notifications.len(),
        samples = decoded,
        "notifications replayed"
    );

    let recording = recorder.stop();
    write_output(output, &serde_json::to_string(&recording)?)
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), BreathCliError> {
    let recording = Recording::from_json(&read_input(input)?)?;
    let result = recording.validate();

    let report = ValidationReport {
        session_id: recording.session_id.to_string(),
        accelerometer_samples: recording.accelerometer.len(),
        ibi_samples: recording.ibi.len(),
        valid: result.is_ok(),
        error: result.as_ref().err().map(|e| e.to_string()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Session:               {}", report.session_id);
        println!("Accelerometer samples: {}", report.accelerometer_samples);
        println!("IBI samples:           {}", report.ibi_samples);
        match &report.error {
            None => println!("Status:                valid"),
            Some(err) => println!("Status:                invalid ({})", err),
        }
    }

    result.map_err(BreathCliError::from)
}

fn is_stdin(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_input(input: &Path) -> Result<String, BreathCliError> {
    if is_stdin(input) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), BreathCliError> {
    if is_stdin(output) {
        println!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn format_output<T: serde::Serialize>(
    value: &T,
    format: &OutputFormat,
) -> Result<String, BreathCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
    }
}

// Error types

#[derive(Debug)]
enum BreathCliError {
    Io(io::Error),
    Compute(breath_flux::ComputeError),
    Json(serde_json::Error),
    NoNotifications,
}

impl From<io::Error> for BreathCliError {
    fn from(e: io::Error) -> Self {
        BreathCliError::Io(e)
    }
}

impl From<breath_flux::ComputeError> for BreathCliError {
    fn from(e: breath_flux::ComputeError) -> Self {
        BreathCliError::Compute(e)
    }
}

impl From<serde_json::Error> for BreathCliError {
    fn from(e: serde_json::Error) -> Self {
        BreathCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BreathCliError> for CliError {
    fn from(e: BreathCliError) -> Self {
        match e {
            BreathCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            BreathCliError::Compute(e) => {
                let hint = match &e {
                    breath_flux::ComputeError::InvalidConfig(_)
                    | breath_flux::ComputeError::InvalidFilter(_) => {
                        "Run 'breath config' for a valid starting point"
                    }
                    breath_flux::ComputeError::NonMonotonicTime { .. }
                    | breath_flux::ComputeError::NonFiniteValue { .. } => {
                        "Run 'breath validate' for details"
                    }
                    _ => "Ensure input matches the recording format",
                };
                CliError {
                    code: "COMPUTE_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            BreathCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            BreathCliError::NoNotifications => CliError {
                code: "NO_NOTIFICATIONS".to_string(),
                message: "No notifications found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    session_id: String,
    accelerometer_samples: usize,
    ibi_samples: usize,
    valid: bool,
    error: Option<String>,
}
