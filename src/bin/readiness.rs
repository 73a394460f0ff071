//! Readiness CLI - Command-line interface for Synheart Readiness
//!
//! Commands:
//! - simulate: Run a full virtual test with a scripted subject
//! - score: Score a recorded event list
//! - validate: Check an event list for consistency
//! - config: Print the default test configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use synheart_readiness::classifier::classify;
use synheart_readiness::encoder::ReportEncoder;
use synheart_readiness::pipeline::{parse_events, single_session_id, ReadinessProcessor};
use synheart_readiness::simulate::{SimulatedSubject, SubjectProfile};
use synheart_readiness::{
    LocalBackend, ReadinessError, ReadinessEvent, ReadinessTest, ScoringConfig, TestConfig,
    READINESS_VERSION,
};

/// Readiness - Go/No-Go and Stroop fitness-for-duty test engine
#[derive(Parser)]
#[command(name = "readiness")]
#[command(author = "Synheart AI Inc")]
#[command(version = READINESS_VERSION)]
#[command(about = "Run and score cognitive readiness tests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full virtual test with a scripted subject
    Simulate {
        /// Subject identifier
        #[arg(long, default_value = "simulated-subject")]
        subject: String,

        /// Test configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Stimulus seed (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,

        /// Probability of clicking a go stimulus
        #[arg(long, default_value = "0.95")]
        hit_rate: f64,

        /// Probability of clicking a no-go stimulus
        #[arg(long, default_value = "0.05")]
        false_alarm_rate: f64,

        /// Probability of naming the ink color in Stroop
        #[arg(long, default_value = "0.9")]
        stroop_accuracy: f64,

        /// Mean reaction time in milliseconds
        #[arg(long, default_value = "450")]
        reaction_ms: f64,

        /// Write the raw event list to this file
        #[arg(long)]
        events_out: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Score a recorded event list (JSON array)
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Subject identifier for baseline tracking
        #[arg(long)]
        subject: Option<String>,

        /// Scoring configuration JSON file
        #[arg(long)]
        scoring: Option<PathBuf>,

        /// Load subject baselines from file
        #[arg(long)]
        load_baselines: Option<PathBuf>,

        /// Save subject baselines to file after scoring
        #[arg(long)]
        save_baselines: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Check an event list for consistency
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default test configuration
    Config,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

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

fn run(cli: Cli) -> Result<(), ReadinessCliError> {
    match cli.command {
        Commands::Simulate {
            subject,
            config,
            seed,
            hit_rate,
            false_alarm_rate,
            stroop_accuracy,
            reaction_ms,
            events_out,
            output_format,
        } => {
            let profile = SubjectProfile {
                hit_rate,
                false_alarm_rate,
                stroop_accuracy,
                mean_reaction_ms: reaction_ms,
                seed: seed.unwrap_or_else(|| SubjectProfile::default().seed),
                ..SubjectProfile::default()
            };
            cmd_simulate(
                &subject,
                config.as_deref(),
                seed,
                profile,
                events_out.as_deref(),
                output_format,
            )
        }

        Commands::Score {
            input,
            subject,
            scoring,
            load_baselines,
            save_baselines,
            output_format,
        } => cmd_score(
            &input,
            subject.as_deref(),
            scoring.as_deref(),
            load_baselines.as_deref(),
            save_baselines.as_deref(),
            output_format,
        ),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&TestConfig::default())?);
            Ok(())
        }
    }
}

fn cmd_simulate(
    subject: &str,
    config_path: Option<&Path>,
    seed: Option<u64>,
    profile: SubjectProfile,
    events_out: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), ReadinessCliError> {
    let mut config = match config_path {
        Some(path) => TestConfig::from_json(&fs::read_to_string(path)?)?,
        None => TestConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = Some(seed);
    }

    let mut test = ReadinessTest::new(config, LocalBackend::new())?;
    let session_id = test.start(subject)?;
    SimulatedSubject::new(profile).run(&mut test)?;

    if let Some(path) = events_out {
        fs::write(path, serde_json::to_string_pretty(test.events())?)?;
    }

    let events = test.events().to_vec();
    let backend = test.into_backend();
    let result = backend
        .result(&session_id)
        .ok_or(ReadinessCliError::NotFinalized)?;

    let report = ReportEncoder::new().encode(Some(subject), &events, result);
    println!("{}", format_output(&report, &output_format)?);
    Ok(())
}

fn cmd_score(
    input: &Path,
    subject: Option<&str>,
    scoring: Option<&Path>,
    load_baselines: Option<&Path>,
    save_baselines: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), ReadinessCliError> {
    let events = parse_events(&read_input(input)?)?;
    if events.is_empty() {
        return Err(ReadinessCliError::NoEvents);
    }
    let session_id = single_session_id(&events)?;

    let scoring_config: ScoringConfig = match scoring {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => ScoringConfig::default(),
    };

    let mut processor = ReadinessProcessor::with_config(scoring_config)?;
    if let Some(path) = load_baselines {
        processor.load_baselines(&fs::read_to_string(path)?)?;
    }

    let result = processor.process(subject, &session_id, &events)?;

    if let Some(path) = save_baselines {
        fs::write(path, processor.save_baselines()?)?;
    }

    let report = ReportEncoder::new().encode(subject, &events, &result);
    println!("{}", format_output(&report, &output_format)?);
    Ok(())
}

#[derive(serde::Serialize)]
struct ValidationReport {
    valid: bool,
    total_events: usize,
    session_id: Option<String>,
    errors: Vec<ValidationIssue>,
}

#[derive(serde::Serialize)]
struct ValidationIssue {
    index: usize,
    message: String,
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), ReadinessCliError> {
    let events = parse_events(&read_input(input)?)?;
    let issues = validate_events(&events);
    let session_id = events.first().map(|e| e.session_id.clone());

    let report = ValidationReport {
        valid: issues.is_empty(),
        total_events: events.len(),
        session_id,
        errors: issues,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events: {}", report.total_events);
        if let Some(id) = &report.session_id {
            println!("Session:      {}", id);
        }
        println!("Errors:       {}", report.errors.len());
        for issue in &report.errors {
            println!("  [{}] {}", issue.index, issue.message);
        }
    }

    if report.valid {
        Ok(())
    } else {
        Err(ReadinessCliError::ValidationFailed(report.errors.len()))
    }
}

fn validate_events(events: &[ReadinessEvent]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let Some(first) = events.first() else {
        return issues;
    };

    for (index, event) in events.iter().enumerate() {
        if event.session_id != first.session_id {
            issues.push(ValidationIssue {
                index,
                message: format!(
                    "session {} differs from {}",
                    event.session_id, first.session_id
                ),
            });
        }

        let expected = classify(event.block_type, event.expected_response, event.observed_response);
        if expected.is_correct != event.is_correct || expected.error_type != event.error_type {
            issues.push(ValidationIssue {
                index,
                message: format!(
                    "classification mismatch: recorded ({}, {:?}), expected ({}, {:?})",
                    event.is_correct, event.error_type, expected.is_correct, expected.error_type
                ),
            });
        }

        if event.observed_response.is_none() && event.reaction_time_ms.is_some() {
            issues.push(ValidationIssue {
                index,
                message: "reaction time recorded without a response".to_string(),
            });
        }
    }

    issues
}

// Helper functions

fn read_input(input: &Path) -> Result<String, ReadinessCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            log::warn!("reading events from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn format_output<T: serde::Serialize>(
    value: &T,
    format: &OutputFormat,
) -> Result<String, ReadinessCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
    }
}

// Error handling

#[derive(Debug)]
enum ReadinessCliError {
    Io(io::Error),
    Readiness(ReadinessError),
    Json(serde_json::Error),
    NoEvents,
    NotFinalized,
    ValidationFailed(usize),
}

impl From<io::Error> for ReadinessCliError {
    fn from(e: io::Error) -> Self {
        ReadinessCliError::Io(e)
    }
}

impl From<ReadinessError> for ReadinessCliError {
    fn from(e: ReadinessError) -> Self {
        ReadinessCliError::Readiness(e)
    }
}

impl From<serde_json::Error> for ReadinessCliError {
    fn from(e: serde_json::Error) -> Self {
        ReadinessCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ReadinessCliError> for CliError {
    fn from(e: ReadinessCliError) -> Self {
        match e {
            ReadinessCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ReadinessCliError::Readiness(e) => CliError {
                code: "READINESS_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            ReadinessCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ReadinessCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Provide a JSON array of readiness events".to_string()),
            },
            ReadinessCliError::NotFinalized => CliError {
                code: "NOT_FINALIZED".to_string(),
                message: "Simulated session was not scored".to_string(),
                hint: Some("Run with RUST_LOG=debug for details".to_string()),
            },
            ReadinessCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} validation errors found", count),
                hint: Some("Fix the reported events and try again".to_string()),
            },
        }
    }
}
