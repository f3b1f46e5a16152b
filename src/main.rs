//! guidance - quality and eligibility gate for career-guidance answers
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use guidance_gate::cli::config_cmd::ConfigOptions;
use guidance_gate::cli::evaluate::{load_request, EvaluateOptions};
use guidance_gate::cli::gates_cmd::GatesOptions;
use guidance_gate::cli::{ConfigCommand, EvaluateCommand, GatesCommand};
use guidance_gate::config::{guidance_home, Config};
use guidance_gate::core::LearnerProfile;
use guidance_gate::error::{exit_codes, GuidanceError};
use guidance_gate::storage::FileGateRepository;

// =============================================================================
// CLI Definition
// =============================================================================

/// Quality and eligibility gate for career-guidance answers
#[derive(Parser)]
#[command(name = "guidance")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a guidance request through the quality pipeline
    Evaluate {
        /// JSON file holding the request
        #[arg(long, short)]
        request: PathBuf,
        /// JSON gate file (overrides repository.gates_path)
        #[arg(long, short)]
        gates: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show the gates a learner profile triggers
    Gates {
        /// School grade
        #[arg(long)]
        grade: u8,
        /// Subject the learner takes (repeatable)
        #[arg(long = "subject")]
        subjects: Vec<String>,
        /// Career interest (repeatable)
        #[arg(long = "interest")]
        interests: Vec<String>,
        /// Target institution
        #[arg(long)]
        institution: Option<String>,
        /// JSON gate file (overrides repository.gates_path)
        #[arg(long)]
        gates: Option<PathBuf>,
        /// List blocking gates first
        #[arg(long)]
        by_severity: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        /// Output as JSON instead of TOML
        #[arg(long, short)]
        json: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("guidance error: {}", e);
            exit_code(exit_codes::CRASH)
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("GUIDANCE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("guidance panic: {}", info);

        if let Some(home) = guidance_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(code as u8)
}

fn run(command: Commands) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load();

    match command {
        Commands::Evaluate {
            request,
            gates,
            json,
            quiet,
        } => run_evaluate(&request, gates, json, quiet, &config),
        Commands::Gates {
            grade,
            subjects,
            interests,
            institution,
            gates,
            by_severity,
            json,
        } => {
            let mut profile = LearnerProfile::new(grade);
            profile.subjects.extend(subjects);
            profile.career_interests.extend(interests);
            profile.target_institution = institution;
            run_gates(&profile, gates, by_severity, json, &config)
        }
        Commands::Config { json } => run_config(json, config),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn gate_repository(
    explicit: Option<PathBuf>,
    config: &Config,
) -> Result<FileGateRepository, GuidanceError> {
    explicit
        .or_else(|| config.repository.gates_path.clone())
        .map(FileGateRepository::new)
        .ok_or_else(|| {
            GuidanceError::config(
                "no gate file: pass --gates or set repository.gates_path / GUIDANCE_GATES_PATH",
            )
        })
}

fn run_evaluate(
    request_path: &Path,
    gates: Option<PathBuf>,
    json: bool,
    quiet: bool,
    config: &Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let repository = gate_repository(gates, config)?;
    let request = load_request(request_path)?;

    let command = EvaluateCommand::new(repository, config);
    let options = EvaluateOptions { json, quiet };
    let output = command.run(&request, &options);

    let formatted = command.format_output(&output, &options);
    if !formatted.is_empty() {
        print!("{}", formatted);
    }

    Ok(exit_code(output.exit_code()))
}

fn run_gates(
    profile: &LearnerProfile,
    gates: Option<PathBuf>,
    by_severity: bool,
    json: bool,
    config: &Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let repository = gate_repository(gates, config)?;

    let command = GatesCommand::new(repository, config.gates.clone());
    let options = GatesOptions {
        json,
        quiet: false,
        by_severity,
    };
    let output = command.run(profile, &options);
    print!("{}", command.format_output(&output, &options));

    if output.success {
        Ok(exit_code(exit_codes::APPROVE))
    } else {
        Ok(exit_code(exit_codes::CRASH))
    }
}

fn run_config(json: bool, config: Config) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let rendered = ConfigCommand::new(config).run(&ConfigOptions { json })?;
    print!("{}", rendered);
    Ok(exit_code(exit_codes::APPROVE))
}
