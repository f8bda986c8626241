//! Binary entry point for carebridge.
//!
//! Provides a CLI for checking integration status, generating care plans, and
//! (with the `grpc` feature) serving the planner over gRPC.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use carebridge::config::CareConfig;
use carebridge::{Integrations, IntakeRequest, VitalSigns, observability};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Carebridge - resilient integrations for clinical intake.
#[derive(Parser)]
#[command(name = "carebridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "CAREBRIDGE_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Start every integration and print its status as JSON.
    Status,

    /// Generate a care plan and print it as JSON.
    Plan {
        /// Reported symptom (repeatable).
        #[arg(short, long = "symptom")]
        symptoms: Vec<String>,

        /// Body temperature in degrees Celsius.
        #[arg(long, default_value = "37.0")]
        temperature: f64,

        /// Heart rate in beats per minute.
        #[arg(long, default_value = "72")]
        heart_rate: u32,

        /// Systolic blood pressure in mmHg.
        #[arg(long, default_value = "120")]
        systolic: u32,

        /// Diastolic blood pressure in mmHg.
        #[arg(long, default_value = "80")]
        diastolic: u32,

        /// Record the intake for this patient (audit document and event).
        #[arg(long)]
        patient_id: Option<i64>,
    },

    /// Serve the care-plan generator over gRPC until Ctrl-C.
    #[cfg(feature = "grpc")]
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "0.0.0.0:50051")]
        bind: std::net::SocketAddr,
    },

    /// Show the effective configuration.
    Config {
        /// Print the configuration (secrets redacted).
        #[arg(long)]
        show: bool,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let logging = config.logging.clone().with_verbose(cli.verbose);
    if let Err(e) = observability::init(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, config: CareConfig) -> anyhow::Result<()> {
    match command {
        Commands::Status => cmd_status(&config).await,
        Commands::Plan {
            symptoms,
            temperature,
            heart_rate,
            systolic,
            diastolic,
            patient_id,
        } => {
            let vitals = VitalSigns::new(temperature, heart_rate, systolic, diastolic)?;
            let request = IntakeRequest::new(symptoms, vitals)?;
            cmd_plan(&config, &request, patient_id).await
        },
        #[cfg(feature = "grpc")]
        Commands::Serve { bind } => cmd_serve(&config, bind).await,
        Commands::Config { show } => {
            cmd_config(&config, show);
            Ok(())
        },
    }
}

/// Loads configuration from a file when given, otherwise from defaults, then
/// applies environment overrides.
fn load_config(path: Option<&Path>) -> anyhow::Result<CareConfig> {
    let config = match path {
        Some(path) => CareConfig::load_from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => CareConfig::default(),
    };
    Ok(config.with_env_overrides())
}

async fn cmd_status(config: &CareConfig) -> anyhow::Result<()> {
    let integrations = Integrations::from_config(config);
    integrations.startup_all().await;
    let report = integrations.report();
    integrations.shutdown_all().await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_plan(
    config: &CareConfig,
    request: &IntakeRequest,
    patient_id: Option<i64>,
) -> anyhow::Result<()> {
    let integrations = Integrations::from_config(config);
    integrations.startup_all().await;

    let plan = match patient_id {
        Some(id) => integrations.intake_service().run_intake(id, request).await,
        None => integrations.rpc.generate(request).await,
    };
    integrations.shutdown_all().await;

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

#[cfg(feature = "grpc")]
async fn cmd_serve(config: &CareConfig, bind: std::net::SocketAddr) -> anyhow::Result<()> {
    use carebridge::GenerativeCarePlanner;
    use std::sync::Arc;

    let planner = Arc::new(GenerativeCarePlanner::new(&config.genai));
    carebridge::server::serve(bind, planner, carebridge::server::ctrl_c()).await?;
    Ok(())
}

fn cmd_config(config: &CareConfig, show: bool) {
    if show {
        println!("{config:#?}");
    } else {
        println!("Use --show to display the effective configuration.");
    }
}
