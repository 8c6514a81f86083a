//! # truce CLI entry point
//!
//! Parses command-line arguments, installs logging, and dispatches to
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use truce_cli::config::{load_or_default, run_config, ConfigArgs};
use truce_cli::policy::{run_policy, PolicyArgs};
use truce_cli::simulate::{run_simulate, SimulateArgs};

/// Truce dispute engine toolchain.
///
/// Runs scripted dispute scenarios, evaluates resolution policy
/// arithmetic, and checks engine configuration files.
#[derive(Parser, Debug)]
#[command(name = "truce", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to an engine configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scenario file against an in-memory engine.
    Simulate(SimulateArgs),

    /// Evaluate resolution policy arithmetic.
    Policy(PolicyArgs),

    /// Validate configuration or print the defaults.
    Config(ConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!("truce CLI starting");

    let config_path = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Simulate(args) => run_simulate(args, config_path),
        Commands::Policy(args) => load_or_default(config_path).and_then(|config| run_policy(args, &config)),
        Commands::Config(args) => run_config(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
