pub mod commands;

use std::io;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use procura_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing_subscriber::EnvFilter;

use crate::commands::chain::ChainArgs;

#[derive(Debug, Parser)]
#[command(
    name = "procura",
    about = "Procura approval workflow operator CLI",
    long_about = "Inspect configuration, check org chart health, and preview approval chains.",
    after_help = "Examples:\n  procura doctor --json\n  procura config\n  \
                  procura chain --kind purchase_requisition --employee dev@example.test"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, org chart loading, and org chart data quality")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Build the approval chain a new document would receive")]
    Chain(ChainArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Chain(args) => commands::chain::run(&args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command output on stdout stays machine readable.
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.trim().to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
