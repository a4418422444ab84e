pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "clientpulse",
    about = "ClientPulse operator CLI",
    long_about = "Evaluate client metrics, manage the profile store, and inspect runtime readiness.",
    after_help = "Examples:\n  clientpulse evaluate --input metrics.json\n  clientpulse evaluate --activity --input activity.json\n  clientpulse recompute\n  clientpulse doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Classify and price one metrics object or an array of them (stdin by default)")]
    Evaluate {
        #[arg(long, value_name = "FILE", help = "Read metrics JSON from FILE instead of stdin")]
        input: Option<PathBuf>,
        #[arg(
            long,
            help = "Treat the input as deal, ticket, and review records and assemble metrics first"
        )]
        activity: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Re-evaluate every stored client profile in batches and upsert the results")]
    Recompute,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, DB connectivity, and schema migration status")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Evaluate { input, activity } => {
            commands::evaluate::run(input.as_deref(), activity)
        }
        Command::Migrate => commands::migrate::run(),
        Command::Recompute => commands::recompute::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
