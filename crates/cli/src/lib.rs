pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "concierge",
    about = "Concierge operator CLI",
    long_about = "Operate the dining concierge: migrations, restaurant listing ingestion, \
                  config inspection, and runtime readiness checks.",
    after_help = "Examples:\n  concierge migrate\n  concierge seed --file listings.json --location \"new york\" --cuisine italian\n  concierge doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Ingest a JSON file of restaurant listings into the store")]
    Seed {
        #[arg(long, help = "Path to a JSON array of business listings")]
        file: PathBuf,
        #[arg(long, help = "City the listings were fetched for")]
        location: String,
        #[arg(long, help = "Cuisine the listings were fetched for")]
        cuisine: String,
        #[arg(long, help = "Also upsert each listing into the search index")]
        mirror: bool,
    },
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Validate config, database connectivity, and fulfillment queue state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed { file, location, cuisine, mirror } => {
            commands::seed::run(&file, &location, &cuisine, mirror)
        }
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
