//! tablesync — operator CLI for the sync agent: start/stop the daemon,
//! inspect its health, and manage the offline queue and producer
//! registry from the command line.

mod commands;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{daemon, queue, registry, status};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "tablesync", version, about = "Operator CLI for the table-sync agent")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daemon lifecycle
    Daemon(daemon::DaemonArgs),
    /// Print the running agent's health snapshot
    Status(status::StatusArgs),
    /// Offline queue / dead-letter inspection
    Queue(queue::QueueArgs),
    /// Producer registry inspection
    Registry(registry::RegistryArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let format = cli.output;

    match cli.command {
        Commands::Daemon(args) => daemon::daemon(args).await,
        Commands::Status(args) => status::status(args, format).await.map(|_| ExitCode::SUCCESS),
        Commands::Queue(args) => queue::queue(args, format).await.map(|_| ExitCode::SUCCESS),
        Commands::Registry(args) => registry::registry(args, format).await.map(|_| ExitCode::SUCCESS),
    }
}
