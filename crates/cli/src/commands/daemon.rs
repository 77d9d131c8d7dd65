//! `tablesync daemon` — daemon lifecycle commands.
//!
//! There is no separate daemon process the CLI talks to over a socket:
//! `daemon run` builds and drives the Agent in-process, sharing
//! `ts_daemon::run_foreground` with the `tablesyncd` binary so both entry
//! points behave identically.

use anyhow::Result;
use clap::{Args, Subcommand};
use std::process::ExitCode;
use ts_daemon::Config;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Run the agent in the foreground until SIGTERM/SIGINT
    Run,
}

pub async fn daemon(args: DaemonArgs) -> Result<ExitCode> {
    match args.command {
        DaemonCommand::Run => run().await,
    }
}

async fn run() -> Result<ExitCode> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    Ok(ts_daemon::run_foreground(Config::load()).await)
}
