//! Foreground entry point shared by the `tablesyncd` binary and the CLI's
//! `tablesync daemon run` subcommand: builds the Agent, spawns its loops,
//! and blocks until a termination signal arrives.

use crate::agent::Agent;
use crate::config::Config;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info};

pub async fn run_foreground(config: Config) -> ExitCode {
    let agent = match Agent::new(config).await {
        Ok(agent) => Arc::new(agent),
        Err(e) => {
            error!(error = %e, "fatal startup condition, exiting");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loops = agent.spawn(shutdown_rx);

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            return ExitCode::FAILURE;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGINT handler");
            return ExitCode::FAILURE;
        }
    };

    info!("tablesyncd ready");
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    agent.shutdown(loops, &shutdown_tx).await;
    info!("tablesyncd stopped");
    ExitCode::SUCCESS
}
