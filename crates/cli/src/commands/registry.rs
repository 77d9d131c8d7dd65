//! `tablesync registry reload` — forces a fresh parse of the registry file
//! and prints the resulting producer table. The CLI process holds no
//! state between invocations, so there is no prior table to diff against;
//! `Registry::reload`'s diff is meaningful only to the long-running agent
//! process, which applies it to the Watcher. Here "reload" means "read the
//! file now and show what the agent would see."

use anyhow::Result;
use clap::{Args, Subcommand};
use ts_daemon::Config;
use ts_registry::Registry;

use crate::output::OutputFormat;

#[derive(Args)]
pub struct RegistryArgs {
    #[command(subcommand)]
    pub command: RegistryCommand,
}

#[derive(Subcommand)]
pub enum RegistryCommand {
    /// Reparse the registry file and list the active producers
    Reload,
}

pub async fn registry(args: RegistryArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        RegistryCommand::Reload => reload(format),
    }
}

fn reload(format: OutputFormat) -> Result<()> {
    let config = Config::load();
    let registry = Registry::new(&config.base_path, &config.registry_path);
    registry.load();
    let mut producers = registry.producers();
    producers.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));

    match format {
        OutputFormat::Text => {
            if producers.is_empty() {
                println!("No enabled producers in the registry.");
                return Ok(());
            }
            println!("{:<10} {:<40} DESCRIPTION", "ID", "WATCH PATH");
            for producer in &producers {
                println!(
                    "{:<10} {:<40} {}",
                    producer.id,
                    producer.watch_path.display(),
                    producer.description.as_deref().unwrap_or("-"),
                );
            }
        }
        OutputFormat::Json => {
            let rows: Vec<_> = producers
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "id": p.id.as_str(),
                        "watch_path": p.watch_path,
                        "description": p.description,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}
