//! `tablesync queue` — dead-letter inspection and re-enqueue. Dead-letter
//! items are mutated only by an explicit operator-initiated re-enqueue
//! (spec.md §3), so this opens the offline queue's database file directly
//! rather than routing through a live agent.

use anyhow::Result;
use clap::{Args, Subcommand};
use ts_daemon::Config;
use ts_queue::OfflineQueue;

use crate::output::OutputFormat;

#[derive(Args)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub command: QueueCommand,
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// List dead-lettered items
    ListDeadLetters {
        /// Maximum number of items to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: i64,
    },
    /// Re-enqueue a dead-lettered item for delivery
    Retry {
        /// Dead-letter row id
        id: i64,
    },
}

pub async fn queue(args: QueueArgs, format: OutputFormat) -> Result<()> {
    let config = Config::load();
    let queue = OfflineQueue::open(
        &config.absolute_offline_queue_path(),
        config.offline_max_size,
        config.offline_max_retries,
    )?;

    match args.command {
        QueueCommand::ListDeadLetters { limit } => list_dead_letters(&queue, limit, format),
        QueueCommand::Retry { id } => retry(&queue, id, format),
    }
}

fn list_dead_letters(queue: &OfflineQueue, limit: i64, format: OutputFormat) -> Result<()> {
    let items = queue.get_dead_letters(limit)?;

    match format {
        OutputFormat::Text => {
            if items.is_empty() {
                println!("No dead-lettered items.");
                return Ok(());
            }
            println!("{:<6} {:<8} {:<10} {:<30} REASON", "ID", "RETRIES", "PRODUCER", "FILE");
            for item in &items {
                println!(
                    "{:<6} {:<8} {:<10} {:<30} {}",
                    item.id,
                    item.retry_count,
                    item.producer_id,
                    truncate(&item.file_path, 30),
                    item.error_reason,
                );
            }
        }
        OutputFormat::Json => {
            let rows: Vec<_> = items
                .iter()
                .map(|item| {
                    serde_json::json!({
                        "id": item.id,
                        "producer_id": item.producer_id,
                        "file_path": item.file_path,
                        "retry_count": item.retry_count,
                        "error_reason": item.error_reason,
                        "created_at": item.created_at.to_rfc3339(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

fn retry(queue: &OfflineQueue, id: i64, format: OutputFormat) -> Result<()> {
    queue.retry_dead_letter(id)?;
    match format {
        OutputFormat::Text => println!("Re-enqueued dead-letter item {id}"),
        OutputFormat::Json => println!(r#"{{ "retried": {id} }}"#),
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() > max {
        format!("{}...", &s[..max.saturating_sub(3)])
    } else {
        s.to_string()
    }
}
