//! `tablesync status` — fetches and prints the running agent's
//! `HealthSnapshot` over the `/healthz` TCP surface, since that's the
//! agent's only externally visible state (spec.md §6).

use anyhow::{anyhow, Result};
use clap::Args;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use ts_daemon::Config;

use crate::output::OutputFormat;

#[derive(Args)]
pub struct StatusArgs {}

pub async fn status(_args: StatusArgs, format: OutputFormat) -> Result<()> {
    let config = Config::load();
    let Some(bind_addr) = config.health_bind_addr else {
        return match format {
            OutputFormat::Text => {
                println!("Health surface not configured (TS_HEALTH_BIND_ADDR is unset)");
                Ok(())
            }
            OutputFormat::Json => {
                println!(r#"{{ "status": "unconfigured" }}"#);
                Ok(())
            }
        };
    };

    let body = match fetch_healthz(&bind_addr).await {
        Ok(body) => body,
        Err(e) => {
            return match format {
                OutputFormat::Text => {
                    println!("Agent not reachable at {bind_addr}: {e}");
                    Ok(())
                }
                OutputFormat::Json => {
                    println!(r#"{{ "status": "unreachable", "error": {:?} }}"#, e.to_string());
                    Ok(())
                }
            };
        }
    };

    let snapshot: serde_json::Value = serde_json::from_str(&body)
        .map_err(|e| anyhow!("malformed health response from {bind_addr}: {e}"))?;

    match format {
        OutputFormat::Text => print_text(&snapshot),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
    }

    Ok(())
}

fn print_text(snapshot: &serde_json::Value) {
    println!("Status: {}", if snapshot["running"] == true { "running" } else { "stopped" });
    println!("Uptime: {}s", snapshot["uptime_seconds"]);
    println!("Registry producers: {}", snapshot["registry"]["producer_count"]);
    println!(
        "Batch queue: {} pending ({} added, {} flushed)",
        snapshot["batch_queue"]["pending"],
        snapshot["batch_queue"]["total_added"],
        snapshot["batch_queue"]["total_flushed"],
    );
    println!(
        "Offline queue: {} pending, {} dead-lettered ({:.1}% full)",
        snapshot["offline_queue"]["pending"],
        snapshot["offline_queue"]["dead_letter"],
        snapshot["offline_queue"]["utilisation"].as_f64().unwrap_or(0.0) * 100.0,
    );
    if let Some(counts) = snapshot["watcher"]["file_counts"].as_object() {
        println!("Watcher:");
        for (producer, count) in counts {
            println!("  {producer}: {count} files");
        }
    }
}

async fn fetch_healthz(bind_addr: &str) -> Result<String> {
    let mut stream = TcpStream::connect(bind_addr).await?;
    stream.write_all(b"GET /healthz HTTP/1.1\r\nConnection: close\r\n\r\n").await?;
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;
    let text = String::from_utf8_lossy(&raw);
    let body = text.split("\r\n\r\n").nth(1).ok_or_else(|| anyhow!("response had no body"))?;
    Ok(body.to_string())
}
