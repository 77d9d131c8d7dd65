//! Read-only health surface consumed from outside the core (spec.md §6):
//! running flag, per-producer watcher stats, batch-queue stats,
//! offline-queue stats, registry counts. Published through a
//! `tokio::sync::watch` channel and, when `health_bind_addr` is set,
//! served as `GET /healthz` JSON over a plain `TcpListener` (no web
//! framework — the contract only asks for one route, so a dependency-free
//! socket handler covers it).

use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Point-in-time snapshot of everything an operator needs to see.
#[derive(Debug, Clone, Default)]
pub struct HealthSnapshot {
    pub running: bool,
    pub uptime: Duration,
    pub registry_producer_count: usize,
    pub watcher_file_counts: HashMap<String, usize>,
    pub batch_pending: usize,
    pub batch_total_added: u64,
    pub batch_total_flushed: u64,
    pub offline_pending: i64,
    pub offline_dead_letter: i64,
    pub offline_utilisation: f64,
}

impl HealthSnapshot {
    pub fn to_json(&self) -> Value {
        json!({
            "running": self.running,
            "uptime_seconds": self.uptime.as_secs(),
            "registry": { "producer_count": self.registry_producer_count },
            "watcher": { "file_counts": self.watcher_file_counts },
            "batch_queue": {
                "pending": self.batch_pending,
                "total_added": self.batch_total_added,
                "total_flushed": self.batch_total_flushed,
            },
            "offline_queue": {
                "pending": self.offline_pending,
                "dead_letter": self.offline_dead_letter,
                "utilisation": self.offline_utilisation,
            },
        })
    }
}

/// Publisher half: the Agent pushes a fresh snapshot whenever state it
/// covers changes. Cloning `HealthSink` is cheap and shares the channel.
#[derive(Clone)]
pub struct HealthSink {
    tx: watch::Sender<HealthSnapshot>,
}

impl HealthSink {
    pub fn new(initial: HealthSnapshot) -> (Self, watch::Receiver<HealthSnapshot>) {
        let (tx, rx) = watch::channel(initial);
        (Self { tx }, rx)
    }

    pub fn publish(&self, snapshot: HealthSnapshot) {
        let _ = self.tx.send(snapshot);
    }

    pub fn subscribe(&self) -> watch::Receiver<HealthSnapshot> {
        self.tx.subscribe()
    }
}

/// Serves `GET /healthz` from `rx`'s current value until `shutdown` fires.
/// Bind failure is surfaced to the caller, which the Agent treats as fatal
/// when a bind address was explicitly configured (spec.md §7).
pub async fn serve(
    bind_addr: &str,
    rx: watch::Receiver<HealthSnapshot>,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!(bind_addr, "health surface listening");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => {
                let (mut stream, _) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(error = %e, "health surface accept failed");
                        continue;
                    }
                };
                let body = rx.borrow().to_json().to_string();
                tokio::spawn(async move {
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    // Drain and discard the request line/headers; we serve one fixed resource.
                    let mut buf = [0u8; 512];
                    let _ = stream.read(&mut buf).await;
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_json_carries_all_counters() {
        let snapshot = HealthSnapshot {
            running: true,
            uptime: Duration::from_secs(5),
            registry_producer_count: 2,
            watcher_file_counts: HashMap::from([("PC01".to_string(), 3)]),
            batch_pending: 1,
            batch_total_added: 4,
            batch_total_flushed: 3,
            offline_pending: 0,
            offline_dead_letter: 0,
            offline_utilisation: 0.0,
        };
        let value = snapshot.to_json();
        assert_eq!(value["running"], true);
        assert_eq!(value["registry"]["producer_count"], 2);
        assert_eq!(value["watcher"]["file_counts"]["PC01"], 3);
    }

    #[tokio::test]
    async fn serve_answers_healthz_with_the_published_snapshot() {
        let (sink, rx) = HealthSink::new(HealthSnapshot { running: true, ..Default::default() });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let addr_string = addr.to_string();

        let server = tokio::spawn(async move { serve(&addr_string, rx, shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        sink.publish(HealthSnapshot { running: true, registry_producer_count: 7, ..Default::default() });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET /healthz HTTP/1.1\r\n\r\n").await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        let text = String::from_utf8_lossy(&buf);
        assert!(text.contains("\"producer_count\":7"));

        let _ = shutdown_tx.send(true);
        let _ = server.await;
    }
}
