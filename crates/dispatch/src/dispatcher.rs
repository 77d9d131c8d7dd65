//! Single entry point per `FileEvent`: parse → immediate or batched upsert,
//! with rate-limit backoff and offline-queue fallback (spec.md §4.7).

use crate::config::{DispatchConfig, RecordMode};
use crate::outcome::DispatchOutcome;
use crate::quarantine::quarantine;
use crate::strip::strip_internal_fields;
use crate::unit_of_work;
use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;
use ts_core::{FileEvent, FileEventKind};
use ts_parser::{parse_aggregated_file, parse_normalised_file, ParseError};
use ts_queue::{BatchQueue, OfflineQueue};
use ts_remote::{RemoteClient, UpsertError};

/// Envelope persisted to the offline queue so the drain loop knows how to
/// replay a record regardless of which variant produced it.
pub const ENVELOPE_AGGREGATED: &str = "aggregated";
pub const ENVELOPE_NORMALISED: &str = "normalised";

/// Routes events through parse → delivery, owning the batch buffer and the
/// offline queue fallback. Safe to call `dispatch` concurrently; every
/// inner component synchronises itself.
pub struct Dispatcher {
    config: DispatchConfig,
    remote: RemoteClient,
    batch: BatchQueue,
    offline: OfflineQueue,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig, remote: RemoteClient, batch: BatchQueue, offline: OfflineQueue) -> Self {
        Self { config, remote, batch, offline }
    }

    pub fn offline(&self) -> &OfflineQueue {
        &self.offline
    }

    pub fn batch(&self) -> &BatchQueue {
        &self.batch
    }

    pub(crate) fn remote_client(&self) -> &RemoteClient {
        &self.remote
    }

    pub(crate) fn table(&self) -> &str {
        &self.config.table
    }

    /// Steps 1-3 of spec.md §4.7.
    pub async fn dispatch(&self, event: FileEvent) -> DispatchOutcome {
        let producer = event.producer.as_str().to_string();

        match self.config.mode {
            RecordMode::Aggregated => {
                let record = match parse_aggregated_file(&event.path, &producer) {
                    Ok(r) => r,
                    Err(e) => return self.handle_parse_failure(&event, &producer, e),
                };
                let mut value = match serde_json::to_value(&record) {
                    Ok(v) => v,
                    Err(_) => return DispatchOutcome::NonFatal("parse_error"),
                };
                strip_internal_fields(&mut value);
                self.route(event.kind, value, &producer, &event.path).await
            }
            RecordMode::Normalised => {
                let data = match parse_normalised_file(&event.path, &producer) {
                    Ok(d) => d,
                    Err(e) => return self.handle_parse_failure(&event, &producer, e),
                };
                let mut envelope = match serde_json::to_value(&data) {
                    Ok(v) => v,
                    Err(_) => return DispatchOutcome::NonFatal("parse_error"),
                };
                strip_internal_fields(&mut envelope);
                let result = unit_of_work::commit(&self.remote, &data).await;
                if result.success {
                    DispatchOutcome::Success
                } else {
                    self.enqueue(ENVELOPE_NORMALISED, &envelope, &producer, &event.path)
                }
            }
        }
    }

    fn handle_parse_failure(&self, event: &FileEvent, producer: &str, err: ParseError) -> DispatchOutcome {
        if err.kind() == "file_not_found" {
            return DispatchOutcome::NonFatal("file_not_found");
        }
        if let Err(e) = quarantine(&self.config.error_dir, producer, &event.path) {
            tracing::warn!(producer, path = %event.path.display(), error = %e, "quarantine move failed");
        }
        tracing::warn!(producer, path = %event.path.display(), error = %err, "parse failed, file quarantined");
        DispatchOutcome::NonFatal("parse_error")
    }

    async fn route(&self, kind: FileEventKind, record: Value, producer: &str, path: &std::path::Path) -> DispatchOutcome {
        match kind {
            FileEventKind::Created => self.upsert_single(record, producer, path).await,
            FileEventKind::Modified => match self.batch.add(record) {
                None => DispatchOutcome::Batched,
                Some(batch) => self.upsert_batch(batch, producer, path).await,
            },
        }
    }

    /// `_upsert_single`: up to `rate_limit_max_retries` iterations, backing
    /// off with jitter on `RateLimit` and falling back to the offline queue
    /// on any other failure or on exhausting retries.
    async fn upsert_single(&self, record: Value, producer: &str, path: &std::path::Path) -> DispatchOutcome {
        for attempt in 0..self.config.rate_limit_max_retries {
            match self.remote.upsert(&self.config.table, std::slice::from_ref(&record), "session_id").await {
                Ok(result) if result.success => return DispatchOutcome::Success,
                Ok(_failed) => {
                    return self.enqueue(ENVELOPE_AGGREGATED, &record, producer, path);
                }
                Err(UpsertError::RateLimit { .. }) => {
                    tokio::time::sleep(backoff(attempt, self.config.rate_limit_base_delay)).await;
                }
                Err(UpsertError::ClientError { .. }) => {
                    return self.enqueue(ENVELOPE_AGGREGATED, &record, producer, path);
                }
            }
        }
        self.enqueue(ENVELOPE_AGGREGATED, &record, producer, path)
    }

    /// `_upsert_batch`: one call for the whole batch. Rate-limit retry is
    /// not applied here; on any failure every record is enqueued
    /// individually so the drain loop retries them.
    async fn upsert_batch(&self, batch: Vec<Value>, producer: &str, path: &std::path::Path) -> DispatchOutcome {
        match self.remote.upsert(&self.config.table, &batch, "session_id").await {
            Ok(result) if result.success => DispatchOutcome::Success,
            _ => {
                for record in &batch {
                    self.enqueue(ENVELOPE_AGGREGATED, record, producer, path);
                }
                DispatchOutcome::Queued
            }
        }
    }

    /// `flush_batch_queue()`: drains whatever is buffered and runs the same
    /// batch upsert, regardless of size/age thresholds.
    pub async fn flush_batch_queue(&self) -> DispatchOutcome {
        let batch = self.batch.flush();
        if batch.is_empty() {
            return DispatchOutcome::Success;
        }
        self.upsert_batch(batch, "_flush", std::path::Path::new("")).await
    }

    fn enqueue(&self, mode: &str, record: &Value, producer: &str, path: &std::path::Path) -> DispatchOutcome {
        let envelope = json!({ "mode": mode, "record": record });
        if let Err(e) = self.offline.enqueue(&envelope, producer, &path.to_string_lossy()) {
            tracing::error!(producer, error = %e, "failed to persist record to offline queue");
        }
        DispatchOutcome::Queued
    }
}

/// `backoff = (2^attempt) * base_delay + uniform(0,1)` seconds.
fn backoff(attempt: u32, base_delay: Duration) -> Duration {
    let exp = 2f64.powi(attempt as i32) * base_delay.as_secs_f64();
    let jitter = rand::rng().random_range(0.0..1.0);
    Duration::from_secs_f64(exp + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_before_jitter() {
        let base = Duration::from_millis(100);
        let b0 = backoff(0, base).as_secs_f64();
        let b1 = backoff(1, base).as_secs_f64();
        assert!((0.1..1.1).contains(&b0));
        assert!((0.2..1.2).contains(&b1));
    }
}
