//! Replays one offline-queue envelope against the remote store, used by the
//! Agent's drain loop (spec.md §4.9 item 3).

use crate::dispatcher::{Dispatcher, ENVELOPE_AGGREGATED, ENVELOPE_NORMALISED};
use serde_json::Value;

impl Dispatcher {
    /// Attempts one redelivery of a previously-queued envelope. Returns
    /// `true` on success (caller should `mark_completed`), `false`
    /// otherwise (caller should `mark_failed`).
    pub async fn replay(&self, envelope: &Value) -> bool {
        let Some(mode) = envelope.get("mode").and_then(Value::as_str) else {
            return false;
        };
        let Some(record) = envelope.get("record") else {
            return false;
        };

        match mode {
            ENVELOPE_AGGREGATED => self.upsert_raw(record).await.unwrap_or_default(),
            ENVELOPE_NORMALISED => match serde_json::from_value(record.clone()) {
                Ok(data) => crate::unit_of_work::commit(self.remote_client(), &data).await.success,
                Err(_) => false,
            },
            _ => false,
        }
    }

    async fn upsert_raw(&self, record: &Value) -> Result<bool, ts_remote::UpsertError> {
        let result = self.remote_client().upsert(self.table(), std::slice::from_ref(record), "session_id").await?;
        Ok(result.success)
    }

    /// One batch upsert for a whole set of dequeued aggregated-mode
    /// records, used by the offline-drain pass. Returns `false` on any
    /// transport error or a reported failure, `true` only if the whole
    /// batch succeeded.
    pub(crate) async fn upsert_aggregated_batch(&self, records: &[Value]) -> bool {
        self.remote_client()
            .upsert(self.table(), records, "session_id")
            .await
            .map(|r| r.success)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchConfig;
    use serde_json::json;
    use std::time::Duration;
    use ts_queue::{BatchQueue, OfflineQueue};
    use ts_remote::RemoteClient;

    fn dispatcher() -> Dispatcher {
        let remote = RemoteClient::new("http://127.0.0.1:1", "secret", Duration::from_millis(50));
        let batch = BatchQueue::new(10, Duration::from_secs(60));
        let offline = OfflineQueue::open_in_memory(100, 3).unwrap();
        Dispatcher::new(DispatchConfig::default(), remote, batch, offline)
    }

    #[tokio::test]
    async fn replay_with_unknown_mode_fails_without_a_network_call() {
        let d = dispatcher();
        let envelope = json!({ "mode": "bogus", "record": {} });
        assert!(!d.replay(&envelope).await);
    }

    #[tokio::test]
    async fn replay_aggregated_against_unreachable_host_fails() {
        let d = dispatcher();
        let envelope = json!({ "mode": "aggregated", "record": { "session_id": "1" } });
        assert!(!d.replay(&envelope).await);
    }
}
