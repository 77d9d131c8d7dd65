//! Concurrency-safe HTTP upsert/select/delete client (spec.md §4.6).

use crate::error::{UpsertError, UpsertResult};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Conflict-key-aware upsert/select/delete client over a persistent
/// connection pool, safe to call concurrently from multiple tasks.
pub struct RemoteClient {
    http: Client,
    base_url: String,
    secret: String,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: base_url.into(),
            secret: secret.into(),
        }
    }

    /// Posts `records` as a JSON array with a merge-on-conflict header.
    /// Empty input is a no-op success without a network call.
    pub async fn upsert(
        &self,
        table: &str,
        records: &[Value],
        on_conflict: &str,
    ) -> Result<UpsertResult, UpsertError> {
        if records.is_empty() {
            return Ok(UpsertResult::success(0));
        }

        let url = format!("{}/{}?on_conflict={}", self.base_url, table, on_conflict);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret)
            .header("Prefer", "resolution=merge-duplicates")
            .json(records)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Ok(UpsertResult::failure("timeout")),
            Err(e) => return Ok(UpsertResult::failure(e.to_string())),
        };

        self.classify(response, records.len()).await
    }

    async fn classify(&self, response: reqwest::Response, count: usize) -> Result<UpsertResult, UpsertError> {
        let status = response.status();
        if status.is_success() {
            return Ok(UpsertResult::success(count));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(UpsertError::RateLimit { retry_after });
        }
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpsertError::ClientError { status: status.as_u16(), body });
        }
        Ok(UpsertResult::failure(format!("server {}", status.as_u16())))
    }

    /// `GET /<table>?select=<cols>&<col>=eq.<value>&limit=<n>`.
    pub async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filters: &[(&str, &str)],
        limit: Option<u32>,
    ) -> Result<Vec<Value>, String> {
        let mut url = format!("{}/{}?select={}", self.base_url, table, columns.join(","));
        for (col, value) in filters {
            url.push_str(&format!("&{}=eq.{}", col, value));
        }
        if let Some(limit) = limit {
            url.push_str(&format!("&limit={}", limit));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("server {}", response.status().as_u16()));
        }
        response.json::<Vec<Value>>().await.map_err(|e| e.to_string())
    }

    /// `DELETE /<table>?<col>=eq.<value>`. Returns the affected row count.
    pub async fn delete(&self, table: &str, filters: &[(&str, &str)]) -> Result<usize, String> {
        let mut url = format!("{}/{}?", self.base_url, table);
        for (col, value) in filters {
            url.push_str(&format!("{}=eq.{}&", col, value));
        }

        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.secret)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("server {}", response.status().as_u16()));
        }
        let rows: Vec<Value> = response.json().await.unwrap_or_default();
        Ok(rows.len())
    }

    /// Liveness probe: `200` and `400` both classify as "reachable".
    pub async fn health_check(&self) -> bool {
        match self.http.get(&self.base_url).send().await {
            Ok(response) => matches!(response.status(), StatusCode::OK | StatusCode::BAD_REQUEST),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_with_empty_records_is_a_no_op_success() {
        let client = RemoteClient::new("http://127.0.0.1:1", "secret", Duration::from_secs(1));
        let result = client.upsert("gfx_sessions", &[], "session_id").await.unwrap();
        assert_eq!(result, UpsertResult::success(0));
    }

    #[tokio::test]
    async fn upsert_against_unreachable_host_is_a_recoverable_failure() {
        let client = RemoteClient::new("http://127.0.0.1:1", "secret", Duration::from_secs(1));
        let result = client
            .upsert("gfx_sessions", &[json!({"session_id": "1"})], "session_id")
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn health_check_against_unreachable_host_is_false() {
        let client = RemoteClient::new("http://127.0.0.1:1", "secret", Duration::from_secs(1));
        assert!(!client.health_check().await);
    }
}
