use super::*;
use std::time::Duration;
use tempfile::TempDir;

fn config(base: &TempDir) -> Config {
    Config {
        base_path: base.path().to_path_buf(),
        registry_path: std::path::PathBuf::from("registry.json"),
        error_folder: "_error".to_string(),
        file_pattern: "*.json".to_string(),
        remote_url: "http://127.0.0.1:1".to_string(),
        remote_secret: "secret".to_string(),
        remote_table: "gfx_sessions".to_string(),
        record_mode: ts_dispatch::RecordMode::Aggregated,
        remote_timeout: Duration::from_millis(100),
        poll_interval: Duration::from_millis(20),
        batch_size: 10,
        flush_interval: Duration::from_secs(60),
        offline_queue_path: std::path::PathBuf::from("offline.db"),
        offline_max_size: 1000,
        offline_max_retries: 3,
        queue_process_interval: Duration::from_millis(20),
        rate_limit_max_retries: 1,
        rate_limit_base_delay: Duration::from_millis(1),
        registry_check_interval: Duration::from_millis(20),
        health_bind_addr: None,
        log_path: std::path::PathBuf::from("tablesyncd.log"),
    }
}

#[tokio::test]
async fn new_fails_fast_when_the_remote_store_is_unreachable() {
    let dir = TempDir::new().unwrap();
    let result = Agent::new(config(&dir)).await;
    assert!(matches!(result, Err(AgentError::RemoteUnreachable(_))));
}

#[tokio::test]
async fn invalid_file_pattern_is_rejected_at_construction() {
    let dir = TempDir::new().unwrap();
    let mut cfg = config(&dir);
    cfg.file_pattern = "[".to_string();
    let result = Agent::new(cfg).await;
    assert!(matches!(result, Err(AgentError::InvalidPattern(_, _))));
}
