//! Runtime configuration, loaded from environment variables with
//! documented defaults (spec.md §6). No config-file parser is introduced
//! beyond the registry file itself, which has its own JSON schema.

use std::path::PathBuf;
use std::time::Duration;
use ts_dispatch::RecordMode;

/// Everything the Agent needs to construct its components. `load()` reads
/// environment variables, falling back to the documented default for each.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root under which producer subtrees live (`TS_BASE_PATH`).
    pub base_path: PathBuf,
    /// Location of the producer list, relative to `base_path` (`TS_REGISTRY_PATH`).
    pub registry_path: PathBuf,
    /// Name of the quarantine subfolder (`TS_ERROR_FOLDER`).
    pub error_folder: String,
    /// Glob filter for ingestion (`TS_FILE_PATTERN`).
    pub file_pattern: String,
    /// Remote store endpoint (`TS_REMOTE_URL`).
    pub remote_url: String,
    /// Remote store credential (`TS_REMOTE_SECRET`).
    pub remote_secret: String,
    /// Target table for aggregated upserts (`TS_REMOTE_TABLE`).
    pub remote_table: String,
    /// Whether the Parser should produce aggregated or normalised records
    /// (`TS_RECORD_MODE`, one of `aggregated` | `normalised`).
    pub record_mode: RecordMode,
    /// Per-call HTTP timeout (`TS_REMOTE_TIMEOUT_MS`).
    pub remote_timeout: Duration,
    /// Watcher tick period (`TS_POLL_INTERVAL_SECS`).
    pub poll_interval: Duration,
    /// BatchQueue bounds (`TS_BATCH_SIZE`, `TS_FLUSH_INTERVAL_SECS`).
    pub batch_size: usize,
    pub flush_interval: Duration,
    /// OfflineQueue bounds (`TS_OFFLINE_QUEUE_PATH`, `TS_OFFLINE_MAX_SIZE`,
    /// `TS_OFFLINE_MAX_RETRIES`).
    pub offline_queue_path: PathBuf,
    pub offline_max_size: i64,
    pub offline_max_retries: i64,
    /// Drain loop period (`TS_QUEUE_PROCESS_INTERVAL_SECS`).
    pub queue_process_interval: Duration,
    /// Backoff schedule for RateLimit (`TS_RATE_LIMIT_MAX_RETRIES`,
    /// `TS_RATE_LIMIT_BASE_DELAY_MS`).
    pub rate_limit_max_retries: u32,
    pub rate_limit_base_delay: Duration,
    /// Registry reload period (`TS_REGISTRY_CHECK_INTERVAL_SECS`).
    pub registry_check_interval: Duration,
    /// Bind address for the `/healthz` surface (`TS_HEALTH_BIND_ADDR`);
    /// `None` disables it.
    pub health_bind_addr: Option<String>,
    /// Daemon log file (`TS_LOG_PATH`), relative to `base_path`.
    pub log_path: PathBuf,
}

impl Config {
    /// Loads configuration from the environment, defaulting every key that
    /// is unset. Never fails: a missing `TS_REMOTE_URL`/`TS_REMOTE_SECRET`
    /// simply yields an empty string, which fails fast at the Agent's
    /// initial remote health check instead (spec.md §7 fatal conditions).
    pub fn load() -> Self {
        Self {
            base_path: env_path("TS_BASE_PATH", "."),
            registry_path: env_path("TS_REGISTRY_PATH", "registry.json"),
            error_folder: env_string("TS_ERROR_FOLDER", "_error"),
            file_pattern: env_string("TS_FILE_PATTERN", "*.json"),
            remote_url: env_string("TS_REMOTE_URL", ""),
            remote_secret: env_string("TS_REMOTE_SECRET", ""),
            remote_table: env_string("TS_REMOTE_TABLE", "gfx_sessions"),
            record_mode: match env_string("TS_RECORD_MODE", "aggregated").as_str() {
                "normalised" | "normalized" => RecordMode::Normalised,
                _ => RecordMode::Aggregated,
            },
            remote_timeout: env_duration_ms("TS_REMOTE_TIMEOUT_MS", 10_000),
            poll_interval: env_duration_secs("TS_POLL_INTERVAL_SECS", 5),
            batch_size: env_usize("TS_BATCH_SIZE", 25),
            flush_interval: env_duration_secs("TS_FLUSH_INTERVAL_SECS", 60),
            offline_queue_path: env_path("TS_OFFLINE_QUEUE_PATH", "offline_queue.db"),
            offline_max_size: env_i64("TS_OFFLINE_MAX_SIZE", 10_000),
            offline_max_retries: env_i64("TS_OFFLINE_MAX_RETRIES", 5),
            queue_process_interval: env_duration_secs("TS_QUEUE_PROCESS_INTERVAL_SECS", 30),
            rate_limit_max_retries: env_usize("TS_RATE_LIMIT_MAX_RETRIES", 3) as u32,
            rate_limit_base_delay: env_duration_ms("TS_RATE_LIMIT_BASE_DELAY_MS", 500),
            registry_check_interval: env_duration_secs("TS_REGISTRY_CHECK_INTERVAL_SECS", 60),
            health_bind_addr: std::env::var("TS_HEALTH_BIND_ADDR").ok().filter(|s| !s.is_empty()),
            log_path: env_path("TS_LOG_PATH", "tablesyncd.log"),
        }
    }

    pub fn absolute_log_path(&self) -> PathBuf {
        if self.log_path.is_absolute() {
            self.log_path.clone()
        } else {
            self.base_path.join(&self.log_path)
        }
    }

    pub fn absolute_offline_queue_path(&self) -> PathBuf {
        if self.offline_queue_path.is_absolute() {
            self.offline_queue_path.clone()
        } else {
            self.base_path.join(&self.offline_queue_path)
        }
    }

    pub fn absolute_error_dir(&self) -> PathBuf {
        self.base_path.join(&self.error_folder)
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_path(key: &str, default: &str) -> PathBuf {
    PathBuf::from(env_string(key, default))
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_duration_secs(key: &str, default_secs: u64) -> Duration {
    Duration::from_secs(std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default_secs))
}

fn env_duration_ms(key: &str, default_ms: u64) -> Duration {
    Duration::from_millis(std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane_when_no_env_vars_are_set() {
        // SAFETY: single-threaded test, no other test in this module touches env.
        for key in [
            "TS_BASE_PATH",
            "TS_REGISTRY_PATH",
            "TS_BATCH_SIZE",
            "TS_RECORD_MODE",
        ] {
            std::env::remove_var(key);
        }
        let config = Config::load();
        assert_eq!(config.base_path, PathBuf::from("."));
        assert_eq!(config.registry_path, PathBuf::from("registry.json"));
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.record_mode, RecordMode::Aggregated);
    }
}
