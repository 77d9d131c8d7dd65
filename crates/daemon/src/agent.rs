//! Supervises the four concurrent loops and orchestrates shutdown
//! (spec.md §4.9).

use crate::config::Config;
use crate::health::{HealthSink, HealthSnapshot};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use ts_core::FileEvent;
use ts_dispatch::{drain_offline_queue, DispatchConfig, Dispatcher};
use ts_queue::{BatchQueue, OfflineQueue};
use ts_registry::Registry;
use ts_remote::RemoteClient;
use ts_watcher::Watcher;

/// Fatal startup conditions (spec.md §7): the Agent exits non-zero rather
/// than attempting to run degraded.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid file pattern {0}: {1}")]
    InvalidPattern(String, #[source] ts_watcher::WatcherError),
    #[error("cannot open offline queue at {path}: {source}")]
    OfflineQueueOpen {
        path: std::path::PathBuf,
        #[source]
        source: ts_queue::QueueError,
    },
    #[error("cannot reach or authenticate the remote store at {0} on initial connect")]
    RemoteUnreachable(String),
    #[error("cannot bind health surface at {0}: {1}")]
    HealthBindFailed(String, #[source] std::io::Error),
}

/// Composes Registry, Watcher, Dispatcher (RemoteClient + BatchQueue +
/// OfflineQueue) into the running service.
pub struct Agent {
    config: Config,
    registry: Arc<Registry>,
    watcher: Arc<Watcher>,
    dispatcher: Arc<Dispatcher>,
    health: HealthSink,
    start: Instant,
}

/// Handles to the four supervised loops, returned by `Agent::spawn` so the
/// caller can await them during shutdown.
pub struct RunningLoops {
    pub initial_scan: JoinHandle<()>,
    pub watcher: JoinHandle<()>,
    pub offline_drain: JoinHandle<()>,
    pub registry_refresh: JoinHandle<()>,
    pub health_server: Option<JoinHandle<()>>,
}

impl Agent {
    /// Builds every component. Performs the initial remote connectivity
    /// check eagerly so an unreachable/unauthenticated store is fatal at
    /// startup rather than silently queuing every record offline.
    pub async fn new(config: Config) -> Result<Self, AgentError> {
        let registry = Registry::new(&config.base_path, &config.registry_path);
        registry.load();
        let registry = Arc::new(registry);

        let watcher = Watcher::new(&config.file_pattern)
            .map_err(|e| AgentError::InvalidPattern(config.file_pattern.clone(), e))?;
        for producer in registry.producers() {
            watcher.register(producer.id, producer.watch_path);
        }
        let watcher = Arc::new(watcher);

        let remote = RemoteClient::new(&config.remote_url, &config.remote_secret, config.remote_timeout);
        if !remote.health_check().await {
            return Err(AgentError::RemoteUnreachable(config.remote_url.clone()));
        }

        let batch = BatchQueue::new(config.batch_size, config.flush_interval);
        let offline_path = config.absolute_offline_queue_path();
        let offline = OfflineQueue::open(&offline_path, config.offline_max_size, config.offline_max_retries)
            .map_err(|source| AgentError::OfflineQueueOpen { path: offline_path.clone(), source })?;

        let dispatch_config = DispatchConfig {
            mode: config.record_mode,
            table: config.remote_table.clone(),
            error_dir: config.absolute_error_dir(),
            rate_limit_max_retries: config.rate_limit_max_retries,
            rate_limit_base_delay: config.rate_limit_base_delay,
        };
        let dispatcher = Arc::new(Dispatcher::new(dispatch_config, remote, batch, offline));

        let (health, _) = HealthSink::new(HealthSnapshot::default());

        Ok(Self {
            config,
            registry,
            watcher,
            dispatcher,
            health,
            start: Instant::now(),
        })
    }

    pub fn health_receiver(&self) -> tokio::sync::watch::Receiver<HealthSnapshot> {
        self.health.subscribe()
    }

    /// Spawns the four loops plus (optionally) the health server, all
    /// observing `shutdown_rx`. Returns immediately; the caller awaits the
    /// returned handles as part of `shutdown`.
    pub fn spawn(self: &Arc<Self>, shutdown_rx: watch::Receiver<bool>) -> RunningLoops {
        let initial_scan = tokio::spawn(Self::run_initial_scan(Arc::clone(self)));
        let watcher = tokio::spawn(Self::run_watcher_loop(Arc::clone(self), shutdown_rx.clone()));
        let offline_drain = tokio::spawn(Self::run_offline_drain_loop(Arc::clone(self), shutdown_rx.clone()));
        let registry_refresh = tokio::spawn(Self::run_registry_refresh_loop(Arc::clone(self), shutdown_rx.clone()));
        let health_server = self.config.health_bind_addr.clone().map(|addr| {
            let rx = self.health_receiver();
            let shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                if let Err(e) = crate::health::serve(&addr, rx, shutdown_rx).await {
                    tracing::error!(error = %e, "health surface exited");
                }
            })
        });

        RunningLoops { initial_scan, watcher, offline_drain, registry_refresh, health_server }
    }

    /// Loop 1 (spec.md §4.9 item 1): one pass over `scan_existing()`,
    /// dispatched as `created` events. Runs once and returns.
    async fn run_initial_scan(agent: Arc<Self>) {
        let existing = agent.watcher.scan_existing();
        let mut count = 0usize;
        for (producer_id, paths) in existing {
            for path in paths {
                agent.dispatcher.dispatch(FileEvent::created(path, producer_id.clone())).await;
                count += 1;
            }
        }
        tracing::info!(files = count, "initial scan dispatched pre-existing inventory");
    }

    /// Loop 2 (spec.md §4.2, §4.9 item 2): poll tick every `poll_interval`,
    /// handed off to the Dispatcher (which implements `EventHandler`).
    async fn run_watcher_loop(agent: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(agent.config.poll_interval) => {
                    agent.watcher.poll_tick(agent.dispatcher.as_ref()).await;
                    agent.publish_health();
                }
            }
        }
        tracing::info!("watcher loop stopped");
    }

    /// Loop 3 (spec.md §4.9 item 3): every `queue_process_interval`,
    /// dequeue up to 50 items and attempt redelivery.
    async fn run_offline_drain_loop(agent: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(agent.config.queue_process_interval) => {
                    match drain_offline_queue(&agent.dispatcher, 50).await {
                        Ok(n) if n > 0 => tracing::info!(items = n, "offline drain pass completed"),
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "offline drain pass failed"),
                    }
                    agent.publish_health();
                }
            }
        }
    }

    /// Loop 4 (spec.md §4.1, §4.9 item 4): every `registry_check_interval`,
    /// reload and apply the added/removed diff to the Watcher.
    async fn run_registry_refresh_loop(agent: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(agent.config.registry_check_interval) => {
                    if let Some(diff) = agent.registry.reload() {
                        for producer in diff.added {
                            tracing::info!(producer = %producer.id, "producer added, registering watch path");
                            agent.watcher.register(producer.id, producer.watch_path);
                        }
                        for id in diff.removed {
                            tracing::info!(producer = %id, "producer removed, unregistering watch path");
                            agent.watcher.unregister(&id);
                        }
                    }
                    agent.publish_health();
                }
            }
        }
    }

    fn publish_health(&self) {
        let batch = self.dispatcher.batch().stats();
        let offline = match self.dispatcher.offline().stats() {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read offline queue stats");
                return;
            }
        };
        self.health.publish(HealthSnapshot {
            running: true,
            uptime: self.start.elapsed(),
            registry_producer_count: self.registry.len(),
            watcher_file_counts: self
                .watcher
                .file_counts()
                .into_iter()
                .map(|(id, n)| (id.as_str().to_string(), n))
                .collect(),
            batch_pending: batch.pending_count,
            batch_total_added: batch.total_added,
            batch_total_flushed: batch.total_flushed,
            offline_pending: offline.pending_total,
            offline_dead_letter: offline.dead_letter_total,
            offline_utilisation: offline.utilisation,
        });
    }

    /// Shutdown sequence (spec.md §4.9): stop the watcher loop first, flush
    /// the batch queue once, then let the offline queue and remote client
    /// drop. Idempotent in the sense that awaiting already-finished handles
    /// is harmless.
    pub async fn shutdown(&self, loops: RunningLoops, shutdown_tx: &watch::Sender<bool>) {
        let _ = shutdown_tx.send(true);

        if let Err(e) = loops.watcher.await {
            tracing::warn!(error = %e, "watcher loop task panicked");
        }

        let outcome = self.dispatcher.flush_batch_queue().await;
        tracing::info!(?outcome, "final batch queue flush on shutdown");

        for handle in [loops.initial_scan, loops.offline_drain, loops.registry_refresh] {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "supervised loop task panicked");
            }
        }
        if let Some(handle) = loops.health_server {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "health server task panicked");
            }
        }

        tracing::info!("agent shutdown complete");
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
