// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Polls registered subtrees over a shared filesystem, diffing against a
//! per-root snapshot to emit `created`/`modified` `FileEvent`s. Deliberately
//! avoids kernel inode-watch APIs so it works over SMB/NFS (spec.md §4.2).

mod error;
mod handler;

pub use error::WatcherError;
pub use handler::EventHandler;

use globset::{Glob, GlobMatcher};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use ts_core::{FileEvent, ProducerId};

type Snapshot = HashMap<PathBuf, SystemTime>;

/// One registered producer subtree.
struct Root {
    path: PathBuf,
}

/// The multi-root poller. `snapshots` is owned exclusively by this type and
/// never mutated from outside; a per-root entry is committed only after
/// every handler invocation for that root's tick has returned, so a crash
/// mid-tick causes the same file to be re-emitted on the next tick.
pub struct Watcher {
    pattern: GlobMatcher,
    roots: RwLock<HashMap<ProducerId, Root>>,
    snapshots: RwLock<HashMap<ProducerId, Snapshot>>,
}

impl Watcher {
    pub fn new(file_pattern: &str) -> Result<Self, WatcherError> {
        let glob = Glob::new(file_pattern).map_err(|source| WatcherError::InvalidPattern {
            pattern: file_pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: glob.compile_matcher(),
            roots: RwLock::new(HashMap::new()),
            snapshots: RwLock::new(HashMap::new()),
        })
    }

    pub fn register(&self, producer_id: ProducerId, path: PathBuf) {
        self.roots.write().insert(producer_id.clone(), Root { path });
        self.snapshots.write().entry(producer_id).or_default();
    }

    pub fn unregister(&self, producer_id: &ProducerId) {
        self.roots.write().remove(producer_id);
        self.snapshots.write().remove(producer_id);
    }

    pub fn registered_producers(&self) -> Vec<ProducerId> {
        self.roots.read().keys().cloned().collect()
    }

    /// Per-producer count of files in the current snapshot, surfaced
    /// through the health interface (spec.md §6).
    pub fn file_counts(&self) -> HashMap<ProducerId, usize> {
        self.snapshots.read().iter().map(|(id, snap)| (id.clone(), snap.len())).collect()
    }

    /// Returns the current files per root without touching any snapshot;
    /// used once at startup to reconcile pre-existing inventory.
    pub fn scan_existing(&self) -> HashMap<ProducerId, Vec<PathBuf>> {
        let roots = self.roots.read();
        roots
            .iter()
            .map(|(id, root)| (id.clone(), self.list_matching(&root.path).into_iter().map(|(p, _)| p).collect()))
            .collect()
    }

    /// Walks every registered subtree once, diffing against its snapshot and
    /// invoking `handler` serially for each `created`/`modified` entry.
    /// Handler errors are logged here; the caller contract requires the
    /// next entry still be processed.
    pub async fn poll_tick(&self, handler: &dyn EventHandler) {
        let roots: Vec<(ProducerId, PathBuf)> = self
            .roots
            .read()
            .iter()
            .map(|(id, root)| (id.clone(), root.path.clone()))
            .collect();

        for (producer_id, root_path) in roots {
            if !root_path.exists() {
                tracing::warn!(producer = %producer_id, path = %root_path.display(), "watch root missing this tick");
                continue;
            }

            let entries = self.list_matching(&root_path);
            let old_snapshot = self.snapshots.read().get(&producer_id).cloned().unwrap_or_default();
            let mut new_snapshot = Snapshot::new();

            for (path, mtime) in entries {
                match old_snapshot.get(&path) {
                    None => {
                        let event = FileEvent::created(path.clone(), producer_id.clone());
                        if let Err(e) = handler.handle(event).await {
                            tracing::warn!(producer = %producer_id, path = %path.display(), error = %e, "handler failed for created event");
                        }
                        new_snapshot.insert(path, mtime);
                    }
                    Some(prev_mtime) if mtime > *prev_mtime => {
                        let event = FileEvent::modified(path.clone(), producer_id.clone());
                        if let Err(e) = handler.handle(event).await {
                            tracing::warn!(producer = %producer_id, path = %path.display(), error = %e, "handler failed for modified event");
                        }
                        new_snapshot.insert(path, mtime);
                    }
                    Some(prev_mtime) => {
                        new_snapshot.insert(path, *prev_mtime);
                    }
                }
            }

            self.snapshots.write().insert(producer_id, new_snapshot);
        }
    }

    /// Files matching `file_pattern`, excluding any containing `"registry"`
    /// in the name (spec.md §6). Stat failures are skipped, not fatal.
    fn list_matching(&self, root: &Path) -> Vec<(PathBuf, SystemTime)> {
        let Ok(entries) = std::fs::read_dir(root) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.to_ascii_lowercase().contains("registry") {
                continue;
            }
            if !self.pattern.is_match(name) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let Ok(mtime) = metadata.modified() else {
                continue;
            };
            out.push((path, mtime));
        }
        out
    }
}
