#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Reads and hot-reloads the list of producer identities and their watch
//! subpaths (spec.md §4.1).

mod error;
mod file;

pub use error::RegistryError;

use file::RegistryFile;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use ts_core::{Producer, ProducerId};

/// The result of a `reload()` that detected a changed registry file: the
/// set of producers added and the set removed, relative to the table
/// before the reload.
#[derive(Debug, Default, Clone)]
pub struct RegistryDiff {
    pub added: Vec<Producer>,
    pub removed: Vec<ProducerId>,
}

/// Owns the current producer table. Reads and hot-reloads
/// `<registry_path>` relative to `base_dir`.
pub struct Registry {
    base_dir: PathBuf,
    registry_path: PathBuf,
    table: RwLock<HashMap<ProducerId, Producer>>,
    last_mtime: RwLock<Option<SystemTime>>,
}

impl Registry {
    pub fn new(base_dir: impl Into<PathBuf>, registry_path: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            registry_path: registry_path.into(),
            table: RwLock::new(HashMap::new()),
            last_mtime: RwLock::new(None),
        }
    }

    fn absolute_registry_path(&self) -> PathBuf {
        self.base_dir.join(&self.registry_path)
    }

    /// Parse `enabled` entries from the registry file into a table, keyed
    /// by producer id. Duplicate ids: the later entry wins, with a
    /// warning. `watch_path` is resolved relative to `base_dir`.
    fn parse(&self, bytes: &[u8], path: &std::path::Path) -> Result<HashMap<ProducerId, Producer>, RegistryError> {
        let parsed: RegistryFile =
            serde_json::from_slice(bytes).map_err(|source| RegistryError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        let mut table = HashMap::new();
        for entry in parsed.pcs.into_iter().filter(|e| e.enabled) {
            let id = ProducerId::new(entry.id.clone());
            if table.contains_key(&id) {
                tracing::warn!(producer = %entry.id, "duplicate producer id in registry, later entry wins");
            }
            table.insert(
                id.clone(),
                Producer::new(id, self.base_dir.join(&entry.watch_path), entry.description),
            );
        }
        Ok(table)
    }

    /// Load the registry file for the first time. Never fatal: a missing
    /// or malformed file yields an empty table and a logged warning.
    pub fn load(&self) {
        let path = self.absolute_registry_path();
        match fs::read(&path) {
            Ok(bytes) => match self.parse(&bytes, &path) {
                Ok(table) => {
                    *self.table.write() = table;
                    *self.last_mtime.write() = fs::metadata(&path).and_then(|m| m.modified()).ok();
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "malformed registry file, starting with an empty producer table");
                }
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "registry file missing, starting with an empty producer table");
            }
        }
    }

    /// Compare the file's modification time against the last successful
    /// load/reload. Returns `None` if unchanged. If the timestamp
    /// increased, attempts to reparse: on success the table is replaced
    /// atomically and the diff against the previous table is returned; on
    /// failure the prior table is kept (not discarded) and a warning is
    /// logged, but the call still reports "changed" with an empty diff,
    /// since the mtime genuinely advanced.
    pub fn reload(&self) -> Option<RegistryDiff> {
        let path = self.absolute_registry_path();
        let mtime = fs::metadata(&path).and_then(|m| m.modified()).ok();

        let changed = match (mtime, *self.last_mtime.read()) {
            (Some(new), Some(old)) => new > old,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !changed {
            return None;
        }

        let diff = match fs::read(&path).and_then(|bytes| {
            self.parse(&bytes, &path)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
        }) {
            Ok(new_table) => {
                let mut table = self.table.write();
                let diff = diff_tables(&table, &new_table);
                *table = new_table;
                diff
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "malformed registry file on reload, keeping prior producer table");
                RegistryDiff::default()
            }
        };
        *self.last_mtime.write() = mtime;
        Some(diff)
    }

    /// Snapshot of the currently active producers.
    pub fn producers(&self) -> Vec<Producer> {
        self.table.read().values().cloned().collect()
    }

    pub fn get(&self, id: &ProducerId) -> Option<Producer> {
        self.table.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}

fn diff_tables(
    old: &HashMap<ProducerId, Producer>,
    new: &HashMap<ProducerId, Producer>,
) -> RegistryDiff {
    let mut diff = RegistryDiff::default();
    for (id, producer) in new {
        if !old.contains_key(id) {
            diff.added.push(producer.clone());
        }
    }
    for id in old.keys() {
        if !new.contains_key(id) {
            diff.removed.push(id.clone());
        }
    }
    diff
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
