//! Producer identity: an external process that deposits JSON files into a
//! named subtree beneath the configured base directory.

use std::path::PathBuf;

crate::define_id! {
    /// Opaque producer identity, e.g. `"PC01"`.
    pub struct ProducerId;
}

/// A single entry from the registry file (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Producer {
    pub id: ProducerId,
    /// Absolute path: `base`/`watch_path`.
    pub watch_path: PathBuf,
    pub description: Option<String>,
}

impl Producer {
    pub fn new(id: impl Into<ProducerId>, watch_path: PathBuf, description: Option<String>) -> Self {
        Self {
            id: id.into(),
            watch_path,
            description,
        }
    }
}
