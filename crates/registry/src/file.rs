//! On-disk JSON shape of the registry file (spec.md §6).

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RegistryFile {
    pub pcs: Vec<RegistryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct RegistryEntry {
    pub id: String,
    pub watch_path: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_enabled() -> bool {
    true
}
