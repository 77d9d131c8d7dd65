//! Moves an unparseable file aside (spec.md §4.7 step 1 / §6).

use std::path::Path;

/// Moves `path` to `<error_dir>/<producer>_<filename>`. Idempotent: if
/// `path` no longer exists (already quarantined by a previous attempt)
/// this is a no-op success.
pub fn quarantine(error_dir: &Path, producer: &str, path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(error_dir)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dest = error_dir.join(format!("{producer}_{file_name}"));
    std::fs::rename(path, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn moves_file_into_error_dir_with_prefixed_name() {
        let dir = TempDir::new().unwrap();
        let error_dir = dir.path().join("_error");
        let src = dir.path().join("a.json");
        std::fs::write(&src, "{}").unwrap();

        quarantine(&error_dir, "PC01", &src).unwrap();

        assert!(!src.exists());
        assert!(error_dir.join("PC01_a.json").exists());
    }

    #[test]
    fn repeated_quarantine_of_an_already_moved_file_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let error_dir = dir.path().join("_error");
        let src = dir.path().join("a.json");
        std::fs::write(&src, "{}").unwrap();

        quarantine(&error_dir, "PC01", &src).unwrap();
        quarantine(&error_dir, "PC01", &src).unwrap();

        assert!(error_dir.join("PC01_a.json").exists());
    }
}
