use std::path::{Path, PathBuf};

use crate::errors::BumpbenchError;

/// Ensure a directory exists, creating it and any parents if needed.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Write `contents` to `path` atomically: write to a sibling temp file in
/// the same directory, then rename over the destination. Rename is atomic
/// on the same filesystem, which is what makes record moves between the
/// partition directories safe under concurrent readers.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), BumpbenchError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(dir)?;
    let tmp = tmp_path(path);
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Remove a file if it exists; a missing file is not an error (idempotent
/// removal, used by `removeCandidateFile` / `removeLog`).
pub fn remove_if_exists(path: &Path) -> Result<(), BumpbenchError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{file_name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_parent_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/candidates/abc.json");
        write_atomic(&path, b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn remove_if_exists_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        remove_if_exists(&path).unwrap();
        remove_if_exists(&path).unwrap();
    }
}
