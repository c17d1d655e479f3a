//! Small filesystem helpers: atomic writes and mode-aware mkdir, shared by
//! the manager, the artifact cache, and the install-file Run-Op.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;

/// Write `data` to `path` atomically: write to a sibling temp file, then
/// rename over the destination.
pub fn atomic_write(path: &Utf8Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("{path} has no parent directory"))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("creating temp file next to {path}"))?;
    tmp.write_all(data)
        .with_context(|| format!("writing temp file for {path}"))?;
    tmp.persist(path)
        .with_context(|| format!("renaming temp file into place at {path}"))?;
    Ok(())
}

/// `mkdir -p` with an explicit mode for the leaf directory (and any
/// directories created along the way).
pub fn mkdir_p_mode(path: &Utf8Path, mode: u32) -> Result<()> {
    std::fs::create_dir_all(path).with_context(|| format!("creating directory {path}"))?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("setting mode on {path}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("f.txt")).unwrap();
        atomic_write(&path, b"one").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one");
        atomic_write(&path, b"two").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
    }

    #[test]
    fn mkdir_p_mode_sets_permissions() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("a/b/c")).unwrap();
        mkdir_p_mode(&path, 0o700).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o700);
    }
}
