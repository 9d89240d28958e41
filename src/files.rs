//! Filesystem helpers shared by both phases.

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, SubpipeError};

/// `EXDEV` / `ERROR_NOT_SAME_DEVICE`.
#[cfg(not(windows))]
const CROSS_DEVICE: i32 = 18;
#[cfg(windows)]
const CROSS_DEVICE: i32 = 17;

/// Write `contents` to `path` through a temporary file in the same directory,
/// so `path` either does not exist or holds the complete contents.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| SubpipeError::Io(e.error))?;

    debug!("Wrote {}", path.display());
    Ok(())
}

/// Move a file, falling back to copy + delete across filesystems.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(CROSS_DEVICE) => {
            debug!("Cross-device move, copying {} to {}", from.display(), to.display());
            copy_then_remove(from, to)
        }
        Err(e) => Err(e.into()),
    }
}

/// The source is only removed once the copy is complete.
fn copy_then_remove(from: &Path, to: &Path) -> Result<()> {
    std::fs::copy(from, to)?;
    std::fs::remove_file(from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.en.srt");

        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_move_file() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("clip.mp4");
        let to = dir.path().join("subs_clip.mp4");
        std::fs::write(&from, b"data").unwrap();

        move_file(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"data");
    }

    #[test]
    fn test_copy_then_remove() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("clip.mp4");
        let to = dir.path().join("archive").join("clip.mp4");
        std::fs::create_dir(dir.path().join("archive")).unwrap();
        std::fs::write(&from, b"data").unwrap();

        copy_then_remove(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"data");
    }

    #[test]
    fn test_failed_copy_keeps_source() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("clip.mp4");
        std::fs::write(&from, b"data").unwrap();

        let missing_dir = dir.path().join("nope").join("clip.mp4");
        assert!(copy_then_remove(&from, &missing_dir).is_err());
        assert!(from.exists());
    }

    #[test]
    fn test_move_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(move_file(&dir.path().join("nope"), &dir.path().join("x")).is_err());
    }
}
