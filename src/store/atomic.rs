//! Crash-safe record file writes
//!
//! Record files are replaced with write-new-then-rename semantics:
//! content goes to a `.tmp` sibling, is fsynced, then renamed over the
//! final path. A crash leaves either the old file or the new one, never
//! a half-written mix.

use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Atomically replace `path` with whatever `write_fn` produces
pub fn replace_file<P, F>(path: P, write_fn: F) -> io::Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let path = path.as_ref();
    let temp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(&temp_path)?;
    write_fn(&mut file)?;
    file.sync_all()?;

    fs::rename(&temp_path, path)
}

/// Remove `.tmp` leftovers from writes interrupted by a crash.
/// Returns how many were removed.
pub fn cleanup_stale_temps<P: AsRef<Path>>(dir: P) -> io::Result<usize> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(0);
    }

    let mut cleaned = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == "tmp") {
            fs::remove_file(&path)?;
            cleaned += 1;
        }
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_replace_writes_and_removes_temp() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("records.jsonl");

        replace_file(&path, |file| {
            writeln!(file, "line 1")?;
            writeln!(file, "line 2")
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "line 1\nline 2\n");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_replace_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("deep").join("r.jsonl");

        replace_file(&path, |file| writeln!(file, "x")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_replace_keeps_old_content_on_write_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("records.jsonl");
        fs::write(&path, "old").unwrap();

        let result = replace_file(&path, |_| {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        });
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
    }

    #[test]
    fn test_cleanup_only_removes_temps() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.tmp"), "t").unwrap();
        fs::write(temp_dir.path().join("b.tmp"), "t").unwrap();
        fs::write(temp_dir.path().join("keep.jsonl"), "k").unwrap();

        assert_eq!(cleanup_stale_temps(temp_dir.path()).unwrap(), 2);
        assert!(temp_dir.path().join("keep.jsonl").exists());
    }

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert_eq!(cleanup_stale_temps(&missing).unwrap(), 0);
    }
}
