//! JSON persistence for export manifests and deletion logs.
//!
//! Both files live in the contact's export directory. Writes go to a
//! synced temporary file in the same directory that is then persisted over
//! the target, so a reader never observes a half-written file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::domain::{
    AppError, DeletionLogEntry, ExportManifest, Result, DELETION_LOG_FILE, MANIFEST_FILE,
};

/// Reads and writes `export_manifest.json`.
pub struct ManifestStore;

impl ManifestStore {
    /// Path of the manifest inside `dir`.
    #[must_use]
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    /// Writes (or overwrites) the manifest for `dir`.
    ///
    /// # Errors
    /// Returns error if serialization or the filesystem write fails.
    pub fn write(dir: &Path, manifest: &ExportManifest) -> Result<PathBuf> {
        let path = Self::path(dir);
        write_json_atomic(&path, manifest)?;
        Ok(path)
    }

    /// Reads the manifest for `dir`. A missing file is `Ok(None)`.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn read(dir: &Path) -> Result<Option<ExportManifest>> {
        let path = Self::path(dir);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(AppError::json_parse)
    }

    /// Deletes the manifest for `dir`; returns whether one existed.
    ///
    /// # Errors
    /// Returns error if an existing manifest cannot be removed.
    pub fn remove(dir: &Path) -> Result<bool> {
        let path = Self::path(dir);
        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path)
            .map_err(|e| AppError::io(format!("Failed to remove {}", path.display()), e))?;
        Ok(true)
    }
}

/// Append-only `deletion_log.json` (a JSON array).
pub struct DeletionLog;

impl DeletionLog {
    /// Path of the deletion log inside `dir`.
    #[must_use]
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(DELETION_LOG_FILE)
    }

    /// Appends one entry, creating `dir` and the log as needed.
    ///
    /// # Errors
    /// Returns error if the existing log is unreadable or the write fails.
    pub fn append(dir: &Path, entry: &DeletionLogEntry) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| {
            AppError::io(format!("Failed to create directory {}", dir.display()), e)
        })?;

        let mut entries = Self::read_all(dir)?;
        entries.push(entry.clone());

        let path = Self::path(dir);
        write_json_atomic(&path, &entries)?;
        Ok(path)
    }

    /// Every entry ever appended, oldest first. A missing log is empty.
    ///
    /// # Errors
    /// Returns error if the log exists but cannot be read or parsed.
    pub fn read_all(dir: &Path) -> Result<Vec<DeletionLogEntry>> {
        let path = Self::path(dir);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?;
        serde_json::from_str(&content).map_err(AppError::json_parse)
    }
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).map_err(AppError::json_parse)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| {
        AppError::io(format!("Failed to create temporary file in {}", dir.display()), e)
    })?;
    tmp.write_all(content.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| AppError::io(format!("Failed to write {}", tmp.path().display()), e))?;
    tmp.persist(path).map_err(|e| {
        AppError::io(format!("Failed to move {} into place", path.display()), e.error)
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Contact, ExportFormat};
    use tempfile::tempdir;

    fn contact() -> Contact {
        Contact {
            name: "Alice".into(),
            number: Some("+15551234567".into()),
            uuid: None,
        }
    }

    #[test]
    fn test_manifest_absent_is_none() {
        let dir = tempdir().unwrap();
        assert!(ManifestStore::read(dir.path()).unwrap().is_none());
        assert!(!ManifestStore::remove(dir.path()).unwrap());
    }

    #[test]
    fn test_manifest_write_read_remove() {
        let dir = tempdir().unwrap();
        let manifest = ExportManifest::new(&contact(), &[], &[ExportFormat::Json], false);

        let path = ManifestStore::write(dir.path(), &manifest).unwrap();
        assert!(path.ends_with(MANIFEST_FILE));
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![MANIFEST_FILE]);

        assert_eq!(ManifestStore::read(dir.path()).unwrap(), Some(manifest));
        assert!(ManifestStore::remove(dir.path()).unwrap());
        assert!(ManifestStore::read(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_manifest_write_into_missing_dir_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone");
        let manifest = ExportManifest::new(&contact(), &[], &[ExportFormat::Json], false);

        assert!(matches!(
            ManifestStore::write(&missing, &manifest),
            Err(AppError::Io { .. })
        ));
        assert!(!missing.exists());
    }

    #[test]
    fn test_corrupt_manifest_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(ManifestStore::path(dir.path()), "{ not json").unwrap();
        assert!(matches!(
            ManifestStore::read(dir.path()),
            Err(AppError::JsonParse { .. })
        ));
    }

    #[test]
    fn test_deletion_log_only_grows() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("fresh");

        assert!(DeletionLog::read_all(&target).unwrap().is_empty());

        let first = DeletionLogEntry::failed(&contact(), false, "no manifest");
        DeletionLog::append(&target, &first).unwrap();
        let after_one = DeletionLog::read_all(&target).unwrap();
        assert_eq!(after_one, vec![first]);

        let second = DeletionLogEntry::succeeded(&contact(), false);
        DeletionLog::append(&target, &second).unwrap();
        let after_two = DeletionLog::read_all(&target).unwrap();

        assert_eq!(after_two.len(), 2);
        assert_eq!(after_two[..1], after_one[..]);
        assert_eq!(after_two[1], second);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(DeletionLog::path(&target)).unwrap())
                .unwrap();
        assert!(raw.is_array());
    }
}
