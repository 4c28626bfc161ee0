//! Signal data path discovery.
//!
//! Handles locating the Signal Desktop database and probing backup locations.

use std::path::{Path, PathBuf};

use crate::domain::{expand_home, AppError, Result};

/// Known Signal Desktop database locations, relative to the home directory.
const DESKTOP_DB_PATHS: &[&str] = &[
    // Linux
    ".config/Signal/sql/db.sqlite",
    ".local/share/signal-desktop/sql/db.sqlite",
    // Flatpak
    ".var/app/org.signal.Signal/config/Signal/sql/db.sqlite",
    ".var/app/org.signal.Signal/data/signal-desktop/sql/db.sqlite",
    // macOS
    "Library/Application Support/Signal/sql/db.sqlite",
];

/// Locates the Signal Desktop database.
///
/// An explicitly configured path must exist; otherwise the usual locations
/// are searched in order.
///
/// # Errors
/// Returns `SourceUnavailable` if no database can be found.
pub fn find_desktop_database(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        let path = expand_home(path);
        if path.is_file() {
            return Ok(path);
        }
        return Err(AppError::unavailable(format!(
            "Signal Desktop database not found at {}",
            path.display()
        )));
    }

    let home = dirs::home_dir().ok_or_else(|| AppError::Config {
        message: "Could not determine home directory".into(),
    })?;

    for path in DESKTOP_DB_PATHS {
        let full_path = home.join(path);
        if full_path.is_file() {
            tracing::debug!("Found Signal Desktop database at: {}", full_path.display());
            return Ok(full_path);
        }
    }

    Err(AppError::unavailable(format!(
        "Signal Desktop database not found. Searched: {DESKTOP_DB_PATHS:?}"
    )))
}

/// Returns the first backup location that exists.
#[must_use]
pub fn find_backup(locations: &[PathBuf]) -> Option<PathBuf> {
    locations
        .iter()
        .map(|p| expand_home(p))
        .find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_configured_database_must_exist() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("db.sqlite");

        assert!(matches!(
            find_desktop_database(Some(db.as_path())),
            Err(AppError::SourceUnavailable { .. })
        ));

        std::fs::write(&db, b"").unwrap();
        assert_eq!(find_desktop_database(Some(db.as_path())).unwrap(), db);
    }

    #[test]
    fn test_find_backup() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        let present = dir.path().join("Signal");
        std::fs::create_dir(&present).unwrap();

        assert_eq!(find_backup(&[missing.clone()]), None);
        assert_eq!(find_backup(&[missing, present.clone()]), Some(present));
    }
}
