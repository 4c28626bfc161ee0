//! Export of one conversation into its contact directory.
//!
//! Every format is rendered in memory before anything touches the disk, and
//! the manifest is written last. A manifest on disk therefore always
//! describes a complete set of format files.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::domain::models::sort_messages;
use crate::domain::{AppError, Contact, ExportFormat, ExportManifest, Message, Result};
use crate::infrastructure::{LogLevel, ManifestStore, StructuredLogger};

use super::formatter::render;

/// Name of the reserved attachments sub-directory.
pub const ATTACHMENTS_DIR: &str = "attachments";

/// Result of an export.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub manifest: ExportManifest,
    pub directory: PathBuf,
    /// Files written, manifest last. Empty for a dry run.
    pub written: Vec<PathBuf>,
}

/// Writes conversations below an export root, one directory per contact.
pub struct ExportManager {
    root: PathBuf,
}

impl ExportManager {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory that holds `contact`'s export.
    #[must_use]
    pub fn directory_for(&self, contact: &Contact) -> PathBuf {
        self.root.join(contact.slug())
    }

    /// Exports `messages` in every requested format.
    ///
    /// # Errors
    /// Returns a validation error for an empty format list and an I/O error
    /// for any failed write. No manifest exists after a failure.
    pub fn export(
        &self,
        contact: &Contact,
        messages: &[Message],
        formats: &[ExportFormat],
        include_attachments: bool,
        dry_run: bool,
        log: &StructuredLogger,
    ) -> Result<ExportOutcome> {
        if formats.is_empty() {
            return Err(AppError::validation("At least one export format is required"));
        }

        let directory = self.directory_for(contact);
        let mut messages = messages.to_vec();
        sort_messages(&mut messages);

        let manifest = ExportManifest::new(contact, &messages, formats, include_attachments);

        let mut rendered = Vec::with_capacity(formats.len());
        for &format in formats {
            let content = render(format, contact, &messages, manifest.export_date)
                .map_err(AppError::json_parse)?;
            rendered.push((directory.join(format.file_name()), content));
        }

        let attachments = manifest.statistics.attachment_count;

        if dry_run {
            log.info(format!(
                "[DRY RUN] Would create directory {}",
                directory.display()
            ));
            for (path, _) in &rendered {
                log.info(format!("[DRY RUN] Would write {}", path.display()));
            }
            if include_attachments && attachments > 0 {
                log.info(format!(
                    "[DRY RUN] Would reserve {} for {attachments} attachment(s)",
                    directory.join(ATTACHMENTS_DIR).display()
                ));
            }
            log.info(format!(
                "[DRY RUN] Would write manifest {}",
                ManifestStore::path(&directory).display()
            ));

            return Ok(ExportOutcome {
                manifest,
                directory,
                written: Vec::new(),
            });
        }

        fs::create_dir_all(&directory).map_err(|e| {
            AppError::io(
                format!("Failed to create directory {}", directory.display()),
                e,
            )
        })?;

        if ManifestStore::remove(&directory)? {
            log.info("Removed previous export manifest");
        }

        let mut written = Vec::with_capacity(rendered.len() + 1);
        for (path, content) in rendered {
            write_file(&path, &content)?;
            log.log(
                LogLevel::Info,
                format!("Wrote {}", path.display()),
                Some(json!({ "bytes": content.len() })),
            );
            written.push(path);
        }

        if include_attachments && attachments > 0 {
            reserve_attachments(&directory, attachments, log)?;
        }

        written.push(ManifestStore::write(&directory, &manifest)?);
        log.log(
            LogLevel::Info,
            "Export complete",
            Some(json!({
                "directory": directory.display().to_string(),
                "message_count": manifest.statistics.message_count,
                "attachment_count": attachments,
            })),
        );

        Ok(ExportOutcome {
            manifest,
            directory,
            written,
        })
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)
        .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))
}

fn reserve_attachments(directory: &Path, count: usize, log: &StructuredLogger) -> Result<()> {
    let path = directory.join(ATTACHMENTS_DIR);
    fs::create_dir_all(&path)
        .map_err(|e| AppError::io(format!("Failed to create {}", path.display()), e))?;
    log.warning(format!(
        "{count} attachment(s) referenced; copy them manually from Signal storage into {}",
        path.display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{alice, message_on};
    use crate::domain::MANIFEST_FILE;
    use tempfile::tempdir;

    #[test]
    fn test_export_writes_manifest_matching_messages() {
        let root = tempdir().unwrap();
        let manager = ExportManager::new(root.path());
        let log = StructuredLogger::new();
        let messages = vec![message_on(3, "c"), message_on(1, "a"), message_on(2, "b")];

        let outcome = manager
            .export(&alice(), &messages, &[ExportFormat::Json], false, false, &log)
            .unwrap();

        let stored = ManifestStore::read(&outcome.directory).unwrap().unwrap();
        assert_eq!(stored, outcome.manifest);
        assert_eq!(stored.statistics.message_count, 3);
        let range = stored.statistics.date_range.unwrap();
        assert_eq!(range.start, message_on(1, "").timestamp);
        assert_eq!(range.end, message_on(3, "").timestamp);

        let json = fs::read_to_string(outcome.directory.join("messages.json")).unwrap();
        let written: Vec<Message> = serde_json::from_str(&json).unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(written[0].body, "a");

        assert_eq!(
            outcome.written.last().unwrap().file_name().unwrap(),
            MANIFEST_FILE
        );
    }

    #[test]
    fn test_export_all_formats_and_attachments() {
        let root = tempdir().unwrap();
        let manager = ExportManager::new(root.path());
        let log = StructuredLogger::new();
        let mut message = message_on(1, "photo");
        message.attachments = vec!["a.jpg".into(), "b.jpg".into()];

        let outcome = manager
            .export(
                &alice(),
                &[message],
                &[ExportFormat::Json, ExportFormat::Md, ExportFormat::Html],
                true,
                false,
                &log,
            )
            .unwrap();

        for name in ["messages.json", "messages.md", "messages.html"] {
            assert!(outcome.directory.join(name).is_file(), "{name} missing");
        }
        assert!(outcome.directory.join(ATTACHMENTS_DIR).is_dir());
        assert_eq!(outcome.manifest.statistics.attachment_count, 2);
        assert!(outcome.manifest.export_config.include_attachments);
    }

    #[test]
    fn test_empty_conversation_has_no_date_range() {
        let root = tempdir().unwrap();
        let manager = ExportManager::new(root.path());
        let log = StructuredLogger::new();

        let outcome = manager
            .export(&alice(), &[], &[ExportFormat::Json], true, false, &log)
            .unwrap();

        assert_eq!(outcome.manifest.statistics.message_count, 0);
        assert!(outcome.manifest.statistics.date_range.is_none());
        assert!(!outcome.directory.join(ATTACHMENTS_DIR).exists());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let root = tempdir().unwrap();
        let manager = ExportManager::new(root.path());
        let log = StructuredLogger::new();

        let outcome = manager
            .export(
                &alice(),
                &[message_on(1, "a")],
                &[ExportFormat::Json, ExportFormat::Md],
                true,
                true,
                &log,
            )
            .unwrap();

        assert!(outcome.written.is_empty());
        assert!(!outcome.directory.exists());
        assert_eq!(outcome.manifest.statistics.message_count, 1);
        assert!(log
            .events()
            .iter()
            .any(|e| e.message.starts_with("[DRY RUN] Would write manifest")));
    }

    #[test]
    fn test_empty_format_list_is_rejected() {
        let root = tempdir().unwrap();
        let manager = ExportManager::new(root.path());
        let log = StructuredLogger::new();

        let result = manager.export(&alice(), &[], &[], false, false, &log);
        assert!(matches!(result, Err(AppError::Validation { .. })));
        assert!(!manager.directory_for(&alice()).exists());
    }

    #[test]
    fn test_reexport_replaces_manifest() {
        let root = tempdir().unwrap();
        let manager = ExportManager::new(root.path());
        let log = StructuredLogger::new();

        manager
            .export(&alice(), &[message_on(1, "a")], &[ExportFormat::Json], false, false, &log)
            .unwrap();
        let second = manager
            .export(
                &alice(),
                &[message_on(1, "a"), message_on(2, "b")],
                &[ExportFormat::Md],
                false,
                false,
                &log,
            )
            .unwrap();

        let stored = ManifestStore::read(&second.directory).unwrap().unwrap();
        assert_eq!(stored.statistics.message_count, 2);
        assert_eq!(stored.export_config.formats, vec![ExportFormat::Md]);
        assert!(log
            .events()
            .iter()
            .any(|e| e.message == "Removed previous export manifest"));
    }

    #[test]
    fn test_failed_reexport_leaves_no_manifest() {
        let root = tempdir().unwrap();
        let manager = ExportManager::new(root.path());
        let log = StructuredLogger::new();

        let first = manager
            .export(&alice(), &[message_on(1, "a")], &[ExportFormat::Json], false, false, &log)
            .unwrap();

        // A directory where the markdown file should go makes its write fail.
        fs::create_dir(first.directory.join("messages.md")).unwrap();
        let result = manager.export(
            &alice(),
            &[message_on(1, "a")],
            &[ExportFormat::Json, ExportFormat::Md],
            false,
            false,
            &log,
        );

        assert!(matches!(result, Err(AppError::Io { .. })));
        assert!(ManifestStore::read(&first.directory).unwrap().is_none());
    }
}
