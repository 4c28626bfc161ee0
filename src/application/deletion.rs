//! Guarded deletion of an exported conversation.

use std::path::Path;

use serde_json::json;

use crate::domain::{AppError, Contact, ConversationSource, DeletionLogEntry, Result};
use crate::infrastructure::{DeletionLog, LogLevel, ManifestStore, StructuredLogger};

/// Deletes a conversation only when its export manifest is on disk, and
/// records every attempt.
pub struct DeletionManager<'a> {
    source: &'a dyn ConversationSource,
    leave_groups: bool,
}

impl<'a> DeletionManager<'a> {
    #[must_use]
    pub fn new(source: &'a dyn ConversationSource, leave_groups: bool) -> Self {
        Self {
            source,
            leave_groups,
        }
    }

    /// Attempts the deletion; returns whether it succeeded.
    ///
    /// The manifest check in `directory` cannot be skipped. Dry runs still
    /// apply it but never call the source and never touch the deletion log
    /// file.
    pub fn delete(
        &self,
        contact: &Contact,
        directory: &Path,
        dry_run: bool,
        log: &StructuredLogger,
    ) -> bool {
        let entry = match self.attempt(contact, directory, dry_run, log) {
            Ok(()) => DeletionLogEntry::succeeded(contact, dry_run),
            Err(e) => {
                log.log(
                    LogLevel::Error,
                    format!("Deletion failed: {e}"),
                    Some(json!({ "contact": contact.identifier() })),
                );
                DeletionLogEntry::failed(contact, dry_run, e.to_string())
            }
        };

        let success = entry.success;
        self.record(directory, &entry, log) && success
    }

    fn attempt(
        &self,
        contact: &Contact,
        directory: &Path,
        dry_run: bool,
        log: &StructuredLogger,
    ) -> Result<()> {
        let guard_violation = |reason: String| AppError::GuardViolation {
            path: ManifestStore::path(directory),
            reason,
        };
        match ManifestStore::read(directory) {
            Ok(Some(manifest)) if manifest.contact.describes(contact) => {}
            Ok(Some(manifest)) => {
                return Err(guard_violation(format!(
                    "export manifest was written for {} ({}), not {}",
                    manifest.contact.name,
                    manifest
                        .contact
                        .number
                        .as_deref()
                        .or(manifest.contact.uuid.as_deref())
                        .unwrap_or("no identifier"),
                    contact.identifier()
                )));
            }
            Ok(None) => return Err(guard_violation("no export manifest".into())),
            Err(e) => {
                log.error(format!("Unreadable export manifest: {e}"));
                return Err(guard_violation("unreadable export manifest".into()));
            }
        }

        if dry_run {
            log.info(format!(
                "[DRY RUN] Would clear conversation with {}",
                contact.identifier()
            ));
            if self.leave_groups {
                log.info(format!(
                    "[DRY RUN] Would leave groups shared with {}",
                    contact.identifier()
                ));
            }
            return Ok(());
        }

        if !self.source.clear_conversation(contact)? {
            return Err(AppError::SourceFailed {
                message: "conversation source refused to clear the conversation".into(),
            });
        }
        log.info(format!("Cleared conversation with {}", contact.identifier()));

        if self.leave_groups {
            if !self.source.leave_groups(contact)? {
                return Err(AppError::SourceFailed {
                    message: "conversation source refused to leave shared groups".into(),
                });
            }
            log.info(format!("Left groups shared with {}", contact.identifier()));
        }

        Ok(())
    }

    fn record(&self, directory: &Path, entry: &DeletionLogEntry, log: &StructuredLogger) -> bool {
        let data = serde_json::to_value(entry).ok();

        if entry.dry_run {
            log.log(LogLevel::Info, "[DRY RUN] Deletion attempt recorded", data);
            return true;
        }

        match DeletionLog::append(directory, entry) {
            Ok(path) => {
                log.log(
                    LogLevel::Info,
                    format!("Deletion attempt recorded in {}", path.display()),
                    data,
                );
                true
            }
            Err(e) => {
                log.log(
                    LogLevel::Error,
                    format!("Failed to record deletion attempt: {e}"),
                    data,
                );
                false
            }
        }
    }
}
