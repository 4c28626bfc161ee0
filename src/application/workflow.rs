//! The export-then-delete state machine.
//!
//! ```text
//! SelectingContact -> FetchingMessages -> ConfirmingExport -> Exporting
//!     -> Done
//!     -> ConfirmingDeletion -> Deleting -> Done
//! any state -> Failed
//! ```
//!
//! States run strictly one after another. Every run ends in exactly one of
//! `Done` or `Failed`, which map onto the process exit code. An interrupt is
//! honoured at every state boundary; only a deletion already under way is
//! allowed to finish and report its own outcome.

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde_json::json;

use crate::domain::models::sort_messages;
use crate::domain::{
    AppError, CancelFlag, Contact, ConversationSource, ExportManifest, Message, Result, RunConfig,
    Terminal,
};
use crate::infrastructure::{LogLevel, StructuredLogger};

use super::confirmation::{ConfirmationGate, ForcedGate, InteractiveGate};
use super::deletion::DeletionManager;
use super::exporter::ExportManager;
use super::formatter::{format_deletion_summary, format_export_config, format_manifest_summary};
use super::selector::{resolve, ContactSelector};

/// Final result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Export complete; any requested deletion succeeded or was skipped.
    Success,
    /// Nothing was exported (and so nothing deleted).
    ExportFailed,
    /// Export complete but the deletion attempt failed.
    DeletionFailed,
}

impl Outcome {
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::ExportFailed => 1,
            Self::DeletionFailed => 2,
        }
    }
}

/// Why a run ended in `Failed`.
#[derive(Debug)]
pub enum Failure {
    /// The operator declined the export.
    Declined,
    /// Interactive selection produced no contact.
    NoContact,
    Error(AppError),
}

/// One step of the workflow, carrying what later steps need.
#[derive(Debug)]
pub enum WorkflowState {
    SelectingContact,
    FetchingMessages(Contact),
    ConfirmingExport {
        contact: Contact,
        messages: Vec<Message>,
    },
    Exporting {
        contact: Contact,
        messages: Vec<Message>,
    },
    ConfirmingDeletion {
        contact: Contact,
        directory: PathBuf,
        manifest: ExportManifest,
    },
    Deleting {
        contact: Contact,
        directory: PathBuf,
    },
    Done(Outcome),
    Failed(Failure),
}

impl WorkflowState {
    const fn name(&self) -> &'static str {
        match self {
            Self::SelectingContact => "SelectingContact",
            Self::FetchingMessages(_) => "FetchingMessages",
            Self::ConfirmingExport { .. } => "ConfirmingExport",
            Self::Exporting { .. } => "Exporting",
            Self::ConfirmingDeletion { .. } => "ConfirmingDeletion",
            Self::Deleting { .. } => "Deleting",
            Self::Done(_) => "Done",
            Self::Failed(_) => "Failed",
        }
    }

    /// Exit outcome of a terminal state; `None` while the run continues.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Done(outcome) => Some(*outcome),
            Self::Failed(_) => Some(Outcome::ExportFailed),
            _ => None,
        }
    }
}

/// Drives one run from contact selection to a terminal state.
pub struct Workflow<'a> {
    config: RunConfig,
    source: &'a dyn ConversationSource,
    terminal: &'a dyn Terminal,
    log: &'a StructuredLogger,
    cancel: CancelFlag,
}

impl<'a> Workflow<'a> {
    #[must_use]
    pub fn new(
        config: RunConfig,
        source: &'a dyn ConversationSource,
        terminal: &'a dyn Terminal,
        log: &'a StructuredLogger,
    ) -> Self {
        Self {
            config,
            source,
            terminal,
            log,
            cancel: CancelFlag::default(),
        }
    }

    /// Stop at the next state boundary once `cancel` is raised.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs to completion and returns the exit outcome.
    pub fn run(&self) -> Outcome {
        self.execute().outcome().unwrap_or(Outcome::ExportFailed)
    }

    /// Runs to completion and returns the terminal state.
    pub fn execute(&self) -> WorkflowState {
        let interactive = InteractiveGate::new(self.terminal);
        let gate: &dyn ConfirmationGate = if self.config.force {
            &ForcedGate
        } else {
            &interactive
        };

        if self.config.dry_run {
            self.log.warning("DRY RUN MODE: no files will be written and nothing deleted");
        }

        let mut state = WorkflowState::SelectingContact;
        while state.outcome().is_none() {
            self.log.debug(format!("Entering state {}", state.name()));
            let deleting = matches!(state, WorkflowState::Deleting { .. });

            state = self
                .cancel
                .check()
                .and_then(|()| self.step(state, gate))
                .and_then(|next| {
                    if deleting {
                        Ok(next)
                    } else {
                        self.cancel.check().map(|()| next)
                    }
                })
                .map_err(|e| {
                    if self.cancel.is_cancelled() {
                        AppError::Cancelled
                    } else {
                        e
                    }
                })
                .unwrap_or_else(|e| {
                    self.log.error(e.to_string());
                    WorkflowState::Failed(Failure::Error(e))
                });
        }

        self.finish(&state);
        state
    }

    fn step(&self, state: WorkflowState, gate: &dyn ConfirmationGate) -> Result<WorkflowState> {
        match state {
            WorkflowState::SelectingContact => self.select_contact(gate),
            WorkflowState::FetchingMessages(contact) => self.fetch_messages(contact),
            WorkflowState::ConfirmingExport { contact, messages } => {
                self.confirm_export(contact, messages, gate)
            }
            WorkflowState::Exporting { contact, messages } => self.export(&contact, &messages),
            WorkflowState::ConfirmingDeletion {
                contact,
                directory,
                manifest,
            } => self.confirm_deletion(contact, directory, &manifest, gate),
            WorkflowState::Deleting { contact, directory } => Ok(self.delete(&contact, &directory)),
            terminal @ (WorkflowState::Done(_) | WorkflowState::Failed(_)) => Ok(terminal),
        }
    }

    fn header(&self, title: &str) {
        self.terminal.show(&format!("\n{}", title.cyan().bold()));
    }

    fn select_contact(&self, gate: &dyn ConfirmationGate) -> Result<WorkflowState> {
        let reference = self.config.contact_ref()?;

        self.header("Step 1: Select contact");
        let version = self.source.version()?;
        self.log.log(
            LogLevel::Info,
            "Conversation source available",
            Some(json!({ "version": version })),
        );

        let contacts = self.source.list_contacts()?;
        self.log.debug(format!("Loaded {} contacts", contacts.len()));

        let contact = match reference {
            Some(reference) => resolve(&reference, &contacts)?,
            None => match ContactSelector::new(self.terminal, gate).select(&contacts, self.log)? {
                Some(contact) => contact,
                None => return Ok(WorkflowState::Failed(Failure::NoContact)),
            },
        };

        self.log.log(
            LogLevel::Info,
            format!("Contact: {}", contact.name),
            Some(json!({
                "identifier": contact.identifier(),
                "slug": contact.slug(),
            })),
        );
        Ok(WorkflowState::FetchingMessages(contact))
    }

    fn fetch_messages(&self, contact: Contact) -> Result<WorkflowState> {
        self.header("Step 2: Fetch messages");
        let mut messages = self.source.fetch_messages(&contact)?;
        sort_messages(&mut messages);

        if messages.is_empty() {
            self.log.warning(format!("No messages found with {}", contact.name));
        } else {
            self.log.info(format!("Fetched {} messages", messages.len()));
        }

        Ok(WorkflowState::ConfirmingExport { contact, messages })
    }

    fn confirm_export(
        &self,
        contact: Contact,
        messages: Vec<Message>,
        gate: &dyn ConfirmationGate,
    ) -> Result<WorkflowState> {
        self.header("Step 3: Confirm export");
        self.terminal
            .show(&format_export_config(&contact, &self.config, messages.len()));

        if gate.confirm("Export this conversation?", self.log)? {
            Ok(WorkflowState::Exporting { contact, messages })
        } else {
            self.log.info("Export declined by user");
            Ok(WorkflowState::Failed(Failure::Declined))
        }
    }

    fn export(&self, contact: &Contact, messages: &[Message]) -> Result<WorkflowState> {
        self.header("Step 4: Export");
        let outcome = ExportManager::new(&self.config.export_root).export(
            contact,
            messages,
            &self.config.formats,
            self.config.include_attachments,
            self.config.dry_run,
            self.log,
        )?;

        self.terminal.show(&format_manifest_summary(&outcome.manifest));
        for path in &outcome.written {
            self.terminal.show(&format!("  {} {}", "+".green(), path.display()));
        }

        if !self.config.delete {
            return Ok(WorkflowState::Done(Outcome::Success));
        }

        Ok(WorkflowState::ConfirmingDeletion {
            contact: contact.clone(),
            directory: outcome.directory,
            manifest: outcome.manifest,
        })
    }

    fn confirm_deletion(
        &self,
        contact: Contact,
        directory: PathBuf,
        manifest: &ExportManifest,
        gate: &dyn ConfirmationGate,
    ) -> Result<WorkflowState> {
        self.header("Step 5: Confirm deletion");

        if self.config.require_backup_check && !self.backup_present() {
            if self.config.force {
                self.log.warning("No Signal backup found; continuing in forced mode");
            } else {
                self.log.warning("No Signal backup found; deletion skipped");
                self.terminal.show(&format!(
                    "{} No Signal backup found. Create one, or use --force to override.",
                    "!".yellow().bold()
                ));
                return Ok(WorkflowState::Done(Outcome::Success));
            }
        }

        self.terminal
            .show(&format_deletion_summary(manifest, &contact, self.config.dry_run));

        let slug = contact.slug();
        if gate.confirm_with_text("Permanently delete this conversation?", &slug, self.log)? {
            Ok(WorkflowState::Deleting { contact, directory })
        } else {
            self.log.info("Deletion not confirmed; conversation kept");
            Ok(WorkflowState::Done(Outcome::Success))
        }
    }

    fn backup_present(&self) -> bool {
        match self.source.check_backup_exists() {
            Ok(found) => found,
            Err(e) => {
                self.log.warning(format!("Backup check failed: {e}"));
                false
            }
        }
    }

    fn delete(&self, contact: &Contact, directory: &Path) -> WorkflowState {
        self.header("Step 6: Delete");
        let deleted = DeletionManager::new(self.source, self.config.leave_groups).delete(
            contact,
            directory,
            self.config.dry_run,
            self.log,
        );

        if deleted {
            let line = if self.config.dry_run {
                "[DRY RUN] Deletion simulated".yellow()
            } else {
                "Conversation deleted".green()
            };
            self.terminal.show(&format!("{} {line}", "✓".green()));
            WorkflowState::Done(Outcome::Success)
        } else {
            self.terminal
                .show(&format!("{} {}", "✗".red(), "Deletion failed".red().bold()));
            WorkflowState::Done(Outcome::DeletionFailed)
        }
    }

    fn finish(&self, state: &WorkflowState) {
        let outcome = state.outcome().unwrap_or(Outcome::ExportFailed);
        let reason = match state {
            WorkflowState::Failed(Failure::Declined) => Some("declined".to_string()),
            WorkflowState::Failed(Failure::NoContact) => Some("no contact selected".to_string()),
            WorkflowState::Failed(Failure::Error(e)) => Some(e.to_string()),
            _ => None,
        };

        self.log.log(
            if outcome == Outcome::Success {
                LogLevel::Info
            } else {
                LogLevel::Error
            },
            format!("Workflow finished in state {}", state.name()),
            Some(json!({
                "exit_code": outcome.exit_code(),
                "reason": reason,
                "warnings": self.log.count(LogLevel::Warning),
                "errors": self.log.count(LogLevel::Error),
            })),
        );
    }
}
