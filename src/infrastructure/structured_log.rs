//! Structured audit log.
//!
//! One logger instance lives for the whole run and is passed by reference to
//! every component. Events are kept in memory in emission order, optionally
//! appended to a JSON-lines file, and mirrored to the console via `tracing`.

use std::cell::RefCell;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{AppError, Result};

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// One entry in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Append-only event sink for a single run.
#[derive(Debug, Default)]
pub struct StructuredLogger {
    events: RefCell<Vec<LogEvent>>,
    file: RefCell<Option<File>>,
}

impl StructuredLogger {
    /// Logger that keeps events in memory and mirrors them to the console.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logger that additionally appends every event to `path` as JSON lines.
    ///
    /// # Errors
    /// Returns error if the file or its parent directory cannot be created.
    pub fn with_file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create log directory", e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| AppError::io(format!("Failed to open log file {}", path.display()), e))?;

        Ok(Self {
            events: RefCell::default(),
            file: RefCell::new(Some(file)),
        })
    }

    /// Records an event.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, data: Option<Value>) {
        let event = LogEvent {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            data,
        };

        mirror_to_console(&event);
        self.append_to_file(&event);
        self.events.borrow_mut().push(event);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message, None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, None);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message, None);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message, None);
    }

    /// Number of events recorded at `level`.
    #[must_use]
    pub fn count(&self, level: LogLevel) -> usize {
        self.events.borrow().iter().filter(|e| e.level == level).count()
    }

    /// Snapshot of every event recorded so far.
    #[cfg(test)]
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.borrow().clone()
    }

    fn append_to_file(&self, event: &LogEvent) {
        let mut slot = self.file.borrow_mut();
        let Some(file) = slot.as_mut() else {
            return;
        };

        let written = serde_json::to_string(event)
            .map_err(std::io::Error::other)
            .and_then(|line| writeln!(file, "{line}"));

        if let Err(e) = written {
            tracing::warn!("Log file disabled after write failure: {}", e);
            *slot = None;
        }
    }
}

fn mirror_to_console(event: &LogEvent) {
    let message = event.message.as_str();
    match (event.level, &event.data) {
        (LogLevel::Debug, Some(data)) => tracing::debug!(%data, "{message}"),
        (LogLevel::Debug, None) => tracing::debug!("{message}"),
        (LogLevel::Info, Some(data)) => tracing::info!(%data, "{message}"),
        (LogLevel::Info, None) => tracing::info!("{message}"),
        (LogLevel::Warning, Some(data)) => tracing::warn!(%data, "{message}"),
        (LogLevel::Warning, None) => tracing::warn!("{message}"),
        (LogLevel::Error, Some(data)) => tracing::error!(%data, "{message}"),
        (LogLevel::Error, None) => tracing::error!("{message}"),
    }
}
