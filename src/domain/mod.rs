//! Domain layer - core types and collaborator interfaces.
//!
//! This layer contains pure domain models, the on-disk record types and
//! error types without any external dependencies (DB, IO, etc.).

pub mod cancel;
pub mod config;
pub mod error;
pub mod manifest;
pub mod models;
pub mod ports;

pub use cancel::CancelFlag;
pub use config::{expand_home, parse_formats, AppConfig, ExportFormat, RunConfig};
pub use error::{AppError, Result};
pub use manifest::{DateRange, DeletionLogEntry, ExportManifest, DELETION_LOG_FILE, MANIFEST_FILE};
pub use models::{Contact, ContactRef, Direction, Message};
pub use ports::{ConversationSource, Terminal};
