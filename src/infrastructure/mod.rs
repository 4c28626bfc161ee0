//! Infrastructure layer - external adapters (Signal, filesystem, console).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod desktop_db;
pub mod interrupt;
pub mod manifest_store;
pub mod signal_cli;
pub mod signal_paths;
pub mod structured_log;
pub mod terminal;

pub use config::{build_run_config, load_config};
pub use interrupt::install_interrupt_handler;
pub use manifest_store::{DeletionLog, ManifestStore};
pub use signal_cli::SignalCli;
pub use structured_log::{LogLevel, StructuredLogger};
pub use terminal::StdTerminal;
