//! Configuration file loading.
//!
//! Reads the optional TOML configuration and merges it with command-line
//! flags into the immutable `RunConfig`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::domain::{expand_home, parse_formats, AppConfig, AppError, Result, RunConfig};

/// Load configuration from `path`, or from the default location.
///
/// A missing file yields the defaults; an explicitly requested file must exist.
///
/// # Errors
/// Returns error if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => load_config_from_file(&expand_home(path)),
        None => {
            let default_path = AppConfig::default_config_path();
            if default_path.exists() {
                load_config_from_file(&default_path)
            } else {
                Ok(AppConfig::default())
            }
        }
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Merge command-line flags over file configuration.
///
/// # Errors
/// Returns error if the effective format list is invalid.
pub fn build_run_config(cli: &Cli, file: &AppConfig) -> Result<RunConfig> {
    let formats = match &cli.format {
        Some(raw) => parse_formats(raw)?,
        None => parse_formats(&file.export.formats.join(","))?,
    };

    let export_root: PathBuf = cli
        .export_dir
        .clone()
        .unwrap_or_else(|| file.export.root.clone());

    Ok(RunConfig {
        contact: cli.contact.clone(),
        export_root: expand_home(&export_root),
        formats,
        include_attachments: cli.attachments,
        delete: cli.delete,
        require_backup_check: cli.require_backup_check,
        dry_run: cli.dry_run,
        force: cli.force,
        leave_groups: cli.leave_groups,
        verbose: cli.verbose,
        log_file: cli.log_file.as_deref().map(expand_home),
    })
}
