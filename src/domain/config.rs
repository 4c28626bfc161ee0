//! Configuration types.
//!
//! `AppConfig` mirrors the optional TOML file; `RunConfig` is the single
//! immutable set of options one run executes with, built once from the file
//! and the command line.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{AppError, Result};
use super::models::ContactRef;

/// A durable rendering of the message sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// `messages.json`
    Json,
    /// `messages.md`
    Md,
    /// `messages.html`
    Html,
}

impl ExportFormat {
    /// File written for this format inside the export directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Json => "messages.json",
            Self::Md => "messages.md",
            Self::Html => "messages.html",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "md" | "markdown" => Ok(Self::Md),
            "html" => Ok(Self::Html),
            other => Err(AppError::InvalidFormat {
                name: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Md => write!(f, "md"),
            Self::Html => write!(f, "html"),
        }
    }
}

/// Parses a comma-separated format list into a non-empty, de-duplicated set.
///
/// # Errors
/// Returns `InvalidFormat` for an unknown name and `Validation` for an empty list.
pub fn parse_formats(raw: &str) -> Result<Vec<ExportFormat>> {
    let mut formats = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let format: ExportFormat = name.parse()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }

    if formats.is_empty() {
        return Err(AppError::validation("At least one export format is required"));
    }

    Ok(formats)
}

/// Export defaults from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDefaults {
    /// Base directory; each contact gets a sub-directory.
    #[serde(default = "default_export_root")]
    pub root: PathBuf,

    /// Formats used when `--format` is not given.
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            root: default_export_root(),
            formats: default_formats(),
        }
    }
}

fn default_export_root() -> PathBuf {
    PathBuf::from("~/Documents/signal-exports")
}

fn default_formats() -> Vec<String> {
    vec!["json".to_string()]
}

/// Where to find Signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// signal-cli executable.
    #[serde(default = "default_cli_binary")]
    pub cli_binary: String,

    /// signal-cli data directory.
    #[serde(default = "default_cli_config_dir")]
    pub cli_config_dir: PathBuf,

    /// Signal Desktop database; searched in the usual places when unset.
    #[serde(default)]
    pub desktop_db: Option<PathBuf>,

    /// Directories whose existence counts as "a backup exists".
    #[serde(default = "default_backup_locations")]
    pub backup_locations: Vec<PathBuf>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            cli_binary: default_cli_binary(),
            cli_config_dir: default_cli_config_dir(),
            desktop_db: None,
            backup_locations: default_backup_locations(),
        }
    }
}

fn default_cli_binary() -> String {
    "signal-cli".to_string()
}

fn default_cli_config_dir() -> PathBuf {
    PathBuf::from("~/.local/share/signal-cli")
}

fn default_backup_locations() -> Vec<PathBuf> {
    ["~/Signal", "~/Documents/Signal", "~/.signal"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

/// Complete file configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub export: ExportDefaults,

    #[serde(default)]
    pub signal: SignalConfig,
}

impl AppConfig {
    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sig-prune-contact")
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }
}

/// Expands a leading `~` against the home directory.
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest)),
        Err(_) => path.to_path_buf(),
    }
}

/// Everything one run needs to know, fixed before the workflow starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Contact given on the command line; interactive selection when `None`.
    pub contact: Option<String>,
    pub export_root: PathBuf,
    pub formats: Vec<ExportFormat>,
    pub include_attachments: bool,
    pub delete: bool,
    pub require_backup_check: bool,
    pub dry_run: bool,
    /// Skip every interactive confirmation.
    pub force: bool,
    pub leave_groups: bool,
    pub verbose: bool,
    pub log_file: Option<PathBuf>,
}

impl RunConfig {
    /// Parses the contact argument, if one was given.
    ///
    /// # Errors
    /// Returns a validation error for a malformed identifier.
    pub fn contact_ref(&self) -> Result<Option<ContactRef>> {
        self.contact.as_deref().map(ContactRef::parse).transpose()
    }

    /// Export-only run into `export_root`: JSON output, every confirmation
    /// enabled, nothing deleted.
    #[cfg(test)]
    pub fn new(export_root: impl Into<PathBuf>) -> Self {
        Self {
            contact: None,
            export_root: export_root.into(),
            formats: vec![ExportFormat::Json],
            include_attachments: false,
            delete: false,
            require_backup_check: false,
            dry_run: false,
            force: false,
            leave_groups: false,
            verbose: false,
            log_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        assert_eq!(
            parse_formats("json, MD,html,json").unwrap(),
            vec![ExportFormat::Json, ExportFormat::Md, ExportFormat::Html]
        );
        assert!(matches!(
            parse_formats("json,pdf"),
            Err(AppError::InvalidFormat { name }) if name == "pdf"
        ));
        assert!(matches!(parse_formats(" , "), Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.export.formats, vec!["json"]);
        assert_eq!(config.signal.cli_binary, "signal-cli");
        assert_eq!(config.signal.backup_locations.len(), 3);
    }

    #[test]
    fn test_expand_home() {
        let plain = PathBuf::from("/tmp/exports");
        assert_eq!(expand_home(&plain), plain);

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/x")), home.join("x"));
        }
    }

    #[test]
    fn test_contact_ref_validation() {
        let mut config = RunConfig::new("/tmp");
        assert_eq!(config.contact_ref().unwrap(), None);

        config.contact = Some("not-valid".into());
        assert!(config.contact_ref().is_err());
    }
}
