//! CLI interface using clap.
//!
//! Provides the command-line flags for a single export-then-delete run.

use std::path::PathBuf;

use clap::Parser;

/// sig-prune-contact - Export a Signal conversation, then optionally delete it.
///
/// Deletion only happens after an export manifest has been written for the
/// contact.
#[derive(Parser, Debug)]
#[command(name = "sig-prune-contact")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Target contact (phone number or UUID). Interactive selection if omitted.
    #[arg(short, long)]
    pub contact: Option<String>,

    /// Base export directory (a sub-directory is created per contact).
    #[arg(short, long)]
    pub export_dir: Option<PathBuf>,

    /// Export formats, comma-separated: json, md, html.
    #[arg(short, long)]
    pub format: Option<String>,

    /// Record attachments and reserve an attachments directory.
    #[arg(long)]
    pub attachments: bool,

    /// Delete the conversation after a successful export.
    #[arg(long)]
    pub delete: bool,

    /// Require an existing Signal backup before deleting.
    #[arg(long)]
    pub require_backup_check: bool,

    /// Preview only: decide everything, write nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip interactive confirmations (batch mode).
    #[arg(long)]
    pub force: bool,

    /// Also leave groups shared with this contact.
    #[arg(long)]
    pub leave_groups: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Write structured logs (JSON lines) to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Configuration file (default: ~/.sig-prune-contact/config.toml).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["sig-prune-contact"]);
        assert!(cli.contact.is_none());
        assert!(!cli.delete && !cli.force && !cli.dry_run);
        assert!(cli.format.is_none());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::parse_from([
            "sig-prune-contact",
            "-c",
            "+15551234567",
            "-e",
            "/tmp/x",
            "-f",
            "json,md",
            "--attachments",
            "--delete",
            "--require-backup-check",
            "--dry-run",
            "--force",
            "--leave-groups",
            "-v",
            "--log-file",
            "/tmp/run.log",
        ]);
        assert_eq!(cli.contact.as_deref(), Some("+15551234567"));
        assert_eq!(cli.format.as_deref(), Some("json,md"));
        assert!(cli.attachments && cli.delete && cli.require_backup_check);
        assert!(cli.dry_run && cli.force && cli.leave_groups && cli.verbose);
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/run.log")));
    }
}
