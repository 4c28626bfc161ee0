//! Signal conversation source.
//!
//! Contacts and destructive operations go through the `signal-cli` binary;
//! message history is read from the Signal Desktop database.

use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::domain::config::SignalConfig;
use crate::domain::{
    expand_home, AppError, CancelFlag, Contact, ConversationSource, Message, Result,
};

use super::desktop_db::DesktopDbReader;
use super::signal_paths::{find_backup, find_desktop_database};

const CHILD_POLL: Duration = Duration::from_millis(50);

/// `signal-cli` backed conversation source.
pub struct SignalCli {
    binary: String,
    config_dir: PathBuf,
    desktop_db: Option<PathBuf>,
    backup_locations: Vec<PathBuf>,
    cancel: CancelFlag,
}

impl SignalCli {
    /// Create a source from the `[signal]` configuration section.
    #[must_use]
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            binary: config.cli_binary.clone(),
            config_dir: expand_home(&config.cli_config_dir),
            desktop_db: config.desktop_db.clone(),
            backup_locations: config.backup_locations.clone(),
            cancel: CancelFlag::default(),
        }
    }

    /// Kill running signal-cli commands once `cancel` is raised.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs signal-cli and returns its trimmed stdout.
    ///
    /// The child is killed and `Cancelled` returned if the run is
    /// interrupted while it is still running.
    fn run(&self, args: &[&str]) -> Result<String> {
        self.cancel.check()?;
        tracing::debug!("Running {} {}", self.binary, args.join(" "));

        let mut child = Command::new(&self.binary)
            .arg(format!("--config={}", self.config_dir.display()))
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => AppError::unavailable(format!(
                    "{} not found. Install it via: snap install signal-cli",
                    self.binary
                )),
                _ => AppError::io(format!("Failed to run {}", self.binary), e),
            })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let failed_wait =
            |e: std::io::Error| AppError::io(format!("Failed to wait for {}", self.binary), e);

        let status = loop {
            if let Some(status) = child.try_wait().map_err(failed_wait)? {
                break status;
            }
            if self.cancel.is_cancelled() {
                tracing::warn!("Stopping {} {}", self.binary, args.join(" "));
                let _ = child.kill();
                let _ = child.wait();
                return Err(AppError::Cancelled);
            }
            thread::sleep(CHILD_POLL);
        };

        let stdout = collect(stdout);
        let stderr = collect(stderr);

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            let stdout = String::from_utf8_lossy(&stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(AppError::SourceFailed {
                message: format!("signal-cli {} failed: {}", args.join(" "), detail.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }
}

/// Reads a child pipe to the end on its own thread so the child never blocks
/// on a full pipe.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

impl ConversationSource for SignalCli {
    fn version(&self) -> Result<String> {
        self.run(&["--version"])
    }

    fn list_contacts(&self) -> Result<Vec<Contact>> {
        let output = self.run(&["listContacts"])?;
        let contacts: Vec<Contact> = output.lines().filter_map(parse_contact_line).collect();
        tracing::debug!("Parsed {} contacts", contacts.len());
        Ok(contacts)
    }

    fn fetch_messages(&self, contact: &Contact) -> Result<Vec<Message>> {
        let path = find_desktop_database(self.desktop_db.as_deref())?;
        DesktopDbReader::open(&path)?.fetch_messages(contact)
    }

    fn clear_conversation(&self, contact: &Contact) -> Result<bool> {
        self.run(&["removeContact", "--forget", contact.identifier()])?;
        Ok(true)
    }

    fn leave_groups(&self, contact: &Contact) -> Result<bool> {
        let output = self.run(&["listGroups", "-d"])?;
        let shared: Vec<String> = output
            .lines()
            .filter_map(parse_group_line)
            .filter(|group| {
                group.members.iter().any(|member| {
                    Some(member.as_str()) == contact.number.as_deref()
                        || Some(member.as_str()) == contact.uuid.as_deref()
                })
            })
            .map(|group| group.id)
            .collect();

        for id in &shared {
            self.run(&["quitGroup", "-g", id.as_str()])?;
            tracing::info!("Left group: {}", id);
        }

        Ok(true)
    }

    fn check_backup_exists(&self) -> Result<bool> {
        match find_backup(&self.backup_locations) {
            Some(path) => {
                tracing::debug!("Found Signal backup at {}", path.display());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Parses a `listContacts` line: `Name (number) [uuid]`.
fn parse_contact_line(line: &str) -> Option<Contact> {
    let mut rest = line.trim();
    if rest.is_empty() || rest.starts_with('=') {
        return None;
    }

    let mut uuid = None;
    if let (Some(open), Some(close)) = (rest.rfind('['), rest.rfind(']')) {
        if open < close {
            uuid = Some(rest[open + 1..close].trim().to_string()).filter(|s| !s.is_empty());
            rest = rest[..open].trim();
        }
    }

    let mut number = None;
    if let (Some(open), Some(close)) = (rest.rfind('('), rest.rfind(')')) {
        if open < close {
            number = Some(rest[open + 1..close].trim().to_string()).filter(|s| !s.is_empty());
            rest = rest[..open].trim();
        }
    }

    if rest.is_empty() || (number.is_none() && uuid.is_none()) {
        return None;
    }

    Some(Contact {
        name: rest.to_string(),
        number,
        uuid,
    })
}

/// A group from `listGroups -d`.
#[derive(Debug, PartialEq, Eq)]
struct GroupInfo {
    id: String,
    members: Vec<String>,
}

/// Parses a `listGroups -d` line: `Id: <id> Name: ... Members: [a, b] ...`.
fn parse_group_line(line: &str) -> Option<GroupInfo> {
    let after_id = line.split_once("Id: ")?.1;
    let id = after_id.split_whitespace().next()?.to_string();

    let members = line
        .split_once("Members: [")
        .and_then(|(_, rest)| rest.split_once(']'))
        .map(|(list, _)| {
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Some(GroupInfo { id, members })
}
