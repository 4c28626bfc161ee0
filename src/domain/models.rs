//! Domain models for Signal conversations.
//!
//! Contacts and messages as delivered by the conversation source, plus the
//! parsed form of a contact identifier given on the command line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{AppError, Result};

/// Direction of a message relative to the local account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sent by the contact.
    Incoming,
    /// Sent by the local account.
    Outgoing,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incoming => write!(f, "Incoming"),
            Self::Outgoing => write!(f, "Outgoing"),
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// When the message was sent (UTC).
    pub timestamp: DateTime<Utc>,
    /// Incoming or outgoing.
    pub direction: Direction,
    /// Message text, possibly empty.
    #[serde(default)]
    pub body: String,
    /// Opaque attachment references, in message order.
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// A Signal contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Display name.
    pub name: String,
    /// Phone number in E.164 form, if known.
    pub number: Option<String>,
    /// Service UUID, if known.
    pub uuid: Option<String>,
}

impl Contact {
    /// Identifier used when talking to the conversation source.
    #[must_use]
    pub fn identifier(&self) -> &str {
        self.number
            .as_deref()
            .or(self.uuid.as_deref())
            .unwrap_or(self.name.as_str())
    }

    /// Filesystem-safe directory name for this contact.
    ///
    /// Lowercased name with every run of other characters collapsed to `-`,
    /// suffixed with the digits of the phone number (or the first 8 characters
    /// of the uuid) so two contacts sharing a name never share a directory.
    #[must_use]
    pub fn slug(&self) -> String {
        let mut name = String::new();
        for c in self.name.chars().flat_map(char::to_lowercase) {
            if c.is_ascii_alphanumeric() {
                name.push(c);
            } else if !name.is_empty() && !name.ends_with('-') {
                name.push('-');
            }
        }
        let name = name.trim_end_matches('-');
        let name = if name.is_empty() { "unknown" } else { name };

        let suffix: String = match (&self.number, &self.uuid) {
            (Some(number), _) => number.chars().filter(char::is_ascii_digit).collect(),
            (None, Some(uuid)) => uuid
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .take(8)
                .collect::<String>()
                .to_lowercase(),
            (None, None) => String::new(),
        };

        if suffix.is_empty() {
            name.to_string()
        } else {
            format!("{name}_{suffix}")
        }
    }

    /// Whether this contact is the one a parsed identifier refers to.
    #[must_use]
    pub fn matches(&self, reference: &ContactRef) -> bool {
        match reference {
            ContactRef::Phone(number) => self
                .number
                .as_deref()
                .is_some_and(|own| digits(own) == digits(number)),
            ContactRef::OpaqueId(id) => self
                .uuid
                .as_deref()
                .is_some_and(|uuid| uuid.eq_ignore_ascii_case(id)),
        }
    }
}

/// The ASCII digits of a phone number, for format-insensitive comparison.
#[must_use]
pub fn digits(number: &str) -> String {
    number.chars().filter(char::is_ascii_digit).collect()
}

/// A contact identifier as typed by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactRef {
    /// Phone-like: optional leading `+`, then 5 to 15 digits.
    Phone(String),
    /// Hyphenated UUID.
    OpaqueId(String),
}

impl ContactRef {
    /// Parses a direct contact identifier.
    ///
    /// # Errors
    /// Returns a validation error if the text is neither phone-like nor a UUID.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();

        let digits = raw.strip_prefix('+').unwrap_or(raw);
        if (5..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Self::Phone(raw.to_string()));
        }

        if raw.len() == 36 && uuid::Uuid::parse_str(raw).is_ok() {
            return Ok(Self::OpaqueId(raw.to_lowercase()));
        }

        Err(AppError::validation(format!(
            "Invalid contact format: {raw} (expected a phone number like +15551234567 or a UUID)"
        )))
    }
}

impl std::fmt::Display for ContactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Phone(number) => write!(f, "{number}"),
            Self::OpaqueId(id) => write!(f, "{id}"),
        }
    }
}

/// Sorts messages into canonical order: by timestamp, ties kept in fetch order.
pub fn sort_messages(messages: &mut [Message]) {
    messages.sort_by_key(|m| m.timestamp);
}

/// Earliest and latest timestamps, or `None` for an empty conversation.
#[must_use]
pub fn date_bounds(messages: &[Message]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = messages.iter().map(|m| m.timestamp).min()?;
    let end = messages.iter().map(|m| m.timestamp).max()?;
    Some((start, end))
}

/// Total attachment references across messages.
#[must_use]
pub fn attachment_count(messages: &[Message]) -> usize {
    messages.iter().map(|m| m.attachments.len()).sum()
}
