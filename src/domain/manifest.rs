//! Export manifest and deletion log records.
//!
//! These are the on-disk contracts for `export_manifest.json` and
//! `deletion_log.json`. The manifest is the only evidence the deletion guard
//! accepts that an export completed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::ExportFormat;
use super::models::{attachment_count, date_bounds, digits, Contact, Message};

/// Current manifest schema version.
pub const MANIFEST_VERSION: &str = "1.0";

/// File name of the manifest inside a contact's export directory.
pub const MANIFEST_FILE: &str = "export_manifest.json";

/// File name of the deletion log inside a contact's export directory.
pub const DELETION_LOG_FILE: &str = "deletion_log.json";

/// Contact fields recorded in manifests and deletion log entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSnapshot {
    pub name: String,
    pub number: Option<String>,
    pub uuid: Option<String>,
}

impl ContactSnapshot {
    /// Whether this snapshot was taken of `contact`.
    ///
    /// Any identifier recorded on both sides must agree, and at least one
    /// must be shared. Contacts without identifiers fall back to the name.
    #[must_use]
    pub fn describes(&self, contact: &Contact) -> bool {
        let number = match (&self.number, &contact.number) {
            (Some(recorded), Some(current)) => Some(digits(recorded) == digits(current)),
            _ => None,
        };
        let uuid = match (&self.uuid, &contact.uuid) {
            (Some(recorded), Some(current)) => Some(recorded.eq_ignore_ascii_case(current)),
            _ => None,
        };

        match (number, uuid) {
            (Some(false), _) | (_, Some(false)) => false,
            (Some(true), _) | (_, Some(true)) => true,
            (None, None) => {
                self.number.is_none()
                    && self.uuid.is_none()
                    && contact.number.is_none()
                    && contact.uuid.is_none()
                    && self.name == contact.name
            }
        }
    }
}

impl From<&Contact> for ContactSnapshot {
    fn from(contact: &Contact) -> Self {
        Self {
            name: contact.name.clone(),
            number: contact.number.clone(),
            uuid: contact.uuid.clone(),
        }
    }
}

/// First and last message timestamps of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Counts describing the exported message set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportStatistics {
    pub message_count: usize,
    pub attachment_count: usize,
    /// `null` when `message_count` is zero.
    pub date_range: Option<DateRange>,
}

impl ExportStatistics {
    /// Computes statistics from the messages that were written.
    #[must_use]
    pub fn from_messages(messages: &[Message]) -> Self {
        Self {
            message_count: messages.len(),
            attachment_count: attachment_count(messages),
            date_range: date_bounds(messages).map(|(start, end)| DateRange { start, end }),
        }
    }
}

/// Options the export ran with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub formats: Vec<ExportFormat>,
    pub include_attachments: bool,
}

/// Durable proof that an export completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub contact: ContactSnapshot,
    pub statistics: ExportStatistics,
    pub export_config: ExportSettings,
}

impl ExportManifest {
    /// Builds a manifest for the given messages.
    #[must_use]
    pub fn new(
        contact: &Contact,
        messages: &[Message],
        formats: &[ExportFormat],
        include_attachments: bool,
    ) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            export_date: Utc::now(),
            contact: contact.into(),
            statistics: ExportStatistics::from_messages(messages),
            export_config: ExportSettings {
                formats: formats.to_vec(),
                include_attachments,
            },
        }
    }
}

/// One recorded deletion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub contact: ContactSnapshot,
    pub success: bool,
    pub dry_run: bool,
    /// Why the attempt failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DeletionLogEntry {
    #[must_use]
    pub fn succeeded(contact: &Contact, dry_run: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            contact: contact.into(),
            success: true,
            dry_run,
            reason: None,
        }
    }

    #[must_use]
    pub fn failed(contact: &Contact, dry_run: bool, reason: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            contact: contact.into(),
            success: false,
            dry_run,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Direction;
    use chrono::TimeZone;

    #[test]
    fn test_empty_export_has_no_date_range() {
        let stats = ExportStatistics::from_messages(&[]);
        assert_eq!(stats.message_count, 0);
        assert_eq!(stats.date_range, None);

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["date_range"].is_null());
    }

    #[test]
    fn test_snapshot_describes_only_its_contact() {
        let alice = Contact {
            name: "Alice".into(),
            number: Some("+1 555 123 4567".into()),
            uuid: Some("550e8400-e29b-41d4-a716-446655440000".into()),
        };
        let snapshot = ContactSnapshot::from(&alice);

        let renamed = Contact {
            name: "Alice S.".into(),
            number: Some("+15551234567".into()),
            uuid: Some("550E8400-E29B-41D4-A716-446655440000".into()),
        };
        assert!(snapshot.describes(&renamed));

        let number_only = Contact {
            uuid: None,
            ..alice.clone()
        };
        assert!(snapshot.describes(&number_only));

        let other_number = Contact {
            number: Some("+15550000000".into()),
            ..alice.clone()
        };
        assert!(!snapshot.describes(&other_number));

        let other_uuid = Contact {
            uuid: Some("0f0e0d0c-0000-4000-8000-000000000000".into()),
            ..alice
        };
        assert!(!snapshot.describes(&other_uuid));
    }

    #[test]
    fn test_manifest_json_shape() {
        let contact = Contact {
            name: "Alice".into(),
            number: Some("+15551234567".into()),
            uuid: None,
        };
        let messages = vec![Message {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            direction: Direction::Outgoing,
            body: "hi".into(),
            attachments: vec!["a".into(), "b".into()],
        }];

        let manifest = ExportManifest::new(&contact, &messages, &[ExportFormat::Json], true);
        let json = serde_json::to_value(&manifest).unwrap();

        assert_eq!(json["version"], "1.0");
        assert_eq!(json["contact"]["number"], "+15551234567");
        assert_eq!(json["statistics"]["message_count"], 1);
        assert_eq!(json["statistics"]["attachment_count"], 2);
        assert_eq!(json["export_config"]["formats"][0], "json");
        assert_eq!(json["export_config"]["include_attachments"], true);
    }

    #[test]
    fn test_successful_entry_omits_reason() {
        let contact = Contact {
            name: "Bob".into(),
            number: None,
            uuid: Some("u".into()),
        };
        let json = serde_json::to_value(DeletionLogEntry::succeeded(&contact, false)).unwrap();
        assert!(json.get("reason").is_none());

        let json = serde_json::to_value(DeletionLogEntry::failed(&contact, true, "nope")).unwrap();
        assert_eq!(json["reason"], "nope");
        assert_eq!(json["dry_run"], true);
    }
}
