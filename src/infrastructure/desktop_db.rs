//! `SQLite` reader for the Signal Desktop message store.
//!
//! Reads one-to-one conversation history from the `messages` and
//! `conversations` tables.

use std::path::Path;

use chrono::DateTime;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;

use crate::domain::{AppError, Contact, Direction, Message, Result};

const MESSAGES_QUERY: &str = r"
    SELECT m.sent_at, m.type, m.body, m.json
    FROM messages m
    JOIN conversations c ON m.conversationId = c.id
    WHERE c.type = 'private'
      AND (c.e164 = ?1 OR c.uuid = ?2)
      AND m.type IN ('incoming', 'outgoing')
    ORDER BY m.sent_at ASC
";

/// `SQLite` reader for Signal Desktop's `db.sqlite`.
pub struct DesktopDbReader {
    conn: Connection,
}

impl DesktopDbReader {
    /// Opens the database in read-only mode.
    ///
    /// # Errors
    /// Returns error if database cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(path, flags).map_err(AppError::database)?;

        conn.execute_batch(
            "PRAGMA query_only = ON;
             PRAGMA temp_store = MEMORY;",
        )
        .map_err(AppError::database)?;

        Ok(Self { conn })
    }

    /// Fetches every message exchanged with `contact`.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn fetch_messages(&self, contact: &Contact) -> Result<Vec<Message>> {
        let mut stmt = self
            .conn
            .prepare(MESSAGES_QUERY)
            .map_err(AppError::database)?;

        let rows = stmt
            .query_map([contact.number.as_deref(), contact.uuid.as_deref()], |row| {
                Ok(RawMessage {
                    sent_at: row.get(0)?,
                    kind: row.get(1)?,
                    body: row.get(2)?,
                    json: row.get(3)?,
                })
            })
            .map_err(AppError::database)?;

        let mut messages = Vec::new();
        for row in rows {
            match row {
                Ok(raw) => match raw.into_message() {
                    Some(message) => messages.push(message),
                    None => tracing::warn!("Skipping message without a usable timestamp"),
                },
                Err(e) => {
                    tracing::warn!("Failed to read row: {}", e);
                }
            }
        }

        tracing::debug!("Fetched {} messages for {}", messages.len(), contact.identifier());

        Ok(messages)
    }
}

/// One row of the messages query.
struct RawMessage {
    sent_at: Option<i64>,
    kind: String,
    body: Option<String>,
    json: Option<String>,
}

impl RawMessage {
    fn into_message(self) -> Option<Message> {
        let timestamp = DateTime::from_timestamp_millis(self.sent_at?)?;
        let direction = if self.kind == "outgoing" {
            Direction::Outgoing
        } else {
            Direction::Incoming
        };

        Some(Message {
            timestamp,
            direction,
            body: self.body.unwrap_or_default(),
            attachments: self.json.as_deref().map(attachment_refs).unwrap_or_default(),
        })
    }
}

/// Extracts attachment references from a message's JSON blob.
fn attachment_refs(json: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<Value>(json) else {
        return Vec::new();
    };

    value
        .get("attachments")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    ["path", "cdnKey", "fileName"]
                        .iter()
                        .find_map(|key| item.get(*key).and_then(Value::as_str))
                        .map_or_else(|| format!("attachment-{}", i + 1), String::from)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seed(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE conversations (id TEXT PRIMARY KEY, type TEXT, e164 TEXT, uuid TEXT);
            CREATE TABLE messages (
                id TEXT PRIMARY KEY, conversationId TEXT, type TEXT,
                sent_at INTEGER, body TEXT, json TEXT
            );
            INSERT INTO conversations VALUES ('c1', 'private', '+15551234567', 'u-1');
            INSERT INTO conversations VALUES ('c2', 'private', '+15550000000', 'u-2');
            INSERT INTO messages VALUES ('m2', 'c1', 'outgoing', 1704153600000, 'second',
                '{"attachments":[{"path":"ab/cdef"},{"contentType":"image/png"}]}');
            INSERT INTO messages VALUES ('m1', 'c1', 'incoming', 1704067200000, 'first', '{}');
            INSERT INTO messages VALUES ('m3', 'c1', 'keychange', 1704067300000, NULL, '{}');
            INSERT INTO messages VALUES ('m4', 'c2', 'incoming', 1704067200000, 'other', '{}');
            INSERT INTO messages VALUES ('m5', 'c1', 'incoming', NULL, 'undated', '{}');
            "#,
        )
        .unwrap();
    }

    #[test]
    fn test_fetch_messages_for_contact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.sqlite");
        seed(&path);

        let reader = DesktopDbReader::open(&path).unwrap();
        let contact = Contact {
            name: "Alice".into(),
            number: Some("+15551234567".into()),
            uuid: None,
        };

        let messages = reader.fetch_messages(&contact).unwrap();
        let bodies: Vec<_> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["first", "second"]);
        assert_eq!(messages[1].direction, Direction::Outgoing);
        assert_eq!(messages[1].attachments, vec!["ab/cdef", "attachment-2"]);
        assert!(messages[0].attachments.is_empty());
    }

    #[test]
    fn test_lookup_by_uuid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.sqlite");
        seed(&path);

        let reader = DesktopDbReader::open(&path).unwrap();
        let contact = Contact {
            name: "Bob".into(),
            number: None,
            uuid: Some("u-2".into()),
        };
        assert_eq!(reader.fetch_messages(&contact).unwrap().len(), 1);
    }

    #[test]
    fn test_attachment_refs_tolerates_bad_json() {
        assert!(attachment_refs("not json").is_empty());
        assert!(attachment_refs(r#"{"attachments":"x"}"#).is_empty());
    }
}
