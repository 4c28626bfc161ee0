//! In-memory collaborators for exercising the workflow without Signal or a TTY.

use std::cell::RefCell;
use std::collections::VecDeque;

use chrono::{TimeZone, Utc};

use crate::domain::{
    AppError, CancelFlag, Contact, ConversationSource, Direction, Message, Result, Terminal,
};

/// Terminal that replays queued answers and records everything shown.
pub struct ScriptedTerminal {
    answers: RefCell<VecDeque<String>>,
    shown: RefCell<Vec<String>>,
}

impl ScriptedTerminal {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: RefCell::new(answers.into_iter().map(Into::into).collect()),
            shown: RefCell::default(),
        }
    }

    /// Everything shown or asked so far, one entry per line.
    pub fn output(&self) -> String {
        self.shown.borrow().join("\n")
    }

    pub fn remaining_answers(&self) -> usize {
        self.answers.borrow().len()
    }
}

impl Terminal for ScriptedTerminal {
    fn show(&self, content: &str) {
        self.shown.borrow_mut().push(content.to_string());
    }

    fn ask(&self, prompt: &str) -> Result<Option<String>> {
        self.shown.borrow_mut().push(prompt.to_string());
        Ok(self.answers.borrow_mut().pop_front())
    }
}

/// How the fake source responds to a destructive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Refuse,
    Fail,
}

/// Conversation source backed by fixed data, recording every call.
pub struct FakeSource {
    pub contacts: Vec<Contact>,
    pub messages: Vec<Message>,
    pub available: bool,
    pub clear: Behavior,
    pub leave: Behavior,
    pub backup: bool,
    /// Raises the flag while the named call is in progress.
    pub interrupt: Option<(&'static str, CancelFlag)>,
    calls: RefCell<Vec<&'static str>>,
}

impl FakeSource {
    pub fn new(contacts: Vec<Contact>, messages: Vec<Message>) -> Self {
        Self {
            contacts,
            messages,
            available: true,
            clear: Behavior::Succeed,
            leave: Behavior::Succeed,
            backup: true,
            interrupt: None,
            calls: RefCell::default(),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn was_called(&self, name: &str) -> bool {
        self.calls.borrow().contains(&name)
    }

    fn record(&self, name: &'static str) -> Result<()> {
        self.calls.borrow_mut().push(name);
        if let Some((_, flag)) = self.interrupt.as_ref().filter(|(during, _)| *during == name) {
            flag.cancel();
        }
        if self.available {
            Ok(())
        } else {
            Err(AppError::unavailable("fake source offline"))
        }
    }

    fn respond(behavior: Behavior) -> Result<bool> {
        match behavior {
            Behavior::Succeed => Ok(true),
            Behavior::Refuse => Ok(false),
            Behavior::Fail => Err(AppError::SourceFailed {
                message: "boom".into(),
            }),
        }
    }
}

impl ConversationSource for FakeSource {
    fn version(&self) -> Result<String> {
        self.record("version")?;
        Ok("fake 1.0".into())
    }

    fn list_contacts(&self) -> Result<Vec<Contact>> {
        self.record("list_contacts")?;
        Ok(self.contacts.clone())
    }

    fn fetch_messages(&self, _contact: &Contact) -> Result<Vec<Message>> {
        self.record("fetch_messages")?;
        Ok(self.messages.clone())
    }

    fn clear_conversation(&self, _contact: &Contact) -> Result<bool> {
        self.record("clear_conversation")?;
        Self::respond(self.clear)
    }

    fn leave_groups(&self, _contact: &Contact) -> Result<bool> {
        self.record("leave_groups")?;
        Self::respond(self.leave)
    }

    fn check_backup_exists(&self) -> Result<bool> {
        self.record("check_backup_exists")?;
        Ok(self.backup)
    }
}

pub fn alice() -> Contact {
    Contact {
        name: "Alice Smith".into(),
        number: Some("+15551234567".into()),
        uuid: Some("550e8400-e29b-41d4-a716-446655440000".into()),
    }
}

pub fn bob() -> Contact {
    Contact {
        name: "Bob Jones".into(),
        number: Some("+15550000000".into()),
        uuid: None,
    }
}

/// Message at midday on 2024-01-`day`.
pub fn message_on(day: u32, body: &str) -> Message {
    Message {
        timestamp: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
        direction: if day % 2 == 0 {
            Direction::Outgoing
        } else {
            Direction::Incoming
        },
        body: body.to_string(),
        attachments: Vec::new(),
    }
}
