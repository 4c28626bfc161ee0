//! Contact resolution: direct identifiers and interactive search.

use fuzzy_matcher::{skim::SkimMatcherV2, FuzzyMatcher};
use serde_json::json;

use crate::domain::{AppError, Contact, ContactRef, Result, Terminal};
use crate::infrastructure::{LogLevel, StructuredLogger};

use super::confirmation::ConfirmationGate;
use super::formatter::{format_contact_preview, format_contacts_table};

/// Finds the contact a parsed identifier refers to.
///
/// # Errors
/// Returns `ContactNotFound` when no contact carries the identifier.
pub fn resolve(reference: &ContactRef, contacts: &[Contact]) -> Result<Contact> {
    contacts
        .iter()
        .find(|c| c.matches(reference))
        .cloned()
        .ok_or_else(|| AppError::ContactNotFound {
            identifier: reference.to_string(),
        })
}

/// Contacts whose name or number fuzzy-match `query`, best match first.
#[must_use]
pub fn fuzzy_filter(contacts: &[Contact], query: &str) -> Vec<Contact> {
    let matcher = SkimMatcherV2::default();

    let mut scored: Vec<(i64, &Contact)> = contacts
        .iter()
        .filter_map(|c| {
            let haystack = format!("{} {}", c.name, c.number.as_deref().unwrap_or_default());
            matcher.fuzzy_match(&haystack, query).map(|score| (score, c))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, c)| c.clone()).collect()
}

/// Walks the operator through picking a contact.
pub struct ContactSelector<'a> {
    terminal: &'a dyn Terminal,
    gate: &'a dyn ConfirmationGate,
}

impl<'a> ContactSelector<'a> {
    #[must_use]
    pub fn new(terminal: &'a dyn Terminal, gate: &'a dyn ConfirmationGate) -> Self {
        Self { terminal, gate }
    }

    /// Lets the operator search, pick and confirm a contact.
    ///
    /// Returns `None` when there is nothing to pick from.
    ///
    /// # Errors
    /// Returns `Cancelled` if input ends at any prompt.
    pub fn select(&self, contacts: &[Contact], log: &StructuredLogger) -> Result<Option<Contact>> {
        if contacts.is_empty() {
            log.warning("No contacts available for selection");
            return Ok(None);
        }

        loop {
            self.terminal.show(&format_contacts_table(contacts));

            let query = self
                .terminal
                .ask("Search contacts (Enter to list all):")?
                .ok_or(AppError::Cancelled)?;
            let query = query.trim();

            let candidates = if query.is_empty() {
                contacts.to_vec()
            } else {
                let found = fuzzy_filter(contacts, query);
                log.log(
                    LogLevel::Debug,
                    "Contact search",
                    Some(json!({ "query": query, "matches": found.len() })),
                );
                if found.is_empty() {
                    log.warning(format!("No contacts match '{query}'"));
                    return Ok(None);
                }
                self.terminal.show(&format_contacts_table(&found));
                found
            };

            let contact = self.pick(&candidates)?;

            self.terminal.show(&format_contact_preview(&contact));
            if self.gate.confirm("Proceed with this contact?", log)? {
                log.info(format!("Selected contact {}", contact.identifier()));
                return Ok(Some(contact));
            }
        }
    }

    fn pick(&self, candidates: &[Contact]) -> Result<Contact> {
        loop {
            let answer = self
                .terminal
                .ask(&format!("Select contact number (1-{}):", candidates.len()))?
                .ok_or(AppError::Cancelled)?;

            match answer.trim().parse::<usize>() {
                Ok(n) if (1..=candidates.len()).contains(&n) => {
                    return Ok(candidates[n - 1].clone());
                }
                _ => self.terminal.show("Invalid selection"),
            }
        }
    }
}
