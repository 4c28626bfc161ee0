//! Confirmation gates.
//!
//! A gate turns a summary shown to the operator into a yes/no decision.
//! The interactive gate asks on the terminal; the forced gate always agrees
//! and leaves an explicit trace in the audit log.

use serde_json::json;

use crate::domain::{AppError, Result, Terminal};
use crate::infrastructure::{LogLevel, StructuredLogger};

/// Decides whether a guarded step may proceed.
pub trait ConfirmationGate {
    /// Shows `summary` and asks for a yes/no answer.
    ///
    /// # Errors
    /// Returns `Cancelled` if the operator closes the input.
    fn confirm(&self, summary: &str, log: &StructuredLogger) -> Result<bool>;

    /// Shows `summary` and requires `expected` to be typed back
    /// (case-insensitive, surrounding whitespace ignored).
    ///
    /// # Errors
    /// Returns `Cancelled` if the operator closes the input.
    fn confirm_with_text(
        &self,
        summary: &str,
        expected: &str,
        log: &StructuredLogger,
    ) -> Result<bool>;
}

/// Asks the operator on a terminal.
pub struct InteractiveGate<'a> {
    terminal: &'a dyn Terminal,
}

impl<'a> InteractiveGate<'a> {
    #[must_use]
    pub const fn new(terminal: &'a dyn Terminal) -> Self {
        Self { terminal }
    }
}

impl ConfirmationGate for InteractiveGate<'_> {
    fn confirm(&self, summary: &str, log: &StructuredLogger) -> Result<bool> {
        self.terminal.show(summary);

        loop {
            let answer = self
                .terminal
                .ask("Proceed? [y/N]")?
                .ok_or(AppError::Cancelled)?;

            let decision = match answer.trim().to_lowercase().as_str() {
                "y" | "yes" => true,
                "" | "n" | "no" => false,
                _ => {
                    self.terminal.show("Please answer y or n.");
                    continue;
                }
            };

            log.log(
                LogLevel::Info,
                if decision {
                    "Confirmation accepted"
                } else {
                    "Confirmation declined"
                },
                None,
            );
            return Ok(decision);
        }
    }

    fn confirm_with_text(
        &self,
        summary: &str,
        expected: &str,
        log: &StructuredLogger,
    ) -> Result<bool> {
        self.terminal.show(summary);
        self.terminal
            .show(&format!("Type the contact name to confirm deletion: {expected}"));

        let answer = self
            .terminal
            .ask("Confirmation:")?
            .ok_or(AppError::Cancelled)?;

        let matched = answer.trim().to_lowercase() == expected.trim().to_lowercase();
        if matched {
            log.info("Typed confirmation matched");
        } else {
            log.log(
                LogLevel::Info,
                "Typed confirmation did not match",
                Some(json!({ "expected": expected })),
            );
        }

        Ok(matched)
    }
}

/// Agrees to everything without prompting (batch mode).
#[derive(Debug, Default)]
pub struct ForcedGate;

impl ForcedGate {
    fn skip(summary: &str, log: &StructuredLogger) {
        let prompt = summary.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
        log.log(
            LogLevel::Info,
            "confirmation skipped: forced mode",
            Some(json!({ "prompt": prompt })),
        );
    }
}

impl ConfirmationGate for ForcedGate {
    fn confirm(&self, summary: &str, log: &StructuredLogger) -> Result<bool> {
        Self::skip(summary, log);
        Ok(true)
    }

    fn confirm_with_text(
        &self,
        summary: &str,
        _expected: &str,
        log: &StructuredLogger,
    ) -> Result<bool> {
        Self::skip(summary, log);
        Ok(true)
    }
}
