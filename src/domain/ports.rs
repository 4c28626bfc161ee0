//! Interfaces to the collaborators the workflow drives but does not own.

use super::error::Result;
use super::models::{Contact, Message};

/// Where contacts and message history live, and what can delete them.
///
/// Every call is blocking. Implementations report a missing or unconfigured
/// backend as `AppError::SourceUnavailable`.
pub trait ConversationSource {
    /// Version string of the backend, used to check it is available.
    fn version(&self) -> Result<String>;

    fn list_contacts(&self) -> Result<Vec<Contact>>;

    /// All messages exchanged with `contact`, in fetch order.
    fn fetch_messages(&self, contact: &Contact) -> Result<Vec<Message>>;

    /// Irreversibly removes the conversation. `Ok(false)` means the backend
    /// refused without raising an error.
    fn clear_conversation(&self, contact: &Contact) -> Result<bool>;

    /// Leaves every group shared with `contact`.
    fn leave_groups(&self, contact: &Contact) -> Result<bool>;

    /// Whether a backup of the local message store appears to exist.
    fn check_backup_exists(&self) -> Result<bool>;
}

/// The operator's console: a display primitive and a prompt primitive.
pub trait Terminal {
    /// Shows content to the operator.
    fn show(&self, content: &str);

    /// Asks a question and returns the answer; `None` on end of input.
    fn ask(&self, prompt: &str) -> Result<Option<String>>;
}
