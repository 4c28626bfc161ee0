//! Application layer - use cases and orchestration.
//!
//! This layer holds the export, guarded deletion, confirmation and contact
//! selection components, and the workflow that sequences them.

pub mod confirmation;
pub mod deletion;
pub mod exporter;
pub mod formatter;
pub mod selector;
pub mod workflow;

#[cfg(test)]
pub mod test_support;

pub use workflow::{Outcome, Workflow};
