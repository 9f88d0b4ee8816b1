//! Command handlers for the Math Tutor CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod check;
pub mod ingest;
pub mod retrieve;
pub mod status;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use check::CheckCommand;
pub use ingest::IngestCommand;
pub use retrieve::RetrieveCommand;
pub use status::StatusCommand;
