//! Math Tutor Core Library
//!
//! Foundational utilities shared by every crate in the workspace:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration and credential resolution

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, Credentials};
pub use error::{AppError, AppResult};
