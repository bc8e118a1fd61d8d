//! Shared domain types, configuration, and errors for PolicyDesk.

pub mod config;
pub mod error;
pub mod types;

pub use config::PolicyDeskConfig;
pub use error::{PolicyDeskError, Result};
pub use types::*;
