//! Shared types for factbook

pub mod error;

pub use error::{FactbookError, Result};
