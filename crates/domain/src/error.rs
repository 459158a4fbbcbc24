//! Unified error types for the domain layer
//!
//! Provides a common error type for the pure vocabulary rules (names, slots,
//! enumerations) so adapters don't have to fall back to String or anyhow.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Channel name does not follow the `#name` rules
    #[error("Invalid channel name: {0}")]
    InvalidChannelName(String),

    /// Slot index outside of the 16 lobby slots
    #[error("Slot {0} is out of range (expected 0..=15)")]
    SlotOutOfRange(usize),

    /// Lobby size outside of 1..=16
    #[error("Lobby size {0} is out of range (expected 1..=16)")]
    SizeOutOfRange(u32),

    /// Parse error (for enumerations read from bot replies or user input)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    /// Creates a validation error for rule violations.
    ///
    /// # Example
    /// ```ignore
    /// if name.trim().is_empty() {
    ///     return Err(DomainError::validation("Lobby name cannot be empty"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
