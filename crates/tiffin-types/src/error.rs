//! Common error types

use thiserror::Error;

/// A stored or submitted string did not name a known enum variant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// What was being parsed (e.g. "slot", "subscription status")
    pub kind: &'static str,
    /// The offending input
    pub value: String,
}

impl ParseEnumError {
    /// Create a new parse error
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Domain validation failure for plans, trial types and settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidInput(pub String);

impl InvalidInput {
    /// Create a new validation failure
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
