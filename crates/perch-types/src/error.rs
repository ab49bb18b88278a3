//! Common error types

use thiserror::Error;

/// Errors raised while parsing shared domain types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// Unknown credential kind
    #[error("invalid credential kind: {0}")]
    InvalidKind(String),

    /// Subject identifier was empty
    #[error("subject identifier cannot be empty")]
    EmptySubject,
}
