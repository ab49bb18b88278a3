//! Perch Types - Shared domain types
//!
//! This crate contains domain types used across Perch services:
//! - Subject identity (the authenticated user)
//! - Credential identifiers, kinds and token pairs

pub mod credential;
pub mod error;
pub mod subject;

pub use credential::*;
pub use error::*;
pub use subject::*;
