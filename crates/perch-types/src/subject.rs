//! Subject identity types

use serde::{Deserialize, Serialize};

use crate::TypeError;

/// Identifier of an authenticated user.
///
/// Owned by the user-management collaborator. The auth subsystem only carries
/// and compares it, so it stays an opaque string (numeric ids are rendered in
/// decimal).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Parse a subject identifier, rejecting empty values
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptySubject);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for SubjectId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<uuid::Uuid> for SubjectId {
    fn from(id: uuid::Uuid) -> Self {
        Self(id.to_string())
    }
}

impl std::str::FromStr for SubjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
