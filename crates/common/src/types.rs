use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CompanyError;

/// Unique identifier for a company.
///
/// Assigned by the storage layer when a company is created and never
/// changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(Uuid);

impl CompanyId {
    /// Creates a new random company ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a company ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The all-zero identity, never assigned to a stored company.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns true for the all-zero identity.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Parses an identity supplied by a client.
    ///
    /// Fails with [`CompanyError::InvalidIdentity`] when the input is not a UUID.
    pub fn parse(raw: &str) -> Result<Self, CompanyError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| CompanyError::InvalidIdentity(raw.to_string()))
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CompanyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CompanyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CompanyId {
    type Err = CompanyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for CompanyId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<CompanyId> for Uuid {
    fn from(id: CompanyId) -> Self {
        id.0
    }
}
