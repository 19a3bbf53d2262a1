// File: buildtrack-core/src/ids.rs
// Purpose: Server-assigned and client-generated entity identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const TEMP_PREFIX: &str = "tmp-";

/// Placeholder id for an entity created while offline.
///
/// Serialized as a plain string (`tmp-<uuid>`), which keeps it distinct from
/// the integer ids the server assigns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemporaryId(String);

impl TemporaryId {
    /// Generate a fresh temporary id
    pub fn new() -> Self {
        Self(format!("{}{}", TEMP_PREFIX, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TemporaryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TemporaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to an entity that may not exist on the server yet
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    /// Id assigned by the server
    Server(i64),
    /// Id generated locally while offline
    Temporary(TemporaryId),
}

impl EntityRef {
    pub fn server_id(&self) -> Option<i64> {
        match self {
            EntityRef::Server(id) => Some(*id),
            EntityRef::Temporary(_) => None,
        }
    }

    pub fn temporary_id(&self) -> Option<&TemporaryId> {
        match self {
            EntityRef::Server(_) => None,
            EntityRef::Temporary(tmp) => Some(tmp),
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, EntityRef::Temporary(_))
    }
}

impl From<i64> for EntityRef {
    fn from(id: i64) -> Self {
        EntityRef::Server(id)
    }
}

impl From<TemporaryId> for EntityRef {
    fn from(id: TemporaryId) -> Self {
        EntityRef::Temporary(id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Server(id) => write!(f, "{}", id),
            EntityRef::Temporary(tmp) => write!(f, "{}", tmp),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid entity reference '{0}': expected an integer id or a 'tmp-' id")]
pub struct ParseEntityRefError(pub String);

impl FromStr for EntityRef {
    type Err = ParseEntityRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<i64>() {
            return Ok(EntityRef::Server(id));
        }
        if s.len() > TEMP_PREFIX.len() && s.starts_with(TEMP_PREFIX) {
            return Ok(EntityRef::Temporary(TemporaryId(s.to_string())));
        }
        Err(ParseEntityRefError(s.to_string()))
    }
}
