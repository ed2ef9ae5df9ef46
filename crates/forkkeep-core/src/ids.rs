//! Run identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const RUN_PREFIX: &str = "run_";

/// Identifies one workflow run in logs. Time-ordered (UUIDv7) and shown
/// as `run_<uuid>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", RUN_PREFIX, self.0)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    /// Accepts both `run_<uuid>` and a bare UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.strip_prefix(RUN_PREFIX).unwrap_or(s)).map(Self)
    }
}
