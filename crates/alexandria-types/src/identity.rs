use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Numeric identifier of a user account.
///
/// Ids are drawn at random when a user is added to a credential store and
/// are only guaranteed to be unique within that store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(u32);

impl UserId {
    /// Wrap a raw id.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The unassigned id carried by users that have not been stored yet.
    pub const fn unassigned() -> Self {
        Self(0)
    }

    /// Returns `true` if no id has been assigned.
    pub fn is_unassigned(&self) -> bool {
        self.0 == 0
    }

    /// The raw numeric value.
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|e| TypeError::InvalidUserId(format!("{s:?}: {e}")))
    }
}

impl From<u32> for UserId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
