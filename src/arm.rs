//! Arm and task identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of the task a recommendation is made for.
pub type TaskId = u64;

/// Identifier of one candidate arm (a user, in the assignment domain).
///
/// Integer and string identifiers are both supported.  The ordering is total and
/// stable (every integer sorts before every string), which is what ranking uses
/// to break score ties.
///
/// Serialized untagged: `7` and `"alice"` are both valid JSON arm ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArmId {
    Num(u64),
    Name(String),
}

impl fmt::Display for ArmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Name(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ArmId {
    fn from(n: u64) -> Self {
        Self::Num(n)
    }
}

impl From<u32> for ArmId {
    fn from(n: u32) -> Self {
        Self::Num(u64::from(n))
    }
}

impl From<&str> for ArmId {
    fn from(s: &str) -> Self {
        Self::Name(s.to_string())
    }
}

impl From<String> for ArmId {
    fn from(s: String) -> Self {
        Self::Name(s)
    }
}
