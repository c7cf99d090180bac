//! Access levels and share-list entries embedded in every shareable document

use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-valued permission a principal holds on a document.
///
/// Ordered `NoAccess < Read < Write`; stored as the integer codes
/// `-1`, `0` and `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "i32")]
pub enum AccessLevel {
    NoAccess,
    Read,
    Write,
}

impl Default for AccessLevel {
    fn default() -> Self {
        AccessLevel::NoAccess
    }
}

impl AccessLevel {
    /// Integer code used on the wire
    pub fn code(self) -> i32 {
        match self {
            AccessLevel::NoAccess => -1,
            AccessLevel::Read => 0,
            AccessLevel::Write => 1,
        }
    }

    /// Map a share request's access string; only `"write"` grants write.
    pub fn from_request(access: Option<&str>) -> Self {
        match access {
            Some("write") => AccessLevel::Write,
            _ => AccessLevel::Read,
        }
    }

    /// Parse the public-access form value (`"-1"`, `"0"` or `"1"`)
    pub fn parse_code(value: &str) -> Option<Self> {
        match value.trim() {
            "-1" => Some(AccessLevel::NoAccess),
            "0" => Some(AccessLevel::Read),
            "1" => Some(AccessLevel::Write),
            _ => None,
        }
    }
}

impl TryFrom<f64> for AccessLevel {
    type Error = String;

    fn try_from(code: f64) -> Result<Self, Self::Error> {
        if code == -1.0 {
            Ok(AccessLevel::NoAccess)
        } else if code == 0.0 {
            Ok(AccessLevel::Read)
        } else if code == 1.0 {
            Ok(AccessLevel::Write)
        } else {
            Err(format!("unknown access code {}", code))
        }
    }
}

impl From<AccessLevel> for i32 {
    fn from(level: AccessLevel) -> Self {
        level.code()
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::NoAccess => write!(f, "no access"),
            AccessLevel::Read => write!(f, "read"),
            AccessLevel::Write => write!(f, "write"),
        }
    }
}

/// Which share list of a document an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareList {
    Users,
    Groups,
}

impl ShareList {
    /// Parse the `:list` path segment
    pub fn parse(list: &str) -> Option<Self> {
        match list {
            "users" => Some(ShareList::Users),
            "groups" => Some(ShareList::Groups),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShareList::Users => "users",
            ShareList::Groups => "groups",
        }
    }
}

impl fmt::Display for ShareList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user or group granted access to a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedEntry {
    /// Principal id (lower-cased account name or group id)
    #[serde(rename = "_id")]
    pub id: String,

    /// Display name snapshot taken when the share was added
    #[serde(alias = "username", alias = "groupname", default)]
    pub name: String,

    pub access: AccessLevel,
}

impl SharedEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, access: AccessLevel) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            access,
        }
    }
}
