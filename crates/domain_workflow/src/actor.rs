//! Reviewers and the roles they act under

use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::ReviewerId;

/// An organizational role name such as `JPO` or `DIRECTOR`
///
/// Role names come from configuration, so they are kept as case-sensitive
/// strings rather than a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(String);

impl RoleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoleName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for RoleName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A reviewer acting on a request, resolved by the user-management layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerRef {
    pub id: ReviewerId,
    pub role: RoleName,
}

impl ReviewerRef {
    pub fn new(id: ReviewerId, role: impl Into<RoleName>) -> Self {
        Self {
            id,
            role: role.into(),
        }
    }

    pub fn has_role(&self, role: &RoleName) -> bool {
        &self.role == role
    }
}

impl fmt::Display for ReviewerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}
