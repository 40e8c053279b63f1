//! Workspace roles.
//!
//! Membership rows only ever store `admin` or `member`. The owner is whoever
//! the workspace record names and never has a membership row; [`Role::resolve`]
//! folds both sources into one value.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Effective role of a user in a workspace, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The workspace's creator.
    Owner,
    /// Can approve change requests and edit tasks directly.
    Admin,
    /// Can view and request changes.
    Member,
}

/// Role stored on a membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Workspace administrator.
    Admin,
    /// Regular member.
    Member,
}

/// Error type for parsing a role from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid role: {0}")]
pub struct ParseRoleError(pub String);

impl Role {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    /// Check if this role has at least the permissions of another role.
    #[must_use]
    pub const fn includes(self, other: Self) -> bool {
        match self {
            Self::Owner => true,
            Self::Admin => matches!(other, Self::Admin | Self::Member),
            Self::Member => matches!(other, Self::Member),
        }
    }

    /// Owners and admins may decide change requests and edit tasks.
    #[must_use]
    pub const fn can_approve(self) -> bool {
        self.includes(Self::Admin)
    }

    /// Resolves the role of `user` from the workspace owner and the user's
    /// membership row, if any. Returns `None` for outsiders.
    #[must_use]
    pub fn resolve(owner_id: UserId, user: UserId, membership: Option<MemberRole>) -> Option<Self> {
        if owner_id == user {
            return Some(Self::Owner);
        }
        membership.map(Self::from)
    }
}

impl From<MemberRole> for Role {
    fn from(role: MemberRole) -> Self {
        match role {
            MemberRole::Admin => Self::Admin,
            MemberRole::Member => Self::Member,
        }
    }
}

impl MemberRole {
    /// Returns the lowercase label stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl FromStr for MemberRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
