use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a member within an organization.
///
/// Provisioning only ever writes `Owner`; `Member` exists so records
/// written by other tooling still round-trip through the store layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Organization owner, created at provisioning time.
    Owner,
    /// Regular member.
    #[default]
    Member,
}

impl MemberRole {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Member => "member",
        }
    }

    #[must_use]
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }
}

/// Error returned when parsing a role string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    invalid_value: String,
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid role: '{}' (expected: owner or member)",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for MemberRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "member" => Ok(Self::Member),
            _ => Err(ParseRoleError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An organization record.
///
/// Created exactly once per provisioning event, never mutated or deleted
/// by this service. `owner_uid` is carried so an organization whose owner
/// membership write failed can be found and repaired on redelivery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Store-assigned identifier.
    pub id: String,
    /// Display name, derived from the owner's email at provisioning.
    pub name: String,
    /// Uid of the owning user.
    pub owner_uid: String,
    /// Store-assigned creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Input for creating an organization; the store assigns id and timestamp.
#[derive(Clone, Debug)]
pub struct NewOrganization {
    pub name: String,
    pub owner_uid: String,
}

/// A membership record, keyed by uid and nested under its organization.
///
/// `uid` is the canonical key; `email` is denormalized display data only
/// (and a legacy search fallback for records that predate uid keys).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

/// A membership found by search, together with the identifier of its
/// parent organization resolved from the document's location rather than
/// a field lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct MembershipRef {
    pub organization_id: String,
    pub membership: Membership,
}
