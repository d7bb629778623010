use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decoded claim set of a verified bearer token.
///
/// `uid` comes from the standard `sub` claim. Email and display name are
/// optional: tokens minted for service accounts or via phone sign-in carry
/// no email, and endpoints that need one must reject such callers
/// explicitly rather than assume it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(rename = "sub")]
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize,
}

impl IdentityClaims {
    /// The caller's email, if the token carries a non-empty one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }
}

/// Canonical user record fetched from the authentication provider.
///
/// Authoritative over anything a trigger payload claims about the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_deserializes_from_sub() {
        let claims: IdentityClaims =
            serde_json::from_str(r#"{"sub": "u1", "email": "a@x.com", "exp": 99}"#).unwrap();
        assert_eq!(claims.uid, "u1");
        assert_eq!(claims.email(), Some("a@x.com"));
    }

    #[test]
    fn empty_email_is_treated_as_absent() {
        let claims: IdentityClaims =
            serde_json::from_str(r#"{"sub": "u1", "email": "", "exp": 99}"#).unwrap();
        assert_eq!(claims.email(), None);
    }

    #[test]
    fn email_is_optional() {
        let claims: IdentityClaims = serde_json::from_str(r#"{"sub": "u1", "exp": 99}"#).unwrap();
        assert_eq!(claims.email(), None);
        assert!(claims.name.is_none());
    }
}
