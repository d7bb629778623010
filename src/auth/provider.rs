use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::auth::{IdentityClaims, JwtVerifier, UserRecord};
use crate::config::AuthConfig;
use crate::error::{Error, Result, Upstream};

/// Boundary to the external authentication provider.
///
/// Two operations are consumed: bearer-token verification (HTTP API) and
/// canonical user lookup by uid (provisioning). Object-safe so the HTTP
/// layer can hold it as `Arc<dyn IdentityProvider>` and tests can
/// substitute a stub.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a bearer token and return the decoded claim set.
    async fn verify_token(&self, token: &str) -> Result<IdentityClaims>;

    /// Fetch the canonical user record for a uid.
    ///
    /// Authoritative over trigger-payload data, which may be stale or
    /// absent depending on the delivery mechanism.
    async fn fetch_user(&self, uid: &str) -> Result<UserRecord>;
}

/// Wire shape of the provider's admin user API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserApiRecord {
    uid: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    creation_time: Option<DateTime<Utc>>,
}

impl From<UserApiRecord> for UserRecord {
    fn from(record: UserApiRecord) -> Self {
        Self {
            uid: record.uid,
            email: record.email,
            display_name: record.display_name,
            created_at: record.creation_time,
        }
    }
}

/// Production [`IdentityProvider`] backed by the provider's REST surface.
///
/// Token verification happens locally against the provider's published
/// signing keys; user lookup calls the admin user API with a bounded
/// timeout.
#[derive(Clone)]
pub struct RestIdentityProvider {
    verifier: JwtVerifier,
    http: Client,
    user_api_url: Option<String>,
    user_api_token: Option<SecretString>,
}

impl RestIdentityProvider {
    /// Build from configuration. Fetches the JWKS once when a JWKS URL is
    /// configured; call sites should treat failure as fatal at startup.
    pub async fn from_config(config: &AuthConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {}", e)))?;

        let mut verifier = match (&config.jwks_url, &config.hs256_secret) {
            (Some(url), _) => JwtVerifier::from_jwks_url(http.clone(), url.clone()).await?,
            (None, Some(secret)) => JwtVerifier::from_secret(secret.0.expose_secret().as_bytes()),
            (None, None) => {
                return Err(Error::internal(
                    "auth config requires a JWKS URL or an HS256 secret",
                ));
            }
        };

        if let Some(issuer) = &config.issuer {
            verifier.set_issuer(issuer.clone());
        }
        if let Some(audience) = &config.audience {
            verifier.set_audience(audience.clone());
        }

        Ok(Self {
            verifier,
            http,
            user_api_url: config.user_api_url.clone(),
            user_api_token: config.user_api_token.as_ref().map(|t| t.0.clone()),
        })
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<IdentityClaims> {
        self.verifier.verify(token).await
    }

    async fn fetch_user(&self, uid: &str) -> Result<UserRecord> {
        let base = self.user_api_url.as_deref().ok_or_else(|| {
            Error::internal("user lookup API not configured (auth.user_api_url)")
        })?;

        let url = format!("{}/v1/users/{}", base.trim_end_matches('/'), uid);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.user_api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::unavailable(Upstream::IdentityProvider, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::user_not_found(uid)),
            status if status.is_success() => {
                let record: UserApiRecord = response
                    .json()
                    .await
                    .map_err(|e| Error::internal(format!("malformed user API response: {}", e)))?;
                Ok(record.into())
            }
            status => Err(Error::unavailable(
                Upstream::IdentityProvider,
                format!("user API returned status {}", status),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_api_record_maps_to_user_record() {
        let json = r#"{
            "uid": "u1",
            "email": "a@x.com",
            "displayName": "Ada",
            "creationTime": "2026-01-15T12:00:00Z"
        }"#;
        let record: UserApiRecord = serde_json::from_str(json).unwrap();
        let user: UserRecord = record.into();
        assert_eq!(user.uid, "u1");
        assert_eq!(user.email.as_deref(), Some("a@x.com"));
        assert_eq!(user.display_name.as_deref(), Some("Ada"));
        assert!(user.created_at.is_some());
    }

    #[test]
    fn user_api_record_tolerates_sparse_fields() {
        let record: UserApiRecord = serde_json::from_str(r#"{"uid": "u2"}"#).unwrap();
        let user: UserRecord = record.into();
        assert_eq!(user.uid, "u2");
        assert!(user.email.is_none());
    }
}
