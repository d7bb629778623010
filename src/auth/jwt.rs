use crate::auth::IdentityClaims;
use crate::error::{Error, Result, Upstream};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::Client;
use std::sync::{Arc, OnceLock};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// JSON Web Key (JWK) as returned by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: Option<String>,
    pub n: String,
    pub e: String,
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    pub alg: Option<String>,
}

/// JWK Set containing multiple keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Fetch a JWK Set from a URL.
    pub async fn fetch(client: &Client, url: &str) -> Result<Self> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::unavailable(Upstream::IdentityProvider, e))?;

        if !response.status().is_success() {
            return Err(Error::unavailable(
                Upstream::IdentityProvider,
                format!("JWKS endpoint returned status {}", response.status()),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| Error::internal(format!("Failed to parse JWKS: {}", e)))
    }

    /// Find a JWK by key ID.
    pub fn find_by_kid(&self, kid: &str) -> Option<&Jwk> {
        self.keys
            .iter()
            .find(|jwk| jwk.kid.as_deref() == Some(kid))
    }
}

/// Bearer-token verifier for [`IdentityClaims`].
///
/// Two modes: JWKS (RS256, `kid`-selected, refreshable for key rotation)
/// for real providers, or a static HS256 secret for development and tests.
///
/// # Security Note
///
/// Configure both issuer and audience validation with [`set_issuer`] and
/// [`set_audience`] before production use. Without them, any token with a
/// valid signature is accepted regardless of who minted it or for whom.
///
/// [`set_issuer`]: JwtVerifier::set_issuer
/// [`set_audience`]: JwtVerifier::set_audience
#[derive(Clone)]
pub struct JwtVerifier {
    jwks: Arc<RwLock<JwkSet>>,
    jwks_url: Option<String>,
    http: Option<Client>,
    decoding_key: Option<DecodingKey>,
    validation: Validation,
    issuer_configured: bool,
    audience_configured: bool,
    /// Logged once per verifier instance to avoid log spam under load.
    warning_logged: Arc<OnceLock<()>>,
}

impl JwtVerifier {
    /// Create a verifier that fetches RS256 keys from a JWKS URL.
    pub async fn from_jwks_url(client: Client, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let jwks = JwkSet::fetch(&client, &url).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;

        Ok(Self {
            jwks: Arc::new(RwLock::new(jwks)),
            jwks_url: Some(url),
            http: Some(client),
            decoding_key: None,
            validation,
            issuer_configured: false,
            audience_configured: false,
            warning_logged: Arc::new(OnceLock::new()),
        })
    }

    /// Create a verifier using a static HS256 secret (dev/test).
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            jwks: Arc::new(RwLock::new(JwkSet { keys: vec![] })),
            jwks_url: None,
            http: None,
            decoding_key: Some(DecodingKey::from_secret(secret)),
            validation,
            issuer_configured: false,
            audience_configured: false,
            warning_logged: Arc::new(OnceLock::new()),
        }
    }

    /// Set the expected issuer claim.
    pub fn set_issuer(&mut self, issuer: impl Into<String>) {
        self.validation.set_issuer(&[issuer.into()]);
        self.issuer_configured = true;
    }

    /// Set the expected audience claim.
    pub fn set_audience(&mut self, audience: impl Into<String>) {
        self.validation.set_audience(&[audience.into()]);
        self.audience_configured = true;
    }

    /// Refresh the JWKS (key rotation).
    pub async fn refresh_jwks(&self) -> Result<()> {
        if let (Some(url), Some(client)) = (&self.jwks_url, &self.http) {
            let new_jwks = JwkSet::fetch(client, url).await?;
            let mut jwks = self.jwks.write().await;
            *jwks = new_jwks;
        }
        Ok(())
    }

    /// Verify and decode a bearer token.
    pub async fn verify(&self, token: &str) -> Result<IdentityClaims> {
        if !self.issuer_configured || !self.audience_configured {
            self.warning_logged.get_or_init(|| {
                tracing::warn!(
                    issuer = self.issuer_configured,
                    audience = self.audience_configured,
                    "JWT verifier missing issuer and/or audience validation; \
                     configure both for production use"
                );
            });
        }

        if let Some(key) = &self.decoding_key {
            return decode::<IdentityClaims>(token, key, &self.validation)
                .map(|data| data.claims)
                .map_err(|e| Error::invalid_token(e.to_string()));
        }

        let header =
            decode_header(token).map_err(|e| Error::invalid_token(format!("bad header: {}", e)))?;

        let kid = header
            .kid
            .as_ref()
            .ok_or_else(|| Error::invalid_token("token missing 'kid' header"))?;

        let jwks = self.jwks.read().await;
        let jwk = jwks
            .find_by_kid(kid)
            .ok_or_else(|| Error::invalid_token(format!("key '{}' not found in JWKS", kid)))?;

        let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| Error::internal(format!("failed to build decoding key: {}", e)))?;

        decode::<IdentityClaims>(token, &decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| Error::invalid_token(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn mint(secret: &[u8], algorithm: Algorithm, claims: &IdentityClaims) -> String {
        encode(
            &Header::new(algorithm),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    fn claims_for(uid: &str) -> IdentityClaims {
        IdentityClaims {
            uid: uid.to_string(),
            email: Some(format!("{}@example.com", uid)),
            name: None,
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
        }
    }

    #[tokio::test]
    async fn verifies_valid_hs256_token() {
        let secret = b"orgbridge_test_secret_1234567890";
        let verifier = JwtVerifier::from_secret(secret);

        let token = mint(secret, Algorithm::HS256, &claims_for("u1"));
        let claims = verifier.verify(&token).await.unwrap();
        assert_eq!(claims.uid, "u1");
    }

    #[tokio::test]
    async fn rejects_wrong_algorithm() {
        let secret = b"orgbridge_test_secret_1234567890";
        let verifier = JwtVerifier::from_secret(secret);

        // HS384 signature against an HS256 verifier: algorithm confusion.
        let token = mint(secret, Algorithm::HS384, &claims_for("u1"));
        let result = verifier.verify(&token).await;
        assert!(matches!(result, Err(Error::InvalidToken(_))));
    }

    #[tokio::test]
    async fn rejects_none_algorithm() {
        let verifier = JwtVerifier::from_secret(b"secret");

        // Header: {"alg":"none","typ":"JWT"}
        let none_header = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
        let payload = "eyJzdWIiOiJ1c2VyMTIzIiwiZXhwIjo5OTk5OTk5OTk5fQ";
        let none_token = format!("{}.{}.", none_header, payload);

        let result = verifier.verify(&none_token).await;
        assert!(matches!(result, Err(Error::InvalidToken(_))));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let secret = b"orgbridge_test_secret_1234567890";
        let verifier = JwtVerifier::from_secret(secret);

        let mut claims = claims_for("u1");
        claims.exp = (chrono::Utc::now() - chrono::Duration::hours(1)).timestamp() as usize;

        let token = mint(secret, Algorithm::HS256, &claims);
        assert!(matches!(
            verifier.verify(&token).await,
            Err(Error::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn rejects_wrong_issuer() {
        let secret = b"orgbridge_test_secret_1234567890";
        let mut verifier = JwtVerifier::from_secret(secret);
        verifier.set_issuer("https://issuer.example.com");

        // Token carries no `iss` claim at all.
        let token = mint(secret, Algorithm::HS256, &claims_for("u1"));
        assert!(matches!(
            verifier.verify(&token).await,
            Err(Error::InvalidToken(_))
        ));
    }

    #[test]
    fn find_by_kid_matches_exactly() {
        let set = JwkSet {
            keys: vec![Jwk {
                kty: "RSA".into(),
                kid: Some("key-1".into()),
                n: "abc".into(),
                e: "AQAB".into(),
                key_use: None,
                alg: None,
            }],
        };
        assert!(set.find_by_kid("key-1").is_some());
        assert!(set.find_by_kid("key-2").is_none());
    }
}
