use crate::error::Error;
use axum::http::request::Parts;

/// Extracts the bearer token from request headers.
pub struct TokenExtractor;

impl TokenExtractor {
    /// Extract token from the Authorization header.
    pub fn from_header(parts: &Parts) -> Result<String, Error> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::invalid_token("missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                Error::invalid_token("invalid authorization header format, expected: Bearer <token>")
            })?
            .to_string();

        if token.is_empty() {
            return Err(Error::invalid_token("empty bearer token"));
        }

        Ok(token)
    }
}
