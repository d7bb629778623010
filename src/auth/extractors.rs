use axum::{extract::FromRequestParts, http::request::Parts};
use std::future::Future;
use std::sync::Arc;

use crate::auth::{IdentityClaims, IdentityProvider, TokenExtractor};
use crate::error::Error;

/// Axum extractor for the authenticated caller.
///
/// Requires a valid bearer token; the request is rejected with 401 before
/// the handler runs otherwise. The [`IdentityProvider`] is taken from
/// request extensions, so the router must carry
/// `Extension(Arc<dyn IdentityProvider>)`.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Caller(claims): Caller) -> String {
///     format!("hello {}", claims.uid)
/// }
/// ```
pub struct Caller(pub IdentityClaims);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Error;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        Box::pin(async move {
            let provider = parts
                .extensions
                .get::<Arc<dyn IdentityProvider>>()
                .ok_or_else(|| Error::internal("identity provider not found in request extensions"))?
                .clone();

            let token = TokenExtractor::from_header(parts)?;
            let claims = provider.verify_token(&token).await?;

            Ok(Caller(claims))
        })
    }
}
