//! Authentication provider integration.
//!
//! The provider is consumed at two points: bearer-token verification on the
//! HTTP API, and canonical user lookup during provisioning. Both sit behind
//! the [`IdentityProvider`] trait so tests can substitute a stub.

mod claims;
mod extractors;
mod jwt;
mod provider;
mod token;

pub use claims::{IdentityClaims, UserRecord};
pub use extractors::Caller;
pub use jwt::{Jwk, JwkSet, JwtVerifier};
pub use provider::{IdentityProvider, RestIdentityProvider};
pub use token::TokenExtractor;
