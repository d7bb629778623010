//! orgbridge - tenant provisioning and hybrid organization lookup.
//!
//! orgbridge provisions a per-user "organization of one" as a side effect
//! of signup at the authentication provider, and serves a read API that
//! joins organization membership (document store) with organization-owned
//! rows (relational store).
//!
//! # Architecture
//!
//! - **Provisioning**: user-creation events arrive on trigger endpoints in
//!   per-integration shapes, are normalized, and run through an idempotent
//!   check-then-complete workflow that creates one organization and one
//!   owner membership.
//! - **Hybrid lookup**: an authenticated caller's membership is found by a
//!   cross-organization search, the organization id is taken from its
//!   parent reference, and owned rows are fetched by equality filter.
//! - Store and provider integrations sit behind traits
//!   ([`directory::DirectoryStore`], [`projects::ProjectStore`],
//!   [`auth::IdentityProvider`]) with in-memory implementations for tests.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use orgbridge::ConfigBuilder;
//!
//! #[tokio::main]
//! async fn main() {
//!     orgbridge::init_tracing();
//!     let config = ConfigBuilder::new().from_env().build().unwrap();
//!     // ... construct clients and serve (see src/main.rs)
//! }
//! ```

pub mod auth;
mod config;
pub mod directory;
mod error;
pub mod http;
pub mod lookup;
pub mod projects;
pub mod provisioning;

pub use config::{
    AuthConfig, Config, ConfigBuilder, DatabaseConfig, DirectoryConfig, LoggingConfig,
    ServerConfig, get_env_with_prefix,
};
pub use error::{Error, Result, Upstream};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults.
///
/// Call early in `main()`, before constructing clients.
///
/// # Environment Variables
///
/// - `RUST_LOG`: log filter (e.g. "info", "orgbridge=debug")
/// - `ORGBRIDGE_LOG_JSON`: set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("ORGBRIDGE_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing from a loaded configuration.
pub fn init_tracing_with_config(config: &LoggingConfig) {
    let env_filter = EnvFilter::new(&config.level);

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
