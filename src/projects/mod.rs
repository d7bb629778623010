//! Projects: the relational side of the hybrid read.
//!
//! The relational schema is owned elsewhere; this module only filters rows
//! by `organization_id` and returns them verbatim, so rows travel as
//! `serde_json::Value` rather than a typed entity.

mod memory;
mod sea_orm_store;

pub use memory::InMemoryProjectStore;
pub use sea_orm_store::SeaOrmProjectStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Storage boundary to the relational store.
///
/// Implementations map their own failures to
/// `Error::UpstreamUnavailable { upstream: Database }`.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Fetch every row whose `organization_id` equals the given id,
    /// as ordered field-value mappings.
    async fn list_for_organization(&self, organization_id: &str) -> Result<Vec<Value>>;
}
