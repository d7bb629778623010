//! In-memory [`ProjectStore`] for tests and local development.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result, Upstream};
use crate::projects::ProjectStore;

struct InMemoryProjectStoreInner {
    rows: RwLock<HashMap<String, Vec<Value>>>,
    unavailable: AtomicBool,
}

/// In-memory project rows keyed by organization id.
///
/// Cloning shares the same underlying data. Supports an "unavailable"
/// mode for exercising outage paths.
#[derive(Clone)]
pub struct InMemoryProjectStore {
    inner: Arc<InMemoryProjectStoreInner>,
}

impl Default for InMemoryProjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InMemoryProjectStoreInner {
                rows: RwLock::new(HashMap::new()),
                unavailable: AtomicBool::new(false),
            }),
        }
    }

    /// Make every subsequent operation fail with `UpstreamUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Insert a row for an organization (test setup).
    pub fn insert_row(&self, organization_id: impl Into<String>, row: Value) {
        self.inner
            .rows
            .write()
            .unwrap()
            .entry(organization_id.into())
            .or_default()
            .push(row);
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn list_for_organization(&self, organization_id: &str) -> Result<Vec<Value>> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(Error::unavailable(Upstream::Database, "injected outage"));
        }
        Ok(self
            .inner
            .rows
            .read()
            .unwrap()
            .get(organization_id)
            .cloned()
            .unwrap_or_default())
    }
}
