//! In-memory [`DirectoryStore`] for tests and local development.
//!
//! In production, use [`FirestoreDirectory`](super::FirestoreDirectory).

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::directory::{
    DirectoryStore, Membership, MembershipRef, NewOrganization, Organization,
};
use crate::error::{Error, Result, Upstream};

struct InMemoryDirectoryInner {
    organizations: RwLock<Vec<Organization>>,
    /// (organization_id, membership), kept in insertion order so "first
    /// match wins" is deterministic.
    memberships: RwLock<Vec<(String, Membership)>>,
    unavailable: AtomicBool,
}

/// In-memory directory store.
///
/// Cloning shares the same underlying data (uses Arc internally). The
/// store can be switched into an "unavailable" mode where every operation
/// fails, for exercising outage paths.
#[derive(Clone)]
pub struct InMemoryDirectory {
    inner: Arc<InMemoryDirectoryInner>,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InMemoryDirectoryInner {
                organizations: RwLock::new(Vec::new()),
                memberships: RwLock::new(Vec::new()),
                unavailable: AtomicBool::new(false),
            }),
        }
    }

    /// Make every subsequent operation fail with `UpstreamUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Insert an organization directly (test setup).
    pub fn insert_organization(&self, org: Organization) {
        self.inner.organizations.write().unwrap().push(org);
    }

    /// Insert a membership directly (test setup).
    pub fn insert_membership(&self, organization_id: impl Into<String>, membership: Membership) {
        self.inner
            .memberships
            .write()
            .unwrap()
            .push((organization_id.into(), membership));
    }

    /// Number of organizations currently stored.
    pub fn organization_count(&self) -> usize {
        self.inner.organizations.read().unwrap().len()
    }

    /// Number of memberships currently stored.
    pub fn membership_count(&self) -> usize {
        self.inner.memberships.read().unwrap().len()
    }

    /// Snapshot of all organizations (test assertions).
    pub fn organizations(&self) -> Vec<Organization> {
        self.inner.organizations.read().unwrap().clone()
    }

    /// Snapshot of all memberships with their organization ids.
    pub fn memberships(&self) -> Vec<(String, Membership)> {
        self.inner.memberships.read().unwrap().clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            Err(Error::unavailable(Upstream::Directory, "injected outage"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectory {
    async fn create_organization(&self, new_org: &NewOrganization) -> Result<Organization> {
        self.check_available()?;
        let org = Organization {
            id: Uuid::new_v4().to_string(),
            name: new_org.name.clone(),
            owner_uid: new_org.owner_uid.clone(),
            created_at: Utc::now(),
        };
        self.insert_organization(org.clone());
        Ok(org)
    }

    async fn put_membership(&self, organization_id: &str, membership: &Membership) -> Result<()> {
        self.check_available()?;
        let mut memberships = self.inner.memberships.write().unwrap();
        // Overwrite-at-known-key semantics.
        if let Some(existing) = memberships
            .iter_mut()
            .find(|(org, m)| org == organization_id && m.uid == membership.uid)
        {
            existing.1 = membership.clone();
        } else {
            memberships.push((organization_id.to_string(), membership.clone()));
        }
        Ok(())
    }

    async fn find_membership_by_uid(&self, uid: &str) -> Result<Option<MembershipRef>> {
        self.check_available()?;
        Ok(self
            .inner
            .memberships
            .read()
            .unwrap()
            .iter()
            .find(|(_, m)| m.uid == uid)
            .map(|(org_id, m)| MembershipRef {
                organization_id: org_id.clone(),
                membership: m.clone(),
            }))
    }

    async fn find_membership_by_email(&self, email: &str) -> Result<Option<MembershipRef>> {
        self.check_available()?;
        Ok(self
            .inner
            .memberships
            .read()
            .unwrap()
            .iter()
            .find(|(_, m)| m.email.as_deref() == Some(email))
            .map(|(org_id, m)| MembershipRef {
                organization_id: org_id.clone(),
                membership: m.clone(),
            }))
    }

    async fn find_organization_by_owner(&self, owner_uid: &str) -> Result<Option<Organization>> {
        self.check_available()?;
        Ok(self
            .inner
            .organizations
            .read()
            .unwrap()
            .iter()
            .find(|o| o.owner_uid == owner_uid)
            .cloned())
    }
}
