use async_trait::async_trait;

use crate::directory::{Membership, MembershipRef, NewOrganization, Organization};
use crate::error::Result;

/// Storage boundary to the document store.
///
/// The contract mirrors what the store actually offers: create with a
/// generated id, create/overwrite at a known key, and a cross-collection
/// equality search whose results carry their parent organization id.
/// Implementations map their own failures to
/// `Error::UpstreamUnavailable { upstream: Directory }`.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Create an organization with a store-generated id and
    /// store-assigned creation timestamp.
    async fn create_organization(&self, new_org: &NewOrganization) -> Result<Organization>;

    /// Create or overwrite the membership keyed by `membership.uid` in the
    /// member subcollection of the given organization.
    async fn put_membership(&self, organization_id: &str, membership: &Membership) -> Result<()>;

    /// Search memberships across all organizations by uid.
    ///
    /// First match wins; the returned ref resolves the parent organization
    /// id from the membership's location.
    async fn find_membership_by_uid(&self, uid: &str) -> Result<Option<MembershipRef>>;

    /// Search memberships across all organizations by email.
    ///
    /// Legacy fallback only: records written before uid became the
    /// canonical key are findable by nothing else.
    async fn find_membership_by_email(&self, email: &str) -> Result<Option<MembershipRef>>;

    /// Find an organization by its owner uid.
    ///
    /// Used by the provisioning repair path to detect an organization
    /// whose owner membership write failed.
    async fn find_organization_by_owner(&self, owner_uid: &str) -> Result<Option<Organization>>;
}
