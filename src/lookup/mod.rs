//! Hybrid lookup: resolve the caller's organization in the document store,
//! then fetch its owned rows from the relational store.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::auth::IdentityClaims;
use crate::directory::DirectoryStore;
use crate::error::{Error, Result};
use crate::projects::ProjectStore;

/// The hybrid lookup workflow.
///
/// The two reads are not transactional with each other and may observe
/// different points in time; acceptable because membership is effectively
/// immutable after provisioning.
pub struct HybridLookup {
    directory: Arc<dyn DirectoryStore>,
    projects: Arc<dyn ProjectStore>,
}

impl HybridLookup {
    pub fn new(directory: Arc<dyn DirectoryStore>, projects: Arc<dyn ProjectStore>) -> Self {
        Self {
            directory,
            projects,
        }
    }

    /// Return every owned record of the caller's organization, verbatim.
    ///
    /// Resolution is keyed on uid; email is searched only as a fallback
    /// for membership records that predate uid keys. Tokens without an
    /// email claim are rejected up front per the API contract.
    #[instrument(skip(self, claims), fields(uid = %claims.uid))]
    pub async fn owned_records(&self, claims: &IdentityClaims) -> Result<Vec<Value>> {
        let email = claims
            .email()
            .ok_or_else(|| Error::invalid_identity("email claim missing from token"))?;

        let membership = match self.directory.find_membership_by_uid(&claims.uid).await? {
            Some(found) => found,
            None => {
                debug!("no membership keyed by uid, trying legacy email search");
                self.directory
                    .find_membership_by_email(email)
                    .await?
                    .ok_or_else(|| Error::organization_not_found(claims.uid.clone()))?
            }
        };

        // The organization id rides on the membership's parent reference;
        // no extra document read.
        let organization_id = membership.organization_id;
        debug!(org_id = %organization_id, "resolved caller organization");

        self.projects.list_for_organization(&organization_id).await
    }
}
