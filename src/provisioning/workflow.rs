use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::auth::{IdentityProvider, UserRecord};
use crate::directory::{DirectoryStore, MemberRole, Membership, NewOrganization};
use crate::error::Result;
use crate::provisioning::UserCreated;

/// What a provisioning invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new organization and owner membership were created.
    Created { organization_id: String },
    /// An orphaned organization (owner membership write previously failed)
    /// was completed by attaching the missing membership.
    Repaired { organization_id: String },
    /// A membership already existed; nothing was written.
    AlreadyProvisioned { organization_id: String },
}

impl Outcome {
    #[must_use]
    pub fn organization_id(&self) -> &str {
        match self {
            Self::Created { organization_id }
            | Self::Repaired { organization_id }
            | Self::AlreadyProvisioned { organization_id } => organization_id,
        }
    }
}

/// The signup provisioning workflow.
///
/// Stateless per invocation; holds shared store clients only. The trigger
/// is delivered at least once, so the workflow is a check-then-complete
/// saga keyed on the uid:
///
/// 1. a Membership for the uid anywhere → already provisioned, no writes;
/// 2. an Organization owned by the uid without a Membership → a previous
///    invocation died between the two writes; attach the missing owner
///    Membership to it rather than creating a duplicate;
/// 3. otherwise create the Organization, then its owner Membership.
///
/// The check-then-write sequence is not atomic against a concurrent
/// duplicate delivery of the same uid; that narrow race is accepted
/// rather than closed with a cross-collection transaction.
pub struct Provisioner {
    directory: Arc<dyn DirectoryStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl Provisioner {
    pub fn new(directory: Arc<dyn DirectoryStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            directory,
            identity,
        }
    }

    /// Run the workflow for one normalized event.
    ///
    /// Errors are terminal for this invocation: no local retries, no
    /// partial-write cleanup. Redelivery re-enters through the repair
    /// logic above.
    #[instrument(skip(self, event), fields(uid = %event.uid))]
    pub async fn provision(&self, event: UserCreated) -> Result<Outcome> {
        // Idempotency check first, keyed on membership existence. Also
        // skips the provider round-trip on redelivery of a completed
        // signup.
        if let Some(existing) = self.directory.find_membership_by_uid(&event.uid).await? {
            info!(
                uid = %event.uid,
                org_id = %existing.organization_id,
                "already provisioned"
            );
            return Ok(Outcome::AlreadyProvisioned {
                organization_id: existing.organization_id,
            });
        }

        // Canonical record is authoritative over payload-supplied email,
        // which may be stale or absent depending on the trigger type.
        let user = self.identity.fetch_user(&event.uid).await?;

        let membership = Membership {
            uid: user.uid.clone(),
            email: user.email.clone().or(event.email),
            role: MemberRole::Owner,
            joined_at: Utc::now(),
        };

        // Repair path: the organization write succeeded on a previous
        // delivery but the membership write did not.
        if let Some(orphan) = self
            .directory
            .find_organization_by_owner(&event.uid)
            .await?
        {
            debug!(org_id = %orphan.id, "found organization without owner membership");
            self.directory.put_membership(&orphan.id, &membership).await?;
            info!(
                uid = %event.uid,
                org_id = %orphan.id,
                "attached owner membership to existing organization"
            );
            return Ok(Outcome::Repaired {
                organization_id: orphan.id,
            });
        }

        let org = self
            .directory
            .create_organization(&NewOrganization {
                name: organization_name(&user),
                owner_uid: user.uid.clone(),
            })
            .await?;

        self.directory.put_membership(&org.id, &membership).await?;

        info!(
            uid = %event.uid,
            org_id = %org.id,
            org_name = %org.name,
            "organization provisioned"
        );

        Ok(Outcome::Created {
            organization_id: org.id,
        })
    }
}

/// Default organization name, derived from the canonical user record.
fn organization_name(user: &UserRecord) -> String {
    if let Some(email) = user.email.as_deref().filter(|e| !e.is_empty()) {
        format!("{}'s Organization", email)
    } else if let Some(name) = user.display_name.as_deref().filter(|n| !n.is_empty()) {
        format!("{}'s Organization", name)
    } else {
        format!("Organization {}", user.uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(uid: &str, email: Option<&str>, display_name: Option<&str>) -> UserRecord {
        UserRecord {
            uid: uid.into(),
            email: email.map(Into::into),
            display_name: display_name.map(Into::into),
            created_at: None,
        }
    }

    #[test]
    fn name_prefers_email() {
        let name = organization_name(&user("u1", Some("a@x.com"), Some("Ada")));
        assert_eq!(name, "a@x.com's Organization");
    }

    #[test]
    fn name_falls_back_to_display_name_then_uid() {
        assert_eq!(
            organization_name(&user("u1", None, Some("Ada"))),
            "Ada's Organization"
        );
        assert_eq!(organization_name(&user("u1", None, None)), "Organization u1");
        assert_eq!(
            organization_name(&user("u1", Some(""), None)),
            "Organization u1"
        );
    }
}
