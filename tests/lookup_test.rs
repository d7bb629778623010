//! Integration tests for the hybrid lookup workflow.
//!
//! Verifies correctness and isolation of the membership-to-rows join, plus
//! the distinguishable failure modes for each store outage.

use std::sync::Arc;

use chrono::Utc;
use orgbridge::auth::IdentityClaims;
use orgbridge::directory::{InMemoryDirectory, MemberRole, Membership};
use orgbridge::lookup::HybridLookup;
use orgbridge::projects::InMemoryProjectStore;
use orgbridge::{Error, Upstream};
use serde_json::{Value, json};

fn claims(uid: &str, email: Option<&str>) -> IdentityClaims {
    IdentityClaims {
        uid: uid.to_string(),
        email: email.map(Into::into),
        name: None,
        exp: (Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    }
}

fn owner_membership(uid: &str, email: &str) -> Membership {
    Membership {
        uid: uid.into(),
        email: Some(email.into()),
        role: MemberRole::Owner,
        joined_at: Utc::now(),
    }
}

fn setup() -> (InMemoryDirectory, InMemoryProjectStore, HybridLookup) {
    let directory = InMemoryDirectory::new();
    let projects = InMemoryProjectStore::new();
    let lookup = HybridLookup::new(Arc::new(directory.clone()), Arc::new(projects.clone()));
    (directory, projects, lookup)
}

fn project_row(id: u32, org_id: &str, name: &str) -> Value {
    json!({"id": id, "organization_id": org_id, "name": name, "status": "active"})
}

#[tokio::test]
async fn returns_exactly_the_organizations_rows() {
    let (directory, projects, lookup) = setup();
    directory.insert_membership("org-a", owner_membership("u1", "a@x.com"));

    let expected = vec![
        project_row(1, "org-a", "alpha"),
        project_row(2, "org-a", "beta"),
        project_row(3, "org-a", "gamma"),
    ];
    for row in &expected {
        projects.insert_row("org-a", row.clone());
    }

    let rows = lookup
        .owned_records(&claims("u1", Some("a@x.com")))
        .await
        .unwrap();

    // Field-for-field, no more, no fewer.
    assert_eq!(rows, expected);
}

#[tokio::test]
async fn never_returns_another_organizations_rows() {
    let (directory, projects, lookup) = setup();
    directory.insert_membership("org-a", owner_membership("u1", "a@x.com"));
    directory.insert_membership("org-b", owner_membership("u2", "b@x.com"));

    projects.insert_row("org-a", project_row(1, "org-a", "a-only"));
    projects.insert_row("org-b", project_row(2, "org-b", "b-only"));
    projects.insert_row("org-b", project_row(3, "org-b", "b-only-too"));

    let rows_a = lookup
        .owned_records(&claims("u1", Some("a@x.com")))
        .await
        .unwrap();
    assert_eq!(rows_a.len(), 1);
    assert!(rows_a.iter().all(|r| r["organization_id"] == "org-a"));

    let rows_b = lookup
        .owned_records(&claims("u2", Some("b@x.com")))
        .await
        .unwrap();
    assert_eq!(rows_b.len(), 2);
    assert!(rows_b.iter().all(|r| r["organization_id"] == "org-b"));
}

#[tokio::test]
async fn organization_with_no_rows_yields_empty_array() {
    let (directory, _projects, lookup) = setup();
    directory.insert_membership("org-a", owner_membership("u1", "a@x.com"));

    let rows = lookup
        .owned_records(&claims("u1", Some("a@x.com")))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn legacy_membership_is_found_by_email_fallback() {
    let (directory, projects, lookup) = setup();
    // Record written before uid became the canonical key: its stored uid
    // is an old document id, only the email matches the caller.
    directory.insert_membership(
        "org-legacy",
        Membership {
            uid: "legacy-doc-7".into(),
            email: Some("old@x.com".into()),
            role: MemberRole::Member,
            joined_at: Utc::now(),
        },
    );
    projects.insert_row("org-legacy", project_row(1, "org-legacy", "relic"));

    let rows = lookup
        .owned_records(&claims("u9", Some("old@x.com")))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn uid_match_wins_over_email_fallback() {
    let (directory, projects, lookup) = setup();
    directory.insert_membership("org-shared-email", owner_membership("someone-else", "a@x.com"));
    directory.insert_membership("org-mine", owner_membership("u1", "a@x.com"));

    projects.insert_row("org-mine", project_row(1, "org-mine", "mine"));
    projects.insert_row("org-shared-email", project_row(2, "org-shared-email", "theirs"));

    let rows = lookup
        .owned_records(&claims("u1", Some("a@x.com")))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["organization_id"], "org-mine");
}

#[tokio::test]
async fn missing_email_claim_is_invalid_identity() {
    let (_directory, _projects, lookup) = setup();

    let err = lookup.owned_records(&claims("u1", None)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidIdentity(_)));

    let err = lookup
        .owned_records(&claims("u1", Some("")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidIdentity(_)));
}

#[tokio::test]
async fn unprovisioned_caller_is_organization_not_found() {
    let (_directory, _projects, lookup) = setup();

    let err = lookup
        .owned_records(&claims("u1", Some("a@x.com")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OrganizationNotFound(_)));
}

#[tokio::test]
async fn directory_outage_is_distinguishable() {
    let (directory, _projects, lookup) = setup();
    directory.insert_membership("org-a", owner_membership("u1", "a@x.com"));
    directory.set_unavailable(true);

    let err = lookup
        .owned_records(&claims("u1", Some("a@x.com")))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UpstreamUnavailable {
            upstream: Upstream::Directory,
            ..
        }
    ));
}

#[tokio::test]
async fn database_outage_is_distinguishable_and_returns_no_partial_rows() {
    let (directory, projects, lookup) = setup();
    directory.insert_membership("org-a", owner_membership("u1", "a@x.com"));
    projects.insert_row("org-a", project_row(1, "org-a", "alpha"));
    projects.set_unavailable(true);

    let err = lookup
        .owned_records(&claims("u1", Some("a@x.com")))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UpstreamUnavailable {
            upstream: Upstream::Database,
            ..
        }
    ));
}
