//! Firestore REST implementation of [`DirectoryStore`].
//!
//! Talks to the Firestore v1 REST surface directly: documents are typed
//! field maps, memberships live in a `members` subcollection under each
//! organization document, and the reverse lookup is a collection-group
//! `runQuery`. The parent organization id of a found membership comes from
//! the returned document name (`.../organizations/{id}/members/{uid}`),
//! which is the REST form of parent-reference traversal.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;

use crate::config::DirectoryConfig;
use crate::directory::{
    DirectoryStore, MemberRole, Membership, MembershipRef, NewOrganization, Organization,
};
use crate::error::{Error, Result, Upstream};

const ORGANIZATIONS: &str = "organizations";
const MEMBERS: &str = "members";

/// A Firestore document as returned by the REST API.
#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
    #[serde(rename = "createTime")]
    create_time: Option<DateTime<Utc>>,
}

/// One element of a `runQuery` response stream.
///
/// Elements without a `document` key carry only read metadata.
#[derive(Debug, Deserialize)]
struct QueryResult {
    document: Option<Document>,
}

/// Firestore-backed directory store.
#[derive(Clone)]
pub struct FirestoreDirectory {
    http: Client,
    endpoint: String,
    /// `projects/{project}/databases/{database}`
    parent: String,
    bearer_token: Option<SecretString>,
}

impl FirestoreDirectory {
    /// Build from configuration with a bounded request timeout.
    pub fn from_config(config: &DirectoryConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            parent: format!(
                "projects/{}/databases/{}",
                config.project_id, config.database_id
            ),
            bearer_token: config.bearer_token.as_ref().map(|t| t.0.clone()),
        })
    }

    fn documents_url(&self, path: &str) -> String {
        format!("{}/v1/{}/documents/{}", self.endpoint, self.parent, path)
    }

    fn run_query_url(&self) -> String {
        format!("{}/v1/{}/documents:runQuery", self.endpoint, self.parent)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| Error::unavailable(Upstream::Directory, e))
    }

    fn status_error(status: StatusCode, context: &str) -> Error {
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            Error::unavailable(
                Upstream::Directory,
                format!("{} returned status {}", context, status),
            )
        } else {
            Error::internal(format!("{} returned status {}", context, status))
        }
    }

    async fn run_query(&self, query: Value) -> Result<Vec<Document>> {
        let response = self
            .send(self.http.post(self.run_query_url()).json(&query))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, "runQuery"));
        }

        let results: Vec<QueryResult> = response
            .json()
            .await
            .map_err(|e| Error::internal(format!("malformed runQuery response: {}", e)))?;

        Ok(results.into_iter().filter_map(|r| r.document).collect())
    }

    async fn find_membership_by_field(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Option<MembershipRef>> {
        let query = json!({
            "structuredQuery": {
                "from": [{"collectionId": MEMBERS, "allDescendants": true}],
                "where": equality_filter(field, value),
                "limit": 1
            }
        });

        let documents = self.run_query(query).await?;
        documents.into_iter().next().map(decode_membership).transpose()
    }
}

#[async_trait]
impl DirectoryStore for FirestoreDirectory {
    async fn create_organization(&self, new_org: &NewOrganization) -> Result<Organization> {
        let body = json!({"fields": organization_fields(new_org)});

        let response = self
            .send(self.http.post(self.documents_url(ORGANIZATIONS)).json(&body))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, "create organization"));
        }

        let document: Document = response
            .json()
            .await
            .map_err(|e| Error::internal(format!("malformed create response: {}", e)))?;

        decode_organization(document)
    }

    async fn put_membership(&self, organization_id: &str, membership: &Membership) -> Result<()> {
        let path = format!(
            "{}/{}/{}/{}",
            ORGANIZATIONS, organization_id, MEMBERS, membership.uid
        );
        let body = json!({"fields": membership_fields(membership)});

        let response = self
            .send(self.http.patch(self.documents_url(&path)).json(&body))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, "put membership"));
        }

        Ok(())
    }

    async fn find_membership_by_uid(&self, uid: &str) -> Result<Option<MembershipRef>> {
        self.find_membership_by_field("uid", uid).await
    }

    async fn find_membership_by_email(&self, email: &str) -> Result<Option<MembershipRef>> {
        self.find_membership_by_field("email", email).await
    }

    async fn find_organization_by_owner(&self, owner_uid: &str) -> Result<Option<Organization>> {
        let query = json!({
            "structuredQuery": {
                "from": [{"collectionId": ORGANIZATIONS}],
                "where": equality_filter("owner_uid", owner_uid),
                "limit": 1
            }
        });

        let documents = self.run_query(query).await?;
        documents.into_iter().next().map(decode_organization).transpose()
    }
}

// ============================================================================
// Typed-value encoding and decoding
// ============================================================================

fn string_value(value: &str) -> Value {
    json!({"stringValue": value})
}

fn organization_fields(new_org: &NewOrganization) -> Value {
    json!({
        "name": string_value(&new_org.name),
        "owner_uid": string_value(&new_org.owner_uid),
    })
}

fn membership_fields(membership: &Membership) -> Value {
    let mut fields = Map::new();
    fields.insert("uid".into(), string_value(&membership.uid));
    if let Some(email) = &membership.email {
        fields.insert("email".into(), string_value(email));
    }
    fields.insert("role".into(), string_value(membership.role.as_str()));
    fields.insert(
        "joined_at".into(),
        json!({"timestampValue": membership.joined_at.to_rfc3339()}),
    );
    Value::Object(fields)
}

fn field_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key)?.get("stringValue")?.as_str()
}

fn field_timestamp(fields: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let raw = fields.get(key)?.get("timestampValue")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn equality_filter(field: &str, value: &str) -> Value {
    json!({
        "fieldFilter": {
            "field": {"fieldPath": field},
            "op": "EQUAL",
            "value": string_value(value)
        }
    })
}

/// Last path segment of a document name.
fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Extract the parent organization id from a membership document name:
/// `.../documents/organizations/{org_id}/members/{uid}`.
fn member_parent_organization_id(name: &str) -> Option<&str> {
    let segments: Vec<&str> = name.split('/').collect();
    segments
        .windows(3)
        .find(|w| w[0] == ORGANIZATIONS && w[2] == MEMBERS)
        .map(|w| w[1])
}

fn decode_organization(document: Document) -> Result<Organization> {
    let id = document_id(&document.name).to_string();
    let name = field_str(&document.fields, "name")
        .ok_or_else(|| Error::internal(format!("organization {} missing name field", id)))?
        .to_string();
    let owner_uid = field_str(&document.fields, "owner_uid")
        .ok_or_else(|| Error::internal(format!("organization {} missing owner_uid field", id)))?
        .to_string();

    Ok(Organization {
        id,
        name,
        owner_uid,
        // The store stamps createTime on write; it is the authoritative
        // creation timestamp.
        created_at: document.create_time.unwrap_or_else(Utc::now),
    })
}

fn decode_membership(document: Document) -> Result<MembershipRef> {
    let organization_id = member_parent_organization_id(&document.name)
        .ok_or_else(|| {
            Error::internal(format!(
                "membership document has unexpected path: {}",
                document.name
            ))
        })?
        .to_string();

    let uid = field_str(&document.fields, "uid")
        .map(str::to_string)
        // Records written before uid fields were keyed by document id only.
        .unwrap_or_else(|| document_id(&document.name).to_string());

    let membership = Membership {
        uid,
        email: field_str(&document.fields, "email").map(str::to_string),
        role: field_str(&document.fields, "role")
            .and_then(|r| r.parse().ok())
            .unwrap_or(MemberRole::Member),
        joined_at: field_timestamp(&document.fields, "joined_at")
            .or(document.create_time)
            .unwrap_or_else(Utc::now),
    };

    Ok(MembershipRef {
        organization_id,
        membership,
    })
}
