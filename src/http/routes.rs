use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{Caller, IdentityProvider};
use crate::error::Result;
use crate::http::MakeRequestUuid;
use crate::lookup::HybridLookup;
use crate::provisioning::{Provisioner, UserCreated};

/// Shared application state: the two workflows, constructed once at
/// startup over pooled store clients.
#[derive(Clone)]
pub struct AppState {
    pub provisioner: Arc<Provisioner>,
    pub lookup: Arc<HybridLookup>,
}

/// Build the service router.
///
/// The identity provider rides in request extensions so the [`Caller`]
/// extractor can verify bearer tokens without threading it through state.
pub fn build_router(state: AppState, identity: Arc<dyn IdentityProvider>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/projects", get(projects))
        .route("/healthz", get(healthz))
        .route("/hooks/identity/audit-log", post(audit_log_hook))
        .route("/hooks/identity/user-created", post(user_created_hook))
        .with_state(state)
        .layer(axum::Extension(identity))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Authenticated hello, mostly useful as a token smoke test.
async fn root(Caller(claims): Caller) -> Json<Value> {
    Json(json!({
        "hello": format!("authenticated user with UID: {}", claims.uid)
    }))
}

/// The hybrid read: membership in the document store resolves the
/// organization, whose rows are then fetched from the relational store.
async fn projects(
    State(state): State<AppState>,
    Caller(claims): Caller,
) -> Result<Json<Vec<Value>>> {
    let rows = state.lookup.owned_records(&claims).await?;
    Ok(Json(rows))
}

async fn healthz() -> &'static str {
    "OK"
}

/// Trigger entry point for the structured audit-log event format.
///
/// 204 for every business outcome (created, repaired, already
/// provisioned) so the delivery platform does not re-deliver; 400 for
/// malformed payloads (permanent, retry useless); 503 for upstream
/// failures so the platform retries.
async fn audit_log_hook(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<StatusCode> {
    let event = UserCreated::from_audit_log(&payload)?;
    state.provisioner.provision(event).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Trigger entry point for the simplified direct payload format.
async fn user_created_hook(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<StatusCode> {
    let event = UserCreated::from_direct(&payload)?;
    state.provisioner.provision(event).await?;
    Ok(StatusCode::NO_CONTENT)
}
