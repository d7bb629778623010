//! HTTP surface: the authenticated read API, the health path, and the
//! trigger entry points for user-creation events.

mod routes;

pub use routes::{AppState, build_router};

use axum::http::Request;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Request-id maker: a UUID per request, propagated via `x-request-id`.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}
