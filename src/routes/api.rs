//! Plain HTTP route configuration

use axum::{Router, routing::get};

use crate::handlers::api::health_check;
use crate::state::AppState;
use std::sync::Arc;

/// Create the HTTP router
///
/// # Endpoint
///
/// `GET /health` - liveness check, returns `200 ok` regardless of the
/// upstream connection state
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}
