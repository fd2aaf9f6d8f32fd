//! Route definitions for the registry resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::registry;
use crate::state::AppState;

/// Routes mounted at the versioned root.
///
/// ```text
/// POST /register-service    -> register_service
/// GET  /available-services  -> available_services
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register-service", post(registry::register_service))
        .route("/available-services", get(registry::available_services))
}
