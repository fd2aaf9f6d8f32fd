//! Route table, composed per resource.

pub mod health;
pub mod registry;

use axum::Router;

use crate::state::AppState;

/// All versioned API routes, mounted under `/1.0`.
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(registry::router())
}
