//! Handlers for the registry resource (registration and discovery).

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use conductor_core::service::ServiceDescriptor;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /1.0/register-service
///
/// Merge a descriptor into the working set, replacing any prior entry for
/// the same `(server, port)`. Any well-formed descriptor is accepted;
/// malformed JSON is a 400.
pub async fn register_service(
    State(state): State<AppState>,
    payload: Result<Json<ServiceDescriptor>, JsonRejection>,
) -> AppResult<()> {
    let Json(descriptor) = payload
        .map_err(|e| AppError::BadRequest(format!("descriptor did not parse: {e}")))?;

    state.registry.register(descriptor).await?;
    Ok(())
}

/// GET /1.0/available-services
///
/// The current snapshot, verbatim. No liveness probe happens inline; the
/// sweep keeps the set fresh.
pub async fn available_services(State(state): State<AppState>) -> Json<Vec<ServiceDescriptor>> {
    Json(state.registry.services())
}
