use crate::types::ServiceKind;

/// Domain error taxonomy shared by the registry and the dispatcher.
///
/// Every variant corresponds to one caller-visible outcome class; the api
/// crate owns the mapping to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The request payload or selector could not be parsed.
    #[error("Bad input: {0}")]
    BadInput(String),

    /// Token invalid/expired, or the caller does not own the record.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No live execution backend currently serves the requested type.
    #[error("No live service for type {0}")]
    CapabilityUnavailable(ServiceKind),

    /// Unknown job or upload slot.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// The execution backend or the registry could not be reached.
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// A record could not be written or read.
    #[error("Persistence failure: {0}")]
    Persistence(String),
}
