//! Caller identity entities: applications and their registered instances.

use serde::Serialize;
use sqlx::FromRow;

use conductor_core::types::{DbId, Timestamp};

/// A row from the `applications` table.
///
/// `secret_hash` is the SHA-256 hex digest of the application secret; the
/// plaintext secret never touches the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Application {
    pub id: DbId,
    pub login: String,
    #[serde(skip_serializing)]
    pub secret_hash: String,
    pub disabled: bool,
    pub created_at: Timestamp,
}

/// A row from the `application_instances` table.
///
/// One application may run many instances (devices, deployments); each is
/// identified by a caller-chosen UID unique within the application.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApplicationInstance {
    pub id: DbId,
    pub application_id: DbId,
    pub instance_uid: String,
    pub disabled: bool,
    pub created_at: Timestamp,
}
