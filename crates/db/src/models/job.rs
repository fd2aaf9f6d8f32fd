//! Job entity models and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use conductor_core::types::{DbId, ServiceKind, Timestamp};

use super::status::StatusCode;

/// A row from the `jobs` table.
///
/// The owning `(application_id, application_instance_id)` pair is set once
/// at creation and is the authorization boundary for every later operation
/// on the job.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub application_id: DbId,
    pub application_instance_id: DbId,
    /// Client-correlatable identifier, assigned before the row exists.
    pub job_uid: Uuid,
    pub status: StatusCode,
    pub request_type: ServiceKind,
    pub request_started_at: Timestamp,
    pub request_size: i32,
    pub request_data: String,
    /// Upload slot reserved for this job, when the capability needs one.
    pub upload_id: Option<String>,
    pub request_ended_at: Option<Timestamp>,
    pub processing_time_ms: i64,
    pub result_data: Option<String>,
    pub result_retrieved: bool,
    /// Storage identifier stamped after the client's binary arrived.
    pub upload_identifier: Option<String>,
}

/// DTO for inserting a new job row.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub application_id: DbId,
    pub application_instance_id: DbId,
    pub job_uid: Uuid,
    pub status: StatusCode,
    pub request_type: ServiceKind,
    pub request_data: String,
    pub upload_id: Option<String>,
}

impl NewJob {
    /// Build a fresh job record for a request payload, with a new UID.
    pub fn from_request(
        application_id: DbId,
        application_instance_id: DbId,
        request_type: ServiceKind,
        request_data: String,
    ) -> Self {
        Self {
            application_id,
            application_instance_id,
            job_uid: Uuid::new_v4(),
            status: super::status::JobStatus::Created.code(),
            request_type,
            request_data,
            upload_id: None,
        }
    }
}
