//! Append-only mirror of finished jobs, kept for billing and audit.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use conductor_core::types::{DbId, ServiceKind, Timestamp};

/// A row from the `completed_jobs` table.
///
/// Written exactly once when a job reaches its successful terminal state;
/// never updated afterwards.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CompletedJob {
    pub id: DbId,
    pub job_id: DbId,
    pub application_id: DbId,
    pub application_instance_id: DbId,
    pub job_uid: Uuid,
    pub request_type: ServiceKind,
    pub request_started_at: Timestamp,
    pub request_size: i32,
    pub request_data: String,
    pub request_ended_at: Option<Timestamp>,
    pub processing_time_ms: i64,
    pub recorded_at: Timestamp,
}
