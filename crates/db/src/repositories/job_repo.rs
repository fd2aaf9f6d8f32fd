//! Repository for the `jobs` table.
//!
//! Uses `JobStatus` from `models::status` for all status transitions; the
//! status column only ever moves to a strictly greater code, so a job can
//! never re-enter an earlier lifecycle state.

use sqlx::PgPool;

use conductor_core::types::DbId;

use crate::models::job::{Job, NewJob};
use crate::models::status::{JobStatus, StatusCode};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, application_id, application_instance_id, job_uid, status, \
    request_type, request_started_at, request_size, request_data, upload_id, \
    request_ended_at, processing_time_ms, result_data, result_retrieved, \
    upload_identifier";

/// Provides CRUD operations for job records.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new job row and return it with its assigned id.
    pub async fn create(pool: &PgPool, input: &NewJob) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (application_id, application_instance_id, job_uid, status, \
                 request_type, request_size, request_data, upload_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.application_id)
            .bind(input.application_instance_id)
            .bind(input.job_uid)
            .bind(input.status)
            .bind(input.request_type)
            .bind(input.request_data.len() as i32)
            .bind(&input.request_data)
            .bind(&input.upload_id)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the job parked on an upload slot.
    pub async fn find_by_upload_id(
        pool: &PgPool,
        upload_id: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE upload_id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(upload_id)
            .fetch_optional(pool)
            .await
    }

    /// Advance a job's status.
    ///
    /// The update only applies when the new code is strictly greater than
    /// the stored one, so stale or out-of-order writes cannot move a job
    /// backward. Returns `true` when a row was actually updated.
    pub async fn update_status(
        pool: &PgPool,
        job_id: DbId,
        status: StatusCode,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE jobs SET status = $2 WHERE id = $1 AND status < $2")
            .bind(job_id)
            .bind(status)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Stamp the storage identifier onto a job after its upload arrived.
    pub async fn set_upload_identifier(
        pool: &PgPool,
        job_id: DbId,
        upload_identifier: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE jobs SET upload_identifier = $2 WHERE id = $1")
            .bind(job_id)
            .bind(upload_identifier)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a job done: set the terminal status, stamp the end time, and
    /// compute the processing time from `request_started_at`.
    pub async fn complete(pool: &PgPool, job_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status = $2, request_ended_at = NOW(), \
                 processing_time_ms = \
                     (EXTRACT(EPOCH FROM NOW() - request_started_at) * 1000)::BIGINT \
             WHERE id = $1 AND status < $2",
        )
        .bind(job_id)
        .bind(JobStatus::Done.code())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record that the caller has fetched the job's result.
    pub async fn mark_result_retrieved(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE jobs SET result_retrieved = TRUE WHERE id = $1")
            .bind(job_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
