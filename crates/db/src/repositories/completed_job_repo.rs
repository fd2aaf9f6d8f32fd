//! Repository for the `completed_jobs` table.
//!
//! Rows are written once when a job finishes and mirror the job record for
//! billing/audit; nothing in the platform updates them afterwards.

use sqlx::PgPool;

use conductor_core::types::DbId;

use crate::models::completed_job::CompletedJob;
use crate::models::job::Job;

/// Column list for `completed_jobs` queries.
const COLUMNS: &str = "\
    id, job_id, application_id, application_instance_id, job_uid, \
    request_type, request_started_at, request_size, request_data, \
    request_ended_at, processing_time_ms, recorded_at";

/// Provides the write-once billing mirror for finished jobs.
pub struct CompletedJobRepo;

impl CompletedJobRepo {
    /// Record a finished job.
    ///
    /// Write-once: a job that already has a billing record is left alone
    /// and `None` is returned, so retried completions cannot bill twice.
    pub async fn record(pool: &PgPool, job: &Job) -> Result<Option<CompletedJob>, sqlx::Error> {
        let query = format!(
            "INSERT INTO completed_jobs \
                 (job_id, application_id, application_instance_id, job_uid, \
                  request_type, request_started_at, request_size, request_data, \
                  request_ended_at, processing_time_ms) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (job_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CompletedJob>(&query)
            .bind(job.id)
            .bind(job.application_id)
            .bind(job.application_instance_id)
            .bind(job.job_uid)
            .bind(job.request_type)
            .bind(job.request_started_at)
            .bind(job.request_size)
            .bind(&job.request_data)
            .bind(job.request_ended_at)
            .bind(job.processing_time_ms)
            .fetch_optional(pool)
            .await
    }

    /// Find the billing record for a job, if one was written.
    pub async fn find_by_job_id(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Option<CompletedJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM completed_jobs WHERE job_id = $1");
        sqlx::query_as::<_, CompletedJob>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }
}
