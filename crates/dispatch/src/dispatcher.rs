//! Job lifecycle operations.
//!
//! Every operation loads its job fresh from the database and persists any
//! change before answering; nothing about a job survives in memory between
//! calls. The owning `(application_id, application_instance_id)` pair set
//! at creation is the sole authorization boundary for everything that
//! follows.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use conductor_core::error::CoreError;
use conductor_core::types::{DbId, ServiceKind, Timestamp};
use conductor_db::models::job::{Job, NewJob};
use conductor_db::models::status::JobStatus;
use conductor_db::repositories::{CompletedJobRepo, JobRepo};

use crate::backend::{BackendError, ExecBackendClient, ExecJobRequest, JobReply};
use crate::capabilities::CapabilityCache;
use crate::storage::StorageClient;

/// Service-type selector expected inside every request payload.
#[derive(Debug, Deserialize)]
struct ServiceSelector {
    service_type: ServiceKind,
}

/// Upload-slot handshake returned instead of a result when the capability
/// needs a client-supplied binary.
#[derive(Debug, Clone, Serialize)]
pub struct UploadInfo {
    pub upload_id: String,
    #[serde(rename = "upload_until")]
    pub upload_until: Timestamp,
}

/// What `create_job` hands back, by capability class.
#[derive(Debug)]
pub enum CreateJobOutcome {
    /// The job is parked until the binary arrives on the slot.
    AwaitingUpload { job: Job, upload: UploadInfo },
    /// Asynchronous capability: the backend's immediate answer, passed
    /// through. The caller polls for progress from here on.
    Accepted {
        backend_status: u16,
        reply: Option<JobReply>,
    },
    /// Synchronous capability: the finished result payload.
    Completed {
        backend_status: u16,
        payload: String,
    },
}

/// The job dispatcher.
pub struct Dispatcher {
    pool: PgPool,
    capabilities: Arc<CapabilityCache>,
    backend: ExecBackendClient,
    storage: StorageClient,
}

impl Dispatcher {
    pub fn new(
        pool: PgPool,
        capabilities: Arc<CapabilityCache>,
        backend_base_url: &str,
        storage_base_url: &str,
    ) -> Self {
        Self {
            pool,
            capabilities,
            backend: ExecBackendClient::new(backend_base_url),
            storage: StorageClient::new(storage_base_url),
        }
    }

    /// Classify a work request and create its job record.
    ///
    /// Branches on the capability's declared requirements, in this order:
    /// requires-upload, asynchronous, synchronous. A persistence failure
    /// at creation aborts before any backend contact.
    pub async fn create_job(
        &self,
        application_id: DbId,
        application_instance_id: DbId,
        request_payload: &str,
    ) -> Result<CreateJobOutcome, CoreError> {
        let selector: ServiceSelector = serde_json::from_str(request_payload)
            .map_err(|e| CoreError::BadInput(format!("no readable service selector: {e}")))?;

        let view = self.capabilities.view();
        let Some(capability) = view.capabilities.get(selector.service_type).cloned() else {
            return Err(CoreError::CapabilityUnavailable(selector.service_type));
        };

        tracing::info!(
            application_id,
            service_type = selector.service_type,
            "Creating job"
        );

        let mut new_job = NewJob::from_request(
            application_id,
            application_instance_id,
            selector.service_type,
            request_payload.to_string(),
        );

        if capability.requires_upload {
            // Reserve the slot first; without one the job cannot proceed.
            let upload_id = self.storage.new_upload_id().await?;
            new_job.status = JobStatus::WaitingForUpload.code();
            new_job.upload_id = Some(upload_id.clone());
            let job = JobRepo::create(&self.pool, &new_job).await.map_err(persistence)?;

            let upload = UploadInfo {
                upload_id,
                upload_until: Utc::now() + chrono::Duration::hours(1),
            };
            return Ok(CreateJobOutcome::AwaitingUpload { job, upload });
        }

        let job = JobRepo::create(&self.pool, &new_job).await.map_err(persistence)?;

        if capability.is_async {
            let (backend_status, reply) = self.forward(&job).await?;
            return Ok(CreateJobOutcome::Accepted {
                backend_status,
                reply,
            });
        }

        // Synchronous: block for the result, then close the job out.
        let request = Self::backend_request(&job);
        let (backend_status, payload) =
            self.backend.submit_raw(&request).await.map_err(upstream)?;
        self.record_completion(job.id).await?;

        Ok(CreateJobOutcome::Completed {
            backend_status,
            payload,
        })
    }

    /// The client's binary arrived on an upload slot: stamp the storage
    /// identifier onto the parked job and hand it back for execution.
    pub async fn on_upload_complete(
        &self,
        upload_id: &str,
        storage_identifier: &str,
    ) -> Result<Job, CoreError> {
        let mut job = JobRepo::find_by_upload_id(&self.pool, upload_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| CoreError::NotFound {
                entity: "upload slot",
                id: upload_id.to_string(),
            })?;

        JobRepo::set_upload_identifier(&self.pool, job.id, storage_identifier)
            .await
            .map_err(persistence)?;
        job.upload_identifier = Some(storage_identifier.to_string());
        Ok(job)
    }

    /// Forward a job to the execution backend.
    ///
    /// The backend's HTTP status is part of the answer: 200/202 carry a
    /// decoded reply, anything else is surfaced as-is with no reply.
    pub async fn forward(&self, job: &Job) -> Result<(u16, Option<JobReply>), CoreError> {
        let request = Self::backend_request(job);
        self.backend.submit(&request).await.map_err(upstream)
    }

    /// Poll the backend for a job's status, persist it, and relay it.
    pub async fn get_status(
        &self,
        application_id: DbId,
        application_instance_id: DbId,
        job_id: DbId,
    ) -> Result<(u16, JobReply), CoreError> {
        self.load_owned_job(application_id, application_instance_id, job_id)
            .await?;

        let (backend_status, reply) = self.backend.status(job_id).await.map_err(upstream)?;
        match reply {
            Some(reply) => {
                JobRepo::update_status(&self.pool, job_id, reply.job_status)
                    .await
                    .map_err(persistence)?;
                Ok((backend_status, reply))
            }
            // The backend refused the status call; relay its verdict with
            // an error record rather than inventing a job state.
            None => Ok((
                backend_status,
                JobReply {
                    job_id: -1,
                    job_status: JobStatus::Error.code(),
                    payload: String::new(),
                },
            )),
        }
    }

    /// Fetch a finished job's result, close the job out, and relay the
    /// raw payload.
    pub async fn get_result(
        &self,
        application_id: DbId,
        application_instance_id: DbId,
        job_id: DbId,
    ) -> Result<(u16, Option<String>), CoreError> {
        self.load_owned_job(application_id, application_instance_id, job_id)
            .await?;

        let (backend_status, payload) = self.backend.result(job_id).await.map_err(upstream)?;
        let Some(payload) = payload else {
            return Ok((backend_status, None));
        };

        self.record_completion(job_id).await?;
        Ok((backend_status, Some(payload)))
    }

    /// The storage collaborator, for callers that need the admission
    /// check (declared size and media type) before streaming a binary.
    /// Slot ownership is checked separately via [`can_accept_upload`].
    ///
    /// [`can_accept_upload`]: Dispatcher::can_accept_upload
    pub fn storage(&self) -> &StorageClient {
        &self.storage
    }

    /// Whether a pending binary upload on this slot is permitted for the
    /// calling identity. Only the slot's owner may feed it.
    pub async fn can_accept_upload(
        &self,
        application_id: DbId,
        application_instance_id: DbId,
        upload_id: &str,
    ) -> Result<bool, CoreError> {
        let job = JobRepo::find_by_upload_id(&self.pool, upload_id)
            .await
            .map_err(persistence)?;
        Ok(matches!(
            job,
            Some(job)
                if job.application_id == application_id
                    && job.application_instance_id == application_instance_id
        ))
    }

    /// Reserved lifecycle operation: reclaiming a job's record and any
    /// stored binary. TODO: wire this to storage deletion once the storage
    /// collaborator exposes a delete contract for slot-bound blobs.
    pub async fn delete_job(
        &self,
        _application_id: DbId,
        _application_instance_id: DbId,
        _job_id: DbId,
    ) -> Result<(), CoreError> {
        Ok(())
    }

    /// Reserved lifecycle operation: expiring jobs whose upload slot was
    /// never fed. Returns the number of jobs expired.
    pub async fn expire_jobs(&self) -> Result<u64, CoreError> {
        Ok(0)
    }

    /// Load a job and enforce that the caller owns it.
    async fn load_owned_job(
        &self,
        application_id: DbId,
        application_instance_id: DbId,
        job_id: DbId,
    ) -> Result<Job, CoreError> {
        let job = JobRepo::find_by_id(&self.pool, job_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| CoreError::NotFound {
                entity: "job",
                id: job_id.to_string(),
            })?;

        if job.application_id != application_id
            || job.application_instance_id != application_instance_id
        {
            return Err(CoreError::Unauthorized(
                "job belongs to a different application".to_string(),
            ));
        }
        Ok(job)
    }

    /// Close a job out: terminal status, result retrieved, and the
    /// write-once billing record.
    ///
    /// Safe to reach more than once; the status column only moves
    /// forward and the billing insert is a no-op when the job is already
    /// on record, so retrieving a result twice cannot bill twice.
    async fn record_completion(&self, job_id: DbId) -> Result<(), CoreError> {
        JobRepo::complete(&self.pool, job_id).await.map_err(persistence)?;
        JobRepo::mark_result_retrieved(&self.pool, job_id)
            .await
            .map_err(persistence)?;

        let job = JobRepo::find_by_id(&self.pool, job_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| CoreError::Persistence("completed job row vanished".to_string()))?;
        let billed = CompletedJobRepo::record(&self.pool, &job)
            .await
            .map_err(persistence)?;
        if billed.is_some() {
            tracing::info!(job_id, "Job completed and billed");
        }
        Ok(())
    }

    fn backend_request(job: &Job) -> ExecJobRequest {
        ExecJobRequest {
            application_id: job.application_id,
            application_instance_id: job.application_instance_id,
            job_id: job.id,
            service_type: job.request_type,
            upload_identifier: job.upload_identifier.clone().unwrap_or_default(),
            payload: job.request_data.clone(),
        }
    }
}

fn persistence(e: sqlx::Error) -> CoreError {
    CoreError::Persistence(e.to_string())
}

fn upstream(e: BackendError) -> CoreError {
    CoreError::Upstream(e.to_string())
}
