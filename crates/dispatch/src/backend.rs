//! HTTP client for the execution backend's job endpoints.
//!
//! The backend speaks three POST endpoints under a versioned base URL:
//! `/new-job`, `/status`, and `/result`. Its HTTP status codes are part of
//! the contract and are passed through to the dispatcher's caller; only a
//! transport failure is turned into an error here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use conductor_core::types::{DbId, ServiceKind};

/// Forward/status calls give the backend this long to answer. Synchronous
/// capabilities block the caller for the full execution, so this is the
/// ceiling on job runtime, not a network-level nicety.
const BACKEND_TIMEOUT: Duration = Duration::from_secs(60);

/// Body of `POST /new-job`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecJobRequest {
    pub application_id: DbId,
    pub application_instance_id: DbId,
    pub job_id: DbId,
    #[serde(rename = "job_type")]
    pub service_type: ServiceKind,
    #[serde(rename = "upload_identifier")]
    pub upload_identifier: String,
    pub payload: String,
}

/// Backend's answer on `/new-job` (async) and `/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReply {
    pub job_id: DbId,
    pub job_status: i16,
    pub payload: String,
}

/// Errors from the execution-backend HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request itself failed (connect, timeout, DNS).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend accepted the call but sent an undecodable body.
    #[error("Execution backend sent a malformed reply")]
    BadReply,
}

/// HTTP client for one execution backend.
pub struct ExecBackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl ExecBackendClient {
    /// `base_url` is the backend's versioned base, e.g.
    /// `http://job-host:8800/1.0`.
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(BACKEND_TIMEOUT)
            .build()
            .expect("backend HTTP client must build");
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    /// Submit a job and decode the backend's reply.
    ///
    /// On 200/202 the body is a [`JobReply`]; any other status is passed
    /// through with no reply attached.
    pub async fn submit(
        &self,
        request: &ExecJobRequest,
    ) -> Result<(u16, Option<JobReply>), BackendError> {
        let response = self
            .client
            .post(format!("{}/new-job", self.base_url))
            .json(request)
            .send()
            .await?;
        Self::decode_reply(response).await
    }

    /// Submit a synchronous job and hand back the raw result body.
    ///
    /// The body is returned whatever the status was; the caller relays
    /// both untouched.
    pub async fn submit_raw(&self, request: &ExecJobRequest) -> Result<(u16, String), BackendError> {
        let response = self
            .client
            .post(format!("{}/new-job", self.base_url))
            .json(request)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|_| BackendError::BadReply)?;
        Ok((status, body))
    }

    /// Poll the backend for a job's current status.
    pub async fn status(&self, job_id: DbId) -> Result<(u16, Option<JobReply>), BackendError> {
        let response = self
            .client
            .post(format!("{}/status", self.base_url))
            .json(&serde_json::json!({ "job_id": job_id }))
            .send()
            .await?;
        Self::decode_reply(response).await
    }

    /// Fetch a finished job's raw result bytes. `None` unless the backend
    /// answered 200.
    pub async fn result(&self, job_id: DbId) -> Result<(u16, Option<String>), BackendError> {
        let response = self
            .client
            .post(format!("{}/result", self.base_url))
            .json(&serde_json::json!({ "job_id": job_id }))
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            return Ok((status, None));
        }
        let body = response.text().await.map_err(|_| BackendError::BadReply)?;
        Ok((status, Some(body)))
    }

    async fn decode_reply(
        response: reqwest::Response,
    ) -> Result<(u16, Option<JobReply>), BackendError> {
        let status = response.status().as_u16();
        if status != 200 && status != 202 {
            return Ok((status, None));
        }
        let reply = response.json().await.map_err(|_| BackendError::BadReply)?;
        Ok((status, Some(reply)))
    }
}
