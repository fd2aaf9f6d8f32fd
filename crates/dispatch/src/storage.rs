//! HTTP client for the storage collaborator's upload-slot endpoints.
//!
//! The dispatcher only needs two things from storage: a fresh opaque slot
//! id to park an upload-requiring job on, and a yes/no on whether a
//! pending upload of a given size and media type may proceed.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use conductor_core::error::CoreError;

/// Storage calls are small and local; anything slower than this is down.
const STORAGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct NewUploadReply {
    upload_id: String,
}

/// Body of `POST /can-upload-data`.
#[derive(Debug, Serialize)]
struct UploadCheck<'a> {
    upload_id: &'a str,
    data_size: i64,
    mime_type: &'a str,
}

/// HTTP client for the storage collaborator.
pub struct StorageClient {
    client: reqwest::Client,
    base_url: String,
}

impl StorageClient {
    /// `base_url` is the storage server's versioned base, e.g.
    /// `http://ss-host:8900/1.0`.
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(STORAGE_TIMEOUT)
            .build()
            .expect("storage HTTP client must build");
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    /// Reserve a fresh upload slot. The returned id is opaque; the
    /// dispatcher imposes nothing on it beyond uniqueness.
    pub async fn new_upload_id(&self) -> Result<String, CoreError> {
        let response = self
            .client
            .post(format!("{}/new-upload-id", self.base_url))
            .send()
            .await
            .map_err(|e| CoreError::Upstream(format!("storage unreachable: {e}")))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(CoreError::Upstream(format!(
                "storage answered {} for a new upload id",
                response.status()
            )));
        }

        let reply: NewUploadReply = response
            .json()
            .await
            .map_err(|e| CoreError::Upstream(format!("storage sent a malformed reply: {e}")))?;
        Ok(reply.upload_id)
    }

    /// Ask storage whether an upload of `data_size` bytes with the given
    /// media type may proceed on this slot. Unreachable storage counts as
    /// a refusal.
    pub async fn can_upload(&self, upload_id: &str, data_size: i64, mime_type: &str) -> bool {
        let check = UploadCheck {
            upload_id,
            data_size,
            mime_type,
        };
        match self
            .client
            .post(format!("{}/can-upload-data", self.base_url))
            .json(&check)
            .send()
            .await
        {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                tracing::warn!(error = %e, upload_id, "Upload permission check failed");
                false
            }
        }
    }
}
