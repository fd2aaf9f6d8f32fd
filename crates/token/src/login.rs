//! Credential login: exchange an application's login/secret for a token.
//!
//! Secrets are compared by SHA-256 hex digest; the plaintext secret is
//! hashed on arrival and never stored. A previously unseen instance UID is
//! registered on the fly, so a new device of a known application can log in
//! without a separate provisioning step.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use conductor_db::repositories::ApplicationRepo;

use crate::authority::{IssuedToken, TokenAuthority};

/// Request body for credential login.
#[derive(Debug, Deserialize)]
pub struct AuthenticationRequest {
    pub application_login: String,
    pub application_secret: String,
    pub application_instance_uid: String,
}

/// Compute the SHA-256 hex digest of an application secret.
///
/// Used both when provisioning an application and when verifying a login.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Verify credentials and mint a token for the caller's identity pair.
///
/// Returns `Ok(None)` when the login/secret pair does not match an enabled
/// application; the caller cannot tell whether the login or the secret was
/// wrong. Database errors surface as-is.
pub async fn authenticate(
    pool: &PgPool,
    authority: &TokenAuthority,
    request: &AuthenticationRequest,
) -> Result<Option<IssuedToken>, sqlx::Error> {
    let secret_hash = hash_secret(&request.application_secret);

    let Some(application_id) =
        ApplicationRepo::verify_login(pool, &request.application_login, &secret_hash).await?
    else {
        tracing::warn!(login = %request.application_login, "Login rejected");
        return Ok(None);
    };

    let instance_id = ApplicationRepo::register_instance_if_needed(
        pool,
        application_id,
        &request.application_instance_uid,
    )
    .await?;

    tracing::info!(application_id, instance_id, "Login accepted, issuing token");
    Ok(Some(authority.issue(application_id, instance_id)))
}
