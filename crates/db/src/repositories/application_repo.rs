//! Repository for the `applications` and `application_instances` tables.

use sqlx::PgPool;

use conductor_core::types::DbId;

use crate::models::application::{Application, ApplicationInstance};

/// Column list for `applications` queries.
const APP_COLUMNS: &str = "id, login, secret_hash, disabled, created_at";

/// Column list for `application_instances` queries.
const INSTANCE_COLUMNS: &str = "id, application_id, instance_uid, disabled, created_at";

/// Provides credential lookup and instance registration.
pub struct ApplicationRepo;

impl ApplicationRepo {
    /// Create an application. Used by provisioning and by tests.
    pub async fn create(
        pool: &PgPool,
        login: &str,
        secret_hash: &str,
    ) -> Result<Application, sqlx::Error> {
        let query = format!(
            "INSERT INTO applications (login, secret_hash) \
             VALUES ($1, $2) \
             RETURNING {APP_COLUMNS}"
        );
        sqlx::query_as::<_, Application>(&query)
            .bind(login)
            .bind(secret_hash)
            .fetch_one(pool)
            .await
    }

    /// Look up an enabled application by login and secret hash.
    ///
    /// Returns `None` on unknown login, wrong secret, or a disabled account;
    /// the three cases are deliberately indistinguishable to the caller.
    pub async fn verify_login(
        pool: &PgPool,
        login: &str,
        secret_hash: &str,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM applications \
             WHERE login = $1 AND secret_hash = $2 AND disabled = FALSE",
        )
        .bind(login)
        .bind(secret_hash)
        .fetch_optional(pool)
        .await
    }

    /// Find an enabled instance of an application by its caller-chosen UID.
    pub async fn find_instance(
        pool: &PgPool,
        application_id: DbId,
        instance_uid: &str,
    ) -> Result<Option<ApplicationInstance>, sqlx::Error> {
        let query = format!(
            "SELECT {INSTANCE_COLUMNS} FROM application_instances \
             WHERE application_id = $1 AND instance_uid = $2 AND disabled = FALSE"
        );
        sqlx::query_as::<_, ApplicationInstance>(&query)
            .bind(application_id)
            .bind(instance_uid)
            .fetch_optional(pool)
            .await
    }

    /// Return the instance id for `(application_id, instance_uid)`, creating
    /// the row first if this UID has not been seen before.
    pub async fn register_instance_if_needed(
        pool: &PgPool,
        application_id: DbId,
        instance_uid: &str,
    ) -> Result<DbId, sqlx::Error> {
        let query = format!(
            "INSERT INTO application_instances (application_id, instance_uid) \
             VALUES ($1, $2) \
             ON CONFLICT (application_id, instance_uid) DO NOTHING \
             RETURNING {INSTANCE_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, ApplicationInstance>(&query)
            .bind(application_id)
            .bind(instance_uid)
            .fetch_optional(pool)
            .await?;

        if let Some(instance) = inserted {
            return Ok(instance.id);
        }

        // Conflict path: the instance already existed.
        let existing = Self::find_instance(pool, application_id, instance_uid)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok(existing.id)
    }
}
