//! Repository for the `service_snapshots` table.
//!
//! The registry's working set is persisted as a single JSON document; a
//! save replaces whatever snapshot came before it inside one transaction,
//! so a crash can never leave a mixed view behind.

use sqlx::PgPool;

use conductor_core::service::ServiceDescriptor;

/// Persists and restores the registry's full descriptor set.
pub struct SnapshotRepo;

impl SnapshotRepo {
    /// Replace the stored snapshot with `services`.
    pub async fn save(pool: &PgPool, services: &[ServiceDescriptor]) -> Result<(), sqlx::Error> {
        let json = serde_json::to_value(services)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM service_snapshots")
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO service_snapshots (services) VALUES ($1)")
            .bind(&json)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    /// Load the last-persisted snapshot, or `None` when none was ever saved.
    pub async fn load(pool: &PgPool) -> Result<Option<Vec<ServiceDescriptor>>, sqlx::Error> {
        let row = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT services FROM service_snapshots ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(pool)
        .await?;

        match row {
            Some(json) => {
                let services = serde_json::from_value(json)
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
                Ok(Some(services))
            }
            None => Ok(None),
        }
    }
}
