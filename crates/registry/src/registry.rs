//! Registry operations: registration, listing, bootstrap, and the
//! liveness reconciliation pass.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use conductor_core::service::{merge_descriptor, ServiceDescriptor};
use conductor_db::repositories::SnapshotRepo;

use crate::store::{RegistrySnapshot, ServiceStore};

/// Heartbeat probes give an instance this long to answer.
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(5);

/// The service registry.
///
/// Owns the in-memory snapshot and its database mirror. An empty registry
/// is a valid state; lookups that find nothing are a normal condition for
/// callers, not a fault.
pub struct Registry {
    pool: PgPool,
    store: ServiceStore,
    http: reqwest::Client,
}

impl Registry {
    pub fn new(pool: PgPool) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HEARTBEAT_TIMEOUT)
            .build()
            .expect("heartbeat HTTP client must build");
        Self {
            pool,
            store: ServiceStore::new(),
            http,
        }
    }

    /// Load the last persisted snapshot (empty if none was ever saved) and
    /// immediately verify it with one liveness pass, so a restart does not
    /// advertise instances that died while we were down.
    pub async fn bootstrap(&self) -> Result<(), sqlx::Error> {
        let services = SnapshotRepo::load(&self.pool).await?.unwrap_or_default();
        tracing::info!(count = services.len(), "Registry bootstrapped from snapshot");
        self.store.replace(services);
        self.reconcile_liveness().await?;
        Ok(())
    }

    /// Merge a newly registered descriptor into the working set.
    ///
    /// Any prior entry for the same `(server, port)` is replaced, then the
    /// full snapshot is persisted.
    pub async fn register(&self, descriptor: ServiceDescriptor) -> Result<(), sqlx::Error> {
        tracing::info!(
            service_type = descriptor.service_type,
            server = %descriptor.server,
            port = descriptor.port,
            "Registering service"
        );
        let snapshot = self.store.update(|current| merge_descriptor(current, descriptor));
        SnapshotRepo::save(&self.pool, &snapshot.services).await
    }

    /// The current descriptor set, verbatim. No liveness probe happens
    /// here; staleness is bounded by the sweep interval.
    pub fn services(&self) -> Vec<ServiceDescriptor> {
        self.store.load().services.clone()
    }

    /// The current snapshot including the derived capability index.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.store.load()
    }

    /// Probe every instance's heartbeat URL and drop the ones that fail.
    ///
    /// The snapshot is persisted only when something was actually evicted.
    /// Returns the number of evicted instances.
    pub async fn reconcile_liveness(&self) -> Result<usize, sqlx::Error> {
        let snapshot = self.store.load();

        // Probe outside the lock; instances registered meanwhile are
        // left alone until the next pass.
        let mut dead: Vec<(String, u16)> = Vec::new();
        for service in &snapshot.services {
            if !self.is_alive(service).await {
                tracing::warn!(
                    service_type = service.service_type,
                    server = %service.server,
                    port = service.port,
                    "Service failed heartbeat, removing"
                );
                dead.push((service.server.clone(), service.port));
            }
        }

        if dead.is_empty() {
            return Ok(0);
        }

        let evicted = dead.len();
        let snapshot = self.store.update(|current| {
            current
                .iter()
                .filter(|s| !dead.iter().any(|(server, port)| s.server == *server && s.port == *port))
                .cloned()
                .collect()
        });
        SnapshotRepo::save(&self.pool, &snapshot.services).await?;
        Ok(evicted)
    }

    /// One heartbeat probe: anything but a timely 200 counts as dead.
    async fn is_alive(&self, service: &ServiceDescriptor) -> bool {
        match self.http.get(&service.heartbeat_url).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(_) => false,
        }
    }
}
