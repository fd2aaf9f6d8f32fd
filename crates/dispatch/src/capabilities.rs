//! The dispatcher's local view of the registry.
//!
//! A single background task fetches `GET {registry}/available-services`
//! on an interval and swaps the whole view atomically; request handlers
//! only ever read. When the registry is unreachable mid-run the previous
//! view stays in place, bounded-stale, rather than going empty.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use conductor_core::error::CoreError;
use conductor_core::service::ServiceDescriptor;
use conductor_registry::store::{RegistrySnapshot, ServiceStore};

/// How long a capability fetch may take.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// How often the view is refreshed when the host does not configure it.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15);

/// Read-mostly cache of the registry's descriptor set and the capability
/// index derived from it.
pub struct CapabilityCache {
    http: reqwest::Client,
    available_services_url: String,
    store: ServiceStore,
}

impl CapabilityCache {
    /// `registry_base_url` is the registry's versioned base, e.g.
    /// `http://sd-host:8700/1.0`.
    pub fn new(registry_base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("capability HTTP client must build");
        Self {
            http,
            available_services_url: format!("{registry_base_url}/available-services"),
            store: ServiceStore::new(),
        }
    }

    /// First fetch at process start.
    ///
    /// Unlike [`refresh`], a failure here should be treated as fatal by the
    /// host: a dispatcher that has never seen a service directory cannot
    /// classify anything.
    ///
    /// [`refresh`]: CapabilityCache::refresh
    pub async fn bootstrap(&self) -> Result<(), CoreError> {
        let count = self.refresh().await?;
        tracing::info!(count, "Capability view bootstrapped");
        Ok(())
    }

    /// Fetch the current service list and swap it in. Returns the number
    /// of descriptors in the new view.
    pub async fn refresh(&self) -> Result<usize, CoreError> {
        let response = self
            .http
            .get(&self.available_services_url)
            .send()
            .await
            .map_err(|e| CoreError::Upstream(format!("registry unreachable: {e}")))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(CoreError::Upstream(format!(
                "registry answered {}",
                response.status()
            )));
        }

        let services: Vec<ServiceDescriptor> = response
            .json()
            .await
            .map_err(|e| CoreError::Upstream(format!("registry sent a malformed list: {e}")))?;

        let count = services.len();
        self.store.replace(services);
        Ok(count)
    }

    /// The current view. Cheap; clones only the `Arc`.
    pub fn view(&self) -> Arc<RegistrySnapshot> {
        self.store.load()
    }
}

/// Run the capability refresh loop until `cancel` is triggered.
///
/// A failed refresh is logged and the previous view kept; only the very
/// first fetch (done via [`CapabilityCache::bootstrap`] before this loop
/// starts) is allowed to take the process down.
pub async fn run_refresh(
    cache: Arc<CapabilityCache>,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Capability refresh started");

    let mut ticker = tokio::time::interval(interval);
    // Bootstrap already fetched once; skip the interval's immediate tick.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Capability refresh stopping");
                break;
            }
            _ = ticker.tick() => {
                match cache.refresh().await {
                    Ok(count) => tracing::debug!(count, "Capability view refreshed"),
                    Err(e) => tracing::error!(error = %e, "Capability refresh failed, keeping previous view"),
                }
            }
        }
    }
}
