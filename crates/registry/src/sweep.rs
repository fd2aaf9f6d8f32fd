//! Background liveness sweep.
//!
//! Runs [`Registry::reconcile_liveness`] on a fixed interval for the
//! lifetime of the process; only cancellation stops it.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::registry::Registry;

/// Run the liveness sweep loop until `cancel` is triggered.
pub async fn run_sweep(registry: Arc<Registry>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Liveness sweep started");

    let mut ticker = tokio::time::interval(interval);
    // Bootstrap already ran one pass; skip the interval's immediate tick.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Liveness sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                match registry.reconcile_liveness().await {
                    Ok(0) => tracing::debug!("Liveness sweep: all services answered"),
                    Ok(evicted) => tracing::info!(evicted, "Liveness sweep: removed dead services"),
                    Err(e) => tracing::error!(error = %e, "Liveness sweep: snapshot persist failed"),
                }
            }
        }
    }
}
