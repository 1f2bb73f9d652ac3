//! Expiry audit scheduler.
//!
//! Periodically evaluates the synthetic alert rules over the whole
//! inventory and publishes the counts as Prometheus gauges, so dashboards
//! see expired and scrapped tools without anyone polling the alert feed.
//! The audit never writes to the store.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::time;

use crate::lifecycle::{FeedSummary, ToolLifecycleEngine};
use crate::metrics::AppMetrics;

/// Run the expiry audit loop until `Ctrl+C` (SIGINT) is received.
///
/// Errors from the store are logged and counted; a single failed audit
/// never stops the loop.
pub async fn run_expiry_audit(
    engine: Arc<ToolLifecycleEngine>,
    metrics: Arc<AppMetrics>,
    interval_seconds: u64,
) {
    let mut interval = time::interval(Duration::from_secs(interval_seconds));

    tracing::info!("Expiry audit started (interval: {}s)", interval_seconds);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                audit_once(&engine, &metrics).await;
            }

            _ = signal::ctrl_c() => {
                tracing::info!("Shutdown signal received. Stopping expiry audit.");
                break;
            }
        }
    }

    tracing::info!("Expiry audit stopped cleanly");
}

/// Execute a single audit. Extracted for testability.
pub async fn audit_once(engine: &ToolLifecycleEngine, metrics: &AppMetrics) -> Option<FeedSummary> {
    metrics.audits_total.inc();

    let summary = match engine.feed_summary().await {
        Ok(summary) => summary,
        Err(err) => {
            metrics.audit_errors_total.inc();
            tracing::error!("Expiry audit failed, keeping previous gauges: {}", err);
            return None;
        }
    };

    metrics.record_summary(&summary);

    if summary.expired > 0 {
        tracing::warn!(
            expired = summary.expired,
            "{} usable tool(s) are past their expiry date",
            summary.expired
        );
    }
    tracing::info!(
        expired = summary.expired,
        expiring_soon = summary.expiring_soon,
        scrap = summary.scrap,
        "Expiry audit complete"
    );

    Some(summary)
}
