//! Prometheus metrics registry for the tool tracker.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and pass it
//! to the API state, the audit loop and the HTTP middleware.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format
//! (`text/plain; version=0.0.4`). The endpoint bypasses the identity
//! headers so it can be scraped by Prometheus / Grafana agents.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use prometheus::{Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry};

use crate::lifecycle::FeedSummary;

/// All application-level Prometheus metrics.
pub struct AppMetrics {
    /// Inspections recorded through the API.
    pub inspections_total: Counter,
    /// Critical low-usability alerts raised by inspections.
    pub low_usability_alerts_total: Counter,
    /// Usable tools past their expiry date, as of the last audit.
    pub tools_expired: Gauge,
    /// Usable tools inside the expiring window, as of the last audit.
    pub tools_expiring_soon: Gauge,
    /// Tools in scrap status, as of the last audit.
    pub tools_scrapped: Gauge,
    /// Expiry audit runs (success + failure).
    pub audits_total: Counter,
    /// Expiry audit runs that failed to read the store.
    pub audit_errors_total: Counter,
    /// HTTP request count, labelled by method, path, and status code.
    pub http_requests_total: CounterVec,
    /// HTTP request latency histogram in seconds.
    pub http_request_duration: Histogram,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl AppMetrics {
    /// Create and register all metrics. Fails only on an invalid or
    /// duplicated metric name.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let inspections_total = Counter::with_opts(Opts::new(
            "tool_tracker_inspections_total",
            "Inspections recorded",
        ))?;

        let low_usability_alerts_total = Counter::with_opts(Opts::new(
            "tool_tracker_low_usability_alerts_total",
            "Critical low-usability alerts raised by inspections",
        ))?;

        let tools_expired = Gauge::with_opts(Opts::new(
            "tool_tracker_tools_expired",
            "Usable tools past their expiry date",
        ))?;

        let tools_expiring_soon = Gauge::with_opts(Opts::new(
            "tool_tracker_tools_expiring_soon",
            "Usable tools expiring within the warning window",
        ))?;

        let tools_scrapped = Gauge::with_opts(Opts::new(
            "tool_tracker_tools_scrapped",
            "Tools in scrap status",
        ))?;

        let audits_total = Counter::with_opts(Opts::new(
            "tool_tracker_audits_total",
            "Expiry audit runs",
        ))?;

        let audit_errors_total = Counter::with_opts(Opts::new(
            "tool_tracker_audit_errors_total",
            "Failed expiry audit runs",
        ))?;

        let http_requests_total = CounterVec::new(
            Opts::new(
                "tool_tracker_http_requests_total",
                "HTTP requests by method, path, and status",
            ),
            &["method", "path", "status"],
        )?;

        let http_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "tool_tracker_http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;

        registry.register(Box::new(inspections_total.clone()))?;
        registry.register(Box::new(low_usability_alerts_total.clone()))?;
        registry.register(Box::new(tools_expired.clone()))?;
        registry.register(Box::new(tools_expiring_soon.clone()))?;
        registry.register(Box::new(tools_scrapped.clone()))?;
        registry.register(Box::new(audits_total.clone()))?;
        registry.register(Box::new(audit_errors_total.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;

        Ok(Self {
            inspections_total,
            low_usability_alerts_total,
            tools_expired,
            tools_expiring_soon,
            tools_scrapped,
            audits_total,
            audit_errors_total,
            http_requests_total,
            http_request_duration,
            registry,
        })
    }

    /// Overwrite the inventory gauges with a fresh feed summary.
    pub fn record_summary(&self, summary: &FeedSummary) {
        self.tools_expired.set(summary.expired as f64);
        self.tools_expiring_soon.set(summary.expiring_soon as f64);
        self.tools_scrapped.set(summary.scrap as f64);
    }

    /// Render all metrics as Prometheus text format (for the `/metrics` endpoint).
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}

/// Middleware recording request count and latency per matched route.
///
/// Install with `route_layer` so the label is the route template
/// (`/tools/:id`) rather than the raw path.
pub async fn track_http(
    State(metrics): State<Arc<AppMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().as_str().to_owned();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let started = Instant::now();
    let response = next.run(request).await;

    metrics.http_request_duration.observe(started.elapsed().as_secs_f64());
    metrics
        .http_requests_total
        .with_label_values(&[method.as_str(), path.as_str(), response.status().as_str()])
        .inc();

    response
}
