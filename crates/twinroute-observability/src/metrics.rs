//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for TwinRoute:
//! - Request counts by listener and route
//! - Escalations from the chat pre-check to the work route
//! - Upstream failures by route and status
//! - Request latency by route
//! - Relayed stream frames

use prometheus::{Counter, CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector for TwinRoute
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    /// Requests received, by listener (openai/anthropic) and route (chat/work)
    pub requests_total: CounterVec,
    /// Pre-checks that escalated to the work route
    pub escalations_total: Counter,
    /// Upstream failures; status is "transport" when no HTTP status was received
    pub upstream_errors_total: CounterVec,
    /// Time until the response head is ready, by route
    pub request_duration_seconds: HistogramVec,
    /// SSE frames written to callers, by listener
    pub stream_frames_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("twinroute_requests_total", "Total number of requests"),
            &["listener", "route"],
        )?;

        let escalations_total = Counter::new(
            "twinroute_escalations_total",
            "Pre-checks escalated to the work route",
        )?;

        let upstream_errors_total = CounterVec::new(
            Opts::new(
                "twinroute_upstream_errors_total",
                "Total number of failed upstream calls",
            ),
            &["route", "status"],
        )?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "twinroute_request_duration_seconds",
                "Request duration in seconds",
            )
            .buckets(vec![
                0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
            ]),
            &["route"],
        )?;

        let stream_frames_total = CounterVec::new(
            Opts::new(
                "twinroute_stream_frames_total",
                "Total number of SSE frames relayed to callers",
            ),
            &["listener"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(escalations_total.clone()))?;
        registry.register(Box::new(upstream_errors_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(stream_frames_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            escalations_total,
            upstream_errors_total,
            request_duration_seconds,
            stream_frames_total,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_request(&self, listener: &str, route: &str, duration_secs: f64) {
        self.requests_total
            .with_label_values(&[listener, route])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[route])
            .observe(duration_secs);
    }

    pub fn record_escalation(&self) {
        self.escalations_total.inc();
    }

    /// `status` is `None` for transport failures
    pub fn record_upstream_error(&self, route: &str, status: Option<u16>) {
        let status = status.map_or_else(|| "transport".to_string(), |s| s.to_string());
        self.upstream_errors_total
            .with_label_values(&[route, status.as_str()])
            .inc();
    }

    pub fn record_stream_frame(&self, listener: &str) {
        self.stream_frames_total.with_label_values(&[listener]).inc();
    }
}
