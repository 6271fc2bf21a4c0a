//! Prometheus metrics for the service.
//!
//! The registry is owned by [`Metrics`] and shared through the application
//! state rather than registered globally.

use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

// ---

pub struct Metrics {
    // ---
    registry: Registry,

    /// Requests served, by method, matched route and status.
    http_requests: IntCounterVec,

    /// Request latency in seconds, by method and matched route.
    http_duration: HistogramVec,

    /// Readings successfully inserted.
    readings_ingested: IntCounter,
}

impl Metrics {
    // ---
    pub fn new() -> prometheus::Result<Self> {
        // ---
        let registry = Registry::new();

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests served"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests.clone()))?;

        let http_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_duration.clone()))?;

        let readings_ingested = IntCounter::new(
            "readings_ingested_total",
            "Total temperature readings stored",
        )?;
        registry.register(Box::new(readings_ingested.clone()))?;

        Ok(Metrics {
            registry,
            http_requests,
            http_duration,
            readings_ingested,
        })
    }

    pub fn observe_request(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        // ---
        let status = status.to_string();
        self.http_requests
            .with_label_values(&[method, path, status.as_str()])
            .inc();
        self.http_duration
            .with_label_values(&[method, path])
            .observe(elapsed.as_secs_f64());
    }

    pub fn reading_ingested(&self) {
        self.readings_ingested.inc();
    }

    /// Render every registered metric in the text exposition format.
    pub fn render(&self) -> prometheus::Result<String> {
        // ---
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
