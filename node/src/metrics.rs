//! # Prometheus Metrics
//!
//! Exposes operational metrics for the assessment node. Scraped by
//! Prometheus at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers. Labels carry
//! error kinds only; subject ids and values never reach a metric.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are `Arc`s internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Assessments accepted by `POST /assessments`, valid or not.
    pub assessments_submitted_total: IntCounter,
    /// Assessments whose proof verified.
    pub assessments_valid_total: IntCounter,
    /// Assessments that ended in an error, by error kind.
    pub assessments_failed_total: IntCounterVec,
    /// Verifications of caller-supplied proofs.
    pub verifications_total: IntCounter,
    /// Assessments currently in flight.
    pub assessments_in_flight: IntGauge,
    /// Wall time of a full assessment (prove + verify + persist), in seconds.
    pub assessment_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("riskproof".into()), None)
            .expect("failed to create prometheus registry");

        let assessments_submitted_total = IntCounter::new(
            "assessments_submitted_total",
            "Total number of assessments submitted",
        )
        .expect("metric creation");
        registry
            .register(Box::new(assessments_submitted_total.clone()))
            .expect("metric registration");

        let assessments_valid_total = IntCounter::new(
            "assessments_valid_total",
            "Total number of assessments whose range proof verified",
        )
        .expect("metric creation");
        registry
            .register(Box::new(assessments_valid_total.clone()))
            .expect("metric registration");

        let assessments_failed_total = IntCounterVec::new(
            Opts::new(
                "assessments_failed_total",
                "Total number of assessments that returned an error",
            ),
            &["kind"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(assessments_failed_total.clone()))
            .expect("metric registration");

        let verifications_total = IntCounter::new(
            "verifications_total",
            "Total number of standalone proof verifications",
        )
        .expect("metric creation");
        registry
            .register(Box::new(verifications_total.clone()))
            .expect("metric registration");

        let assessments_in_flight =
            IntGauge::new("assessments_in_flight", "Assessments currently being proven")
                .expect("metric creation");
        registry
            .register(Box::new(assessments_in_flight.clone()))
            .expect("metric registration");

        let assessment_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "assessment_latency_seconds",
                "End-to-end assessment latency in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(assessment_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            assessments_submitted_total,
            assessments_valid_total,
            assessments_failed_total,
            verifications_total,
            assessments_in_flight,
            assessment_latency_seconds,
        }
    }

    /// Marks one assessment in flight. The returned guard releases the slot
    /// and records latency when dropped, including when the request future
    /// is abandoned mid-proof.
    pub fn start_assessment(&self) -> InFlightAssessment {
        self.assessments_in_flight.inc();
        InFlightAssessment {
            in_flight: self.assessments_in_flight.clone(),
            latency: self.assessment_latency_seconds.clone(),
            started: Instant::now(),
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// In-flight slot for one assessment; see [`NodeMetrics::start_assessment`].
pub struct InFlightAssessment {
    in_flight: IntGauge,
    latency: Histogram,
    started: Instant,
}

impl Drop for InFlightAssessment {
    fn drop(&mut self) {
        self.in_flight.dec();
        self.latency.observe(self.started.elapsed().as_secs_f64());
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
