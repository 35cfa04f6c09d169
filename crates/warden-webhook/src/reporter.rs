//! Per-request decision reporting

use crate::error::WebhookError;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::fmt;
use std::time::Duration;

/// Final classification of one admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestResponse {
    Allow,
    Warn,
    Deny,
    Error,
    Unknown,
}

impl RequestResponse {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestResponse::Allow => "allow",
            RequestResponse::Warn => "warn",
            RequestResponse::Deny => "deny",
            RequestResponse::Error => "error",
            RequestResponse::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RequestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives the outcome and latency of every reviewed request.
///
/// Failures are logged by the caller and never change the decision.
pub trait StatsReporter: Send + Sync {
    fn report_validation_request(
        &self,
        response: RequestResponse,
        elapsed: Duration,
    ) -> Result<(), WebhookError>;
}

/// Reporter that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl StatsReporter for NoopReporter {
    fn report_validation_request(
        &self,
        _response: RequestResponse,
        _elapsed: Duration,
    ) -> Result<(), WebhookError> {
        Ok(())
    }
}

/// Prometheus-backed reporter
pub struct PrometheusReporter {
    /// Requests by admission status
    pub request_count: IntCounterVec,

    /// Request latency by admission status
    pub request_duration_seconds: HistogramVec,
}

impl PrometheusReporter {
    /// Create and register the validation metrics
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let request_count = IntCounterVec::new(
            Opts::new(
                "validation_request_count",
                "Total number of validation requests",
            ),
            &["admission_status"],
        )?;
        registry.register(Box::new(request_count.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "validation_request_duration_seconds",
                "Validation request duration",
            )
            .buckets(vec![
                0.001, 0.002, 0.003, 0.004, 0.005, 0.006, 0.007, 0.008, 0.009, 0.01, 0.02, 0.03,
                0.04, 0.05, 0.06, 0.07, 0.08, 0.09, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9,
                1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0,
            ]),
            &["admission_status"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        Ok(Self {
            request_count,
            request_duration_seconds,
        })
    }
}

impl StatsReporter for PrometheusReporter {
    fn report_validation_request(
        &self,
        response: RequestResponse,
        elapsed: Duration,
    ) -> Result<(), WebhookError> {
        let labels = [response.as_str()];
        self.request_count
            .get_metric_with_label_values(&labels)
            .map_err(|e| WebhookError::Reporter(e.to_string()))?
            .inc();
        self.request_duration_seconds
            .get_metric_with_label_values(&labels)
            .map_err(|e| WebhookError::Reporter(e.to_string()))?
            .observe(elapsed.as_secs_f64());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_count_and_duration_per_status() {
        let registry = Registry::new();
        let reporter = PrometheusReporter::new(&registry).unwrap();
        reporter
            .report_validation_request(RequestResponse::Deny, Duration::from_millis(4))
            .unwrap();
        reporter
            .report_validation_request(RequestResponse::Deny, Duration::from_millis(6))
            .unwrap();
        reporter
            .report_validation_request(RequestResponse::Allow, Duration::from_millis(1))
            .unwrap();

        assert_eq!(reporter.request_count.with_label_values(&["deny"]).get(), 2);
        assert_eq!(reporter.request_count.with_label_values(&["allow"]).get(), 1);
        assert_eq!(
            reporter
                .request_duration_seconds
                .with_label_values(&["deny"])
                .get_sample_count(),
            2
        );
    }

    #[test]
    fn double_registration_fails() {
        let registry = Registry::new();
        PrometheusReporter::new(&registry).unwrap();
        assert!(PrometheusReporter::new(&registry).is_err());
    }

    #[test]
    fn status_labels() {
        assert_eq!(RequestResponse::Warn.to_string(), "warn");
        assert_eq!(RequestResponse::Unknown.as_str(), "unknown");
    }
}
