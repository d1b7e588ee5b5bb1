use metrics::{register_counter, register_gauge, register_histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use crate::CrawlError;
use std::time::Duration;
use tracing::info;

/// Service-wide counters.
///
/// Handles are registered against whatever recorder is installed when the
/// struct is built; without a recorder every handle is a no-op.
pub struct Metrics {
    pub jobs_submitted: Counter,
    pub jobs_rejected: Counter,
    pub jobs_completed: Counter,
    pub jobs_failed: Counter,
    pub jobs_in_flight: Gauge,
    pub screenshots_captured: Counter,
    pub capture_failures: Counter,
    pub persistence_failures: Counter,
    pub job_duration: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            jobs_submitted: register_counter!("crawl_jobs_submitted_total"),
            jobs_rejected: register_counter!("crawl_jobs_rejected_total"),
            jobs_completed: register_counter!("crawl_jobs_completed_total"),
            jobs_failed: register_counter!("crawl_jobs_failed_total"),
            jobs_in_flight: register_gauge!("crawl_jobs_in_flight"),
            screenshots_captured: register_counter!("screenshots_captured_total"),
            capture_failures: register_counter!("screenshot_capture_failures_total"),
            persistence_failures: register_counter!("screenshot_persistence_failures_total"),
            job_duration: register_histogram!("crawl_job_duration_seconds"),
        }
    }

    pub fn record_submitted(&self) {
        self.jobs_submitted.increment(1);
    }

    pub fn record_rejected(&self) {
        self.jobs_rejected.increment(1);
    }

    pub fn record_started(&self) {
        self.jobs_in_flight.increment(1.0);
    }

    pub fn record_finished(&self, success: bool) {
        self.jobs_in_flight.decrement(1.0);
        if success {
            self.jobs_completed.increment(1);
        } else {
            self.jobs_failed.increment(1);
        }
    }

    pub fn record_captures(&self, captured: usize, failed: bool) {
        self.screenshots_captured.increment(captured as u64);
        if failed {
            self.capture_failures.increment(1);
        }
    }

    pub fn record_persistence_failure(&self) {
        self.persistence_failures.increment(1);
    }

    pub fn record_job_duration(&self, duration: Duration) {
        self.job_duration.record(duration.as_secs_f64());
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the Prometheus recorder for this process.
///
/// Must run before [`Metrics::new`] for the handles to report anywhere.
pub fn install_prometheus() -> Result<PrometheusHandle, CrawlError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| CrawlError::Configuration(format!("Failed to install metrics recorder: {e}")))?;
    info!("Prometheus metrics recorder installed");
    Ok(handle)
}
