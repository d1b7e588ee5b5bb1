//! Job submission and isolated execution
//!
//! The dispatcher validates a submission, mints a job id, hands the job to a
//! [`JobRunner`] and returns immediately. Runners never report results back:
//! the outcome of a job is only visible through logs, metrics and the records
//! it persists.

use crate::{Config, CrawlError, CrawlJob, Crawler, Metrics};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{error, info, warn};

/// Validated submission parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlParams {
    pub start_url: String,
    pub num_links: i64,
}

impl CrawlParams {
    /// Validate a `{start_url, num_links}` JSON body.
    pub fn from_json(body: &Value) -> Result<Self, CrawlError> {
        let start_url = body
            .get("start_url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                CrawlError::InvalidParameters("start_url must be a non-empty string".to_string())
            })?;

        // Any JSON integer is accepted; integers above i64::MAX saturate
        let num_links = body
            .get("num_links")
            .and_then(|n| n.as_i64().or_else(|| n.as_u64().map(|_| i64::MAX)))
            .ok_or_else(|| {
                CrawlError::InvalidParameters("num_links must be an integer".to_string())
            })?;

        Ok(Self {
            start_url: start_url.to_string(),
            num_links,
        })
    }
}

/// Starts a crawl job in an execution context isolated from the caller.
#[cfg_attr(test, mockall::automock)]
pub trait JobRunner: Send + Sync {
    /// Start `job` and return without waiting for it.
    fn launch(&self, job: CrawlJob) -> Result<(), CrawlError>;
}

/// Runs every job in a child process of this binary.
///
/// The child runs the hidden `crawl` subcommand with the resolved
/// configuration, so a browser crash or hang only takes down that process.
pub struct ProcessRunner {
    program: PathBuf,
    config_json: String,
    metrics: Arc<Metrics>,
}

impl ProcessRunner {
    pub fn new(
        program: PathBuf,
        config: &Config,
        metrics: Arc<Metrics>,
    ) -> Result<Self, CrawlError> {
        Ok(Self {
            program,
            config_json: serde_json::to_string(config)?,
            metrics,
        })
    }

    /// Runner that re-executes the currently running binary.
    pub fn current_exe(config: &Config, metrics: Arc<Metrics>) -> Result<Self, CrawlError> {
        let program = std::env::current_exe()?;
        Self::new(program, config, metrics)
    }

    fn command(&self, job: &CrawlJob) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("crawl")
            .arg(format!("--job-id={}", job.job_id))
            .arg(format!("--start-url={}", job.start_url))
            .arg(format!("--num-links={}", job.num_links))
            .arg(format!("--config-json={}", self.config_json))
            .stdin(Stdio::null());
        cmd
    }
}

impl JobRunner for ProcessRunner {
    fn launch(&self, job: CrawlJob) -> Result<(), CrawlError> {
        let mut child = self
            .command(&job)
            .spawn()
            .map_err(|e| CrawlError::Spawn(e.to_string()))?;

        info!(
            "Job {} started in process {}",
            job.job_id,
            child.id().unwrap_or_default()
        );
        self.metrics.record_started();

        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    info!("Job {} process exited cleanly", job.job_id);
                    metrics.record_finished(true);
                }
                Ok(status) => {
                    warn!("Job {} process exited with {}", job.job_id, status);
                    metrics.record_finished(false);
                }
                Err(e) => {
                    error!("Failed to wait for job {} process: {}", job.job_id, e);
                    metrics.record_finished(false);
                }
            }
        });

        Ok(())
    }
}

/// Runs every job in its own tokio task.
///
/// A panic inside a job is caught by the task's join handle and logged; it
/// does not affect the dispatcher or other jobs.
pub struct TaskRunner {
    crawler: Arc<Crawler>,
    metrics: Arc<Metrics>,
}

impl TaskRunner {
    pub fn new(crawler: Arc<Crawler>, metrics: Arc<Metrics>) -> Self {
        Self { crawler, metrics }
    }
}

impl JobRunner for TaskRunner {
    fn launch(&self, job: CrawlJob) -> Result<(), CrawlError> {
        let crawler = self.crawler.clone();
        let job_id = job.job_id.clone();
        let handle = tokio::spawn(async move { crawler.run_logged(&job).await });

        info!("Job {} started in background task", job_id);
        self.metrics.record_started();

        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            match handle.await {
                Ok(success) => metrics.record_finished(success),
                Err(e) if e.is_panic() => {
                    error!("Job {} panicked: {}", job_id, e);
                    metrics.record_finished(false);
                }
                Err(e) => {
                    warn!("Job {} was cancelled: {}", job_id, e);
                    metrics.record_finished(false);
                }
            }
        });

        Ok(())
    }
}

/// Accepts crawl submissions and starts them without waiting.
///
/// No admission control is applied; every valid submission starts a job.
pub struct JobDispatcher {
    runner: Arc<dyn JobRunner>,
    metrics: Arc<Metrics>,
}

impl JobDispatcher {
    pub fn new(runner: Arc<dyn JobRunner>, metrics: Arc<Metrics>) -> Self {
        Self { runner, metrics }
    }

    /// Validate `body`, start a job for it, and return the new job id.
    pub fn submit(&self, body: &Value) -> Result<String, CrawlError> {
        let params = match CrawlParams::from_json(body) {
            Ok(params) => params,
            Err(e) => {
                self.metrics.record_rejected();
                return Err(e);
            }
        };

        self.dispatch(params)
    }

    pub fn dispatch(&self, params: CrawlParams) -> Result<String, CrawlError> {
        let job = CrawlJob::new(params.start_url, params.num_links);
        let job_id = job.job_id.clone();

        self.runner.launch(job)?;
        self.metrics.record_submitted();

        Ok(job_id)
    }
}
