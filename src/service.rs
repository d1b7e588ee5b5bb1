//! Service facade over the crawl pipeline
//!
//! Bundles job submission, result lookup, the ad-hoc single screenshot and
//! the liveness check behind one type the HTTP layer and the CLI share.

use crate::{
    validate_url, BrowserLauncher, ChromeLauncher, Config, CrawlError, Crawler, Isolation,
    JobDispatcher, JobRunner, Metrics, ProcessRunner, RecordStore, ScreenshotRecord,
    SqliteRecordStore, TaskRunner,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Liveness {
    pub status: &'static str,
}

pub struct ScreenshotService {
    dispatcher: JobDispatcher,
    store: Arc<dyn RecordStore>,
    launcher: Arc<dyn BrowserLauncher>,
    screenshot_dir: PathBuf,
}

impl ScreenshotService {
    pub fn new(
        dispatcher: JobDispatcher,
        store: Arc<dyn RecordStore>,
        launcher: Arc<dyn BrowserLauncher>,
        screenshot_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dispatcher,
            store,
            launcher,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    /// Build the production service: Chrome, SQLite, and the configured isolation.
    pub async fn from_config(config: &Config, metrics: Arc<Metrics>) -> Result<Self, CrawlError> {
        tokio::fs::create_dir_all(&config.screenshot_dir).await?;

        let store: Arc<dyn RecordStore> =
            Arc::new(SqliteRecordStore::connect(&config.database_url).await?);
        let launcher: Arc<dyn BrowserLauncher> = Arc::new(ChromeLauncher::new(config.clone()));

        let runner: Arc<dyn JobRunner> = match config.isolation {
            Isolation::Process => Arc::new(ProcessRunner::current_exe(config, metrics.clone())?),
            Isolation::Task => {
                let crawler = Crawler::new(
                    launcher.clone(),
                    store.clone(),
                    config.screenshot_dir.clone(),
                    metrics.clone(),
                );
                Arc::new(TaskRunner::new(Arc::new(crawler), metrics.clone()))
            }
        };
        info!("Crawl jobs run with {:?} isolation", config.isolation);

        let dispatcher = JobDispatcher::new(runner, metrics);
        Ok(Self::new(
            dispatcher,
            store,
            launcher,
            config.screenshot_dir.clone(),
        ))
    }

    pub fn is_alive(&self) -> Liveness {
        Liveness { status: "alive" }
    }

    /// Start a crawl for a `{start_url, num_links}` body and return its job id.
    pub fn submit(&self, body: &serde_json::Value) -> Result<String, CrawlError> {
        self.dispatcher.submit(body)
    }

    /// Records for `job_id`, or `NotFound` when the job has none (yet).
    pub async fn records(&self, job_id: &str) -> Result<Vec<ScreenshotRecord>, CrawlError> {
        let records = self.store.find_by_job(job_id).await?;
        if records.is_empty() {
            return Err(CrawlError::NotFound(job_id.to_string()));
        }
        Ok(records)
    }

    /// Screenshot paths for `job_id`.
    pub async fn screenshots(&self, job_id: &str) -> Result<Vec<String>, CrawlError> {
        let records = self.records(job_id).await?;
        Ok(records.into_iter().map(|record| record.path).collect())
    }

    /// Take one screenshot in a fresh browser and return its path.
    ///
    /// Without a URL the browser's blank start page is captured.
    pub async fn capture_single(&self, url: Option<&str>) -> Result<String, CrawlError> {
        if let Some(url) = url {
            validate_url(url).map_err(|e| {
                CrawlError::InvalidParameters(format!("Invalid URL {url}: {e}"))
            })?;
        }

        let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        let path = self.screenshot_dir.join(format!("screenshot_{timestamp}.png"));

        let mut browser = self.launcher.launch().await?;
        let captured = match url {
            Some(url) => match browser.navigate(url).await {
                Ok(()) => browser.save_image(&path).await,
                Err(e) => Err(e),
            },
            None => browser.save_image(&path).await,
        };
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser after single screenshot: {}", e);
        }
        captured?;

        info!("Screenshot saved to {}", path.display());
        Ok(path.display().to_string())
    }
}
