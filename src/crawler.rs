//! Crawl orchestration for a single job
//!
//! A crawl captures the start page, collects the anchors it renders, bounds
//! and normalizes them, captures each link in order, and persists the link
//! records as one batch. The browser session is closed on every exit path.

use crate::{
    bound_links, extract_links, normalize_links, Browser, BrowserLauncher, CaptureEngine,
    CaptureOutcome, CrawlError, CrawlJob, Metrics, RecordStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// What a finished crawl produced.
#[derive(Debug)]
pub struct JobReport {
    pub job_id: String,
    pub start_screenshot: PathBuf,
    pub links_found: usize,
    /// Links left after bounding; the number of captures the job intended.
    pub targets: usize,
    pub capture_attempts: usize,
    pub persisted: usize,
    /// Set when capturing stopped early; earlier records were still persisted.
    pub capture_failure: Option<CrawlError>,
    pub duration: Duration,
}

impl JobReport {
    pub fn is_complete(&self) -> bool {
        self.capture_failure.is_none()
    }
}

struct CrawlOutcome {
    start_screenshot: PathBuf,
    links_found: usize,
    targets: usize,
    capture: CaptureOutcome,
}

pub struct Crawler {
    launcher: Arc<dyn BrowserLauncher>,
    store: Arc<dyn RecordStore>,
    engine: CaptureEngine,
    metrics: Arc<Metrics>,
}

impl Crawler {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        store: Arc<dyn RecordStore>,
        screenshot_dir: impl Into<PathBuf>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            launcher,
            store,
            engine: CaptureEngine::new(screenshot_dir),
            metrics,
        }
    }

    /// Run the job, returning any error to the caller.
    pub async fn run(&self, job: &CrawlJob) -> Result<JobReport, CrawlError> {
        let started = Instant::now();
        info!(
            "Starting crawl job {} for {} (up to {} links)",
            job.job_id, job.start_url, job.num_links
        );

        let mut browser = self.launcher.launch().await?;
        let crawled = self.crawl(browser.as_mut(), job).await;
        if let Err(e) = browser.close().await {
            warn!("Job {} failed to close browser: {}", job.job_id, e);
        }
        let outcome = crawled?;

        let capture = outcome.capture;
        self.metrics
            .record_captures(capture.records.len(), capture.failure.is_some());

        if let Err(e) = self.store.save_all(&capture.records).await {
            self.metrics.record_persistence_failure();
            return Err(e);
        }

        let duration = started.elapsed();
        self.metrics.record_job_duration(duration);

        Ok(JobReport {
            job_id: job.job_id.clone(),
            start_screenshot: outcome.start_screenshot,
            links_found: outcome.links_found,
            targets: outcome.targets,
            capture_attempts: capture.attempted,
            persisted: capture.records.len(),
            capture_failure: capture.failure,
            duration,
        })
    }

    /// Run the job and log its outcome. Never returns an error.
    ///
    /// Returns true when every capture succeeded and the batch was persisted.
    pub async fn run_logged(&self, job: &CrawlJob) -> bool {
        match self.run(job).await {
            Ok(report) if report.is_complete() => {
                info!(
                    "Successfully saved {} screenshots for job {} in {:?}",
                    report.persisted, report.job_id, report.duration
                );
                true
            }
            Ok(report) => {
                let reason = report
                    .capture_failure
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                warn!(
                    "Job {} saved {} of {} screenshots before capture failed: {}",
                    report.job_id, report.persisted, report.targets, reason
                );
                false
            }
            Err(e @ CrawlError::Persistence(_)) => {
                error!(
                    "Failed to save screenshots for job {}: {}",
                    job.job_id, e
                );
                false
            }
            Err(e) => {
                error!("Error during crawling for job {}: {}", job.job_id, e);
                false
            }
        }
    }

    async fn crawl(
        &self,
        browser: &mut dyn Browser,
        job: &CrawlJob,
    ) -> Result<CrawlOutcome, CrawlError> {
        let start_screenshot = self
            .engine
            .capture_start(browser, &job.start_url, &job.job_id)
            .await?;

        let markup = browser.rendered_markup().await?;
        let links = extract_links(&markup);
        let links_found = links.len();

        let targets = normalize_links(&bound_links(links, job.num_links), &job.start_url);
        debug!(
            "Job {} found {} links, capturing {}",
            job.job_id,
            links_found,
            targets.len()
        );

        let capture = self
            .engine
            .capture_links(browser, &targets, &job.job_id)
            .await;

        Ok(CrawlOutcome {
            start_screenshot,
            links_found,
            targets: targets.len(),
            capture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBrowser, FakeLauncher};
    use crate::{ScreenshotRecord, SqliteRecordStore};
    use async_trait::async_trait;
    use tempfile::TempDir;

    const PAGE: &str = r#"
        <html><body>
          <a href="/a">A</a>
          <a href="http://other.com/b">B</a>
          <a href="/c">C</a>
        </body></html>
    "#;

    struct BrokenStore;

    #[async_trait]
    impl RecordStore for BrokenStore {
        async fn save_all(&self, _records: &[ScreenshotRecord]) -> Result<(), CrawlError> {
            Err(CrawlError::Persistence("database is locked".to_string()))
        }

        async fn find_by_job(&self, _job_id: &str) -> Result<Vec<ScreenshotRecord>, CrawlError> {
            Ok(Vec::new())
        }
    }

    async fn sqlite_store() -> (Arc<SqliteRecordStore>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("screenshots.db").display());
        let store = SqliteRecordStore::connect(&url).await.unwrap();
        (Arc::new(store), dir)
    }

    fn crawler(launcher: Arc<FakeLauncher>, store: Arc<dyn RecordStore>) -> Crawler {
        Crawler::new(launcher, store, "/shots", Arc::new(Metrics::new()))
    }

    fn job(num_links: i64) -> CrawlJob {
        CrawlJob {
            job_id: "run-1".to_string(),
            start_url: "http://example.com".to_string(),
            num_links,
        }
    }

    #[tokio::test]
    async fn test_crawl_bounds_and_normalizes_links() {
        let (store, _dir) = sqlite_store().await;
        let launcher = Arc::new(FakeLauncher::new(FakeBrowser::new(PAGE)));
        let crawler = crawler(launcher.clone(), store.clone());

        let report = crawler.run(&job(2)).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.links_found, 3);
        assert_eq!(report.targets, 2);
        assert_eq!(report.capture_attempts, 2);
        assert_eq!(report.persisted, 2);
        assert_eq!(report.start_screenshot, PathBuf::from("/shots/run-1_start.png"));
        assert_eq!(
            launcher.browser().navigations(),
            vec![
                "http://example.com".to_string(),
                "http://example.com/a".to_string(),
                "http://other.com/b".to_string(),
            ]
        );

        let mut paths: Vec<String> = store
            .find_by_job("run-1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.path)
            .collect();
        paths.sort();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("_link_0.png"));
        assert!(paths[1].ends_with("_link_1.png"));
        assert_eq!(launcher.browser().closes(), 1);
    }

    #[tokio::test]
    async fn test_zero_links_captures_only_start_page() {
        let (store, _dir) = sqlite_store().await;
        let launcher = Arc::new(FakeLauncher::new(FakeBrowser::new(PAGE)));
        let crawler = crawler(launcher.clone(), store.clone());

        let report = crawler.run(&job(0)).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.capture_attempts, 0);
        assert_eq!(launcher.browser().navigations(), vec!["http://example.com"]);
        assert_eq!(launcher.browser().saved().len(), 1);
        assert!(store.find_by_job("run-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attempts_bounded_by_anchors_found() {
        let (store, _dir) = sqlite_store().await;
        let launcher = Arc::new(FakeLauncher::new(FakeBrowser::new(PAGE)));
        let crawler = crawler(launcher.clone(), store.clone());

        let report = crawler.run(&job(50)).await.unwrap();

        assert_eq!(report.capture_attempts, 3);
        assert_eq!(store.find_by_job("run-1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_negative_bound_skips_last_anchor() {
        let (store, _dir) = sqlite_store().await;
        let launcher = Arc::new(FakeLauncher::new(FakeBrowser::new(PAGE)));
        let crawler = crawler(launcher.clone(), store.clone());

        let report = crawler.run(&job(-1)).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.targets, 2);
        assert_eq!(
            launcher.browser().navigations(),
            vec![
                "http://example.com".to_string(),
                "http://example.com/a".to_string(),
                "http://other.com/b".to_string(),
            ]
        );
        assert_eq!(store.find_by_job("run-1").await.unwrap().len(), 2);

        let none = CrawlJob {
            job_id: "run-3".to_string(),
            ..job(-5)
        };
        let report = crawler.run(&none).await.unwrap();
        assert_eq!(report.capture_attempts, 0);
    }

    #[tokio::test]
    async fn test_capture_failure_persists_earlier_records() {
        let (store, _dir) = sqlite_store().await;
        let browser = FakeBrowser::new(PAGE).fail_navigation("http://other.com/b");
        let launcher = Arc::new(FakeLauncher::new(browser));
        let crawler = crawler(launcher.clone(), store.clone());

        let report = crawler.run(&job(3)).await.unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.targets, 3);
        assert_eq!(report.capture_attempts, 2);
        let records = store.find_by_job("run-1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].path.ends_with("_link_0.png"));

        let retry = CrawlJob {
            job_id: "run-2".to_string(),
            ..job(3)
        };
        assert!(!crawler.run_logged(&retry).await);
        assert_eq!(store.find_by_job("run-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_start_page_failure_closes_browser() {
        let (store, _dir) = sqlite_store().await;
        let browser = FakeBrowser::new(PAGE).fail_navigation("http://example.com");
        let launcher = Arc::new(FakeLauncher::new(browser));
        let crawler = crawler(launcher.clone(), store.clone());

        let result = crawler.run(&job(2)).await;

        assert!(matches!(result, Err(CrawlError::Navigation { .. })));
        assert_eq!(launcher.browser().closes(), 1);
        assert!(store.find_by_job("run-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_reported() {
        let launcher = Arc::new(FakeLauncher::new(FakeBrowser::new(PAGE)));
        let crawler = crawler(launcher.clone(), Arc::new(BrokenStore));

        let result = crawler.run(&job(2)).await;

        assert!(matches!(result, Err(CrawlError::Persistence(_))));
        // Screenshots were still taken before the batch failed
        assert_eq!(launcher.browser().saved().len(), 3);
        assert_eq!(launcher.browser().closes(), 1);
        assert!(!crawler.run_logged(&job(2)).await);
    }

    #[tokio::test]
    async fn test_launch_failure_is_caught_by_run_logged() {
        let (store, _dir) = sqlite_store().await;
        let launcher = Arc::new(FakeLauncher::failing());
        let crawler = crawler(launcher.clone(), store);

        assert!(matches!(
            crawler.run(&job(1)).await,
            Err(CrawlError::BrowserLaunchFailed(_))
        ));
        assert!(!crawler.run_logged(&job(1)).await);
        assert_eq!(launcher.launches(), 2);
    }
}
