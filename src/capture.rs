//! Sequential screenshot capture for one crawl job.

use crate::{Browser, CrawlError, ScreenshotRecord};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Which screenshot of a job a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shot {
    /// The start page
    Start,
    /// The link at this position in the bounded link list
    Link(usize),
}

/// Deterministic location of a job's screenshot under `dir`.
pub fn screenshot_path(dir: &Path, job_id: &str, shot: Shot) -> PathBuf {
    let file_name = match shot {
        Shot::Start => format!("{job_id}_start.png"),
        Shot::Link(index) => format!("{job_id}_link_{index}.png"),
    };
    dir.join(file_name)
}

/// Result of a capture batch.
///
/// `records` holds one entry per captured URL, in input order. When a
/// navigation or save fails the batch stops there: `failure` carries the
/// error and `records` only covers the positions before it.
#[derive(Debug)]
pub struct CaptureOutcome {
    pub records: Vec<ScreenshotRecord>,
    pub attempted: usize,
    pub failure: Option<CrawlError>,
}

impl CaptureOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

pub struct CaptureEngine {
    screenshot_dir: PathBuf,
}

impl CaptureEngine {
    pub fn new(screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            screenshot_dir: screenshot_dir.into(),
        }
    }

    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir
    }

    /// Navigate to the start page and save it. No record is produced.
    pub async fn capture_start(
        &self,
        browser: &mut dyn Browser,
        start_url: &str,
        job_id: &str,
    ) -> Result<PathBuf, CrawlError> {
        let path = screenshot_path(&self.screenshot_dir, job_id, Shot::Start);
        browser.navigate(start_url).await?;
        browser.save_image(&path).await?;
        Ok(path)
    }

    /// Capture every URL in order, stopping at the first failure.
    pub async fn capture_links(
        &self,
        browser: &mut dyn Browser,
        urls: &[String],
        job_id: &str,
    ) -> CaptureOutcome {
        let mut records = Vec::with_capacity(urls.len());
        let mut attempted = 0;

        for (index, url) in urls.iter().enumerate() {
            attempted += 1;
            let path = screenshot_path(&self.screenshot_dir, job_id, Shot::Link(index));

            let captured = match browser.navigate(url).await {
                Ok(()) => browser.save_image(&path).await,
                Err(e) => Err(e),
            };

            if let Err(e) = captured {
                warn!(
                    "Job {} stopped capturing at link {} ({}): {}",
                    job_id, index, url, e
                );
                return CaptureOutcome {
                    records,
                    attempted,
                    failure: Some(e),
                };
            }

            debug!("Job {} captured link {}: {}", job_id, index, url);
            records.push(ScreenshotRecord::new(path.display().to_string(), job_id));
        }

        CaptureOutcome {
            records,
            attempted,
            failure: None,
        }
    }
}
