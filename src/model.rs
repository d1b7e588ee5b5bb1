use serde::{Deserialize, Serialize};

/// A persisted screenshot produced by a crawl job.
///
/// Records are written once and never mutated; the store is the only owner
/// after a crawl job commits its batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotRecord {
    pub id: String,
    pub path: String,
    pub job_id: String,
}

impl ScreenshotRecord {
    /// Build a record with a freshly generated id.
    pub fn new(path: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            path: path.into(),
            job_id: job_id.into(),
        }
    }
}

/// One crawl-and-capture unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlJob {
    pub job_id: String,
    pub start_url: String,
    /// Link bound; negative values drop links from the end.
    pub num_links: i64,
}

impl CrawlJob {
    /// Create a job with a freshly minted identifier.
    pub fn new(start_url: impl Into<String>, num_links: i64) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            start_url: start_url.into(),
            num_links,
        }
    }
}
