use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CrawlError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Screenshot capture to {path} failed: {reason}")]
    Capture { path: String, reason: String },

    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("No screenshots found for job {0}")]
    NotFound(String),

    #[error("Failed to start crawl job: {0}")]
    Spawn(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CrawlError {
    /// Errors caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CrawlError::InvalidParameters(_) | CrawlError::NotFound(_)
        )
    }

    /// Errors raised by the browser while a capture batch is in progress.
    pub fn is_capture_failure(&self) -> bool {
        matches!(
            self,
            CrawlError::Navigation { .. } | CrawlError::Capture { .. } | CrawlError::Browser(_)
        )
    }

    /// Short label used for metrics and structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            CrawlError::InvalidParameters(_) => "invalid_parameters",
            CrawlError::Navigation { .. } => "navigation",
            CrawlError::Capture { .. } => "capture",
            CrawlError::BrowserLaunchFailed(_) => "browser_launch",
            CrawlError::Browser(_) => "browser",
            CrawlError::Persistence(_) => "persistence",
            CrawlError::NotFound(_) => "not_found",
            CrawlError::Spawn(_) => "spawn",
            CrawlError::Configuration(_) => "configuration",
            CrawlError::Io(_) => "io",
            CrawlError::Serialization(_) => "serialization",
        }
    }
}

impl From<std::io::Error> for CrawlError {
    fn from(err: std::io::Error) -> Self {
        CrawlError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CrawlError {
    fn from(err: serde_json::Error) -> Self {
        CrawlError::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for CrawlError {
    fn from(err: sqlx::Error) -> Self {
        CrawlError::Persistence(err.to_string())
    }
}
