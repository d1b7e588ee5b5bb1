//! Configuration management with serde serialization/deserialization
//!
//! This module provides the configuration for the screenshot service: where
//! images and records are stored, how the HTTP server binds, how Chrome is
//! launched, and how crawl jobs are isolated from the dispatching service.

use crate::CrawlError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the directory screenshots are written to.
pub const SCREENSHOT_DIR_ENV: &str = "SCREENSHOT_DIR";
/// Environment variable naming the record store connection URL.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
/// Environment variable naming the Chrome/Chromium executable.
pub const CHROME_PATH_ENV: &str = "CHROME_PATH";

/// Main configuration structure for the screenshot service
///
/// Values are resolved in layers: defaults, then an optional JSON file,
/// then environment variables, then command-line flags.
///
/// # Examples
///
/// ```rust
/// use screenshot_service::{Config, Isolation};
///
/// // Use default configuration
/// let config = Config::default();
///
/// // Run crawl jobs as tokio tasks instead of child processes
/// let config = Config {
///     isolation: Isolation::Task,
///     port: 8080,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Directory screenshots are written to (default: `file_path/screenshots`)
    ///
    /// Created on startup if it does not exist.
    pub screenshot_dir: PathBuf,

    /// Record store connection URL (default: `sqlite://screenshots.db`)
    pub database_url: String,

    /// Address the HTTP server binds to (default: `0.0.0.0`)
    pub bind: String,

    /// Port the HTTP server listens on (default: 5001)
    pub port: u16,

    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,

    /// Custom User-Agent string for page loads
    pub user_agent: Option<String>,

    /// Browser window used for rendering
    pub viewport: Viewport,

    /// Capture the full scrollable page rather than the visible window (default: true)
    pub full_page: bool,

    /// How crawl jobs are isolated from the dispatching service (default: process)
    pub isolation: Isolation,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            screenshot_dir: PathBuf::from("file_path/screenshots"),
            database_url: "sqlite://screenshots.db".to_string(),
            bind: "0.0.0.0".to_string(),
            port: 5001,
            chrome_path: None,
            user_agent: None,
            viewport: Viewport::default(),
            full_page: true,
            isolation: Isolation::default(),
        }
    }
}

impl Config {
    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` as the environment.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(SCREENSHOT_DIR_ENV).filter(|v| !v.is_empty()) {
            self.screenshot_dir = PathBuf::from(dir);
        }

        if let Some(url) = lookup(DATABASE_URL_ENV).filter(|v| !v.is_empty()) {
            self.database_url = url;
        }

        if let Some(path) = lookup(CHROME_PATH_ENV).filter(|v| !v.is_empty()) {
            self.chrome_path = Some(path);
        }
    }

    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.screenshot_dir.as_os_str().is_empty() {
            return Err(CrawlError::Configuration(
                "Screenshot directory must not be empty".to_string(),
            ));
        }

        if self.database_url.trim().is_empty() {
            return Err(CrawlError::Configuration(
                "Database URL must not be empty".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(CrawlError::Configuration(
                "Port must be greater than 0".to_string(),
            ));
        }

        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(CrawlError::Configuration(
                "Viewport dimensions must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Browser window configuration for screenshots
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Viewport {
    /// Viewport width in pixels (default: 1920)
    pub width: u32,

    /// Viewport height in pixels (default: 1080)
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Execution context a crawl job runs in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Isolation {
    /// Each job runs in its own OS process (re-executing this binary)
    #[default]
    Process,
    /// Each job runs in its own tokio task; panics are contained by the join handle
    Task,
}

/// Generate Chrome command-line arguments based on configuration
///
/// Every call produces a fresh user data directory so that concurrent
/// browsers never contend for Chrome's profile singleton.
///
/// # Examples
///
/// ```rust
/// use screenshot_service::{Config, get_chrome_args};
///
/// let config = Config::default();
/// let args = get_chrome_args(&config);
/// assert!(args.iter().any(|a| a.starts_with("--user-data-dir=")));
/// ```
pub fn get_chrome_args(config: &Config) -> Vec<String> {
    let unique_id = format!("{}-{}", std::process::id(), uuid::Uuid::new_v4());

    let mut args = vec![
        "--headless".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        "--disable-features=TranslateUI".to_string(),
        "--disable-process-singleton-dialog".to_string(),
        format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        ),
        format!("--user-data-dir=/tmp/screenshot-service-{}", unique_id),
    ];

    if let Some(user_agent) = &config.user_agent {
        args.push(format!("--user-agent={user_agent}"));
    }

    args
}

pub fn create_browser_config(
    config: &Config,
) -> Result<chromiumoxide::browser::BrowserConfig, CrawlError> {
    use chromiumoxide::browser::BrowserConfig;

    let mut builder = BrowserConfig::builder()
        .window_size(config.viewport.width, config.viewport.height)
        .args(get_chrome_args(config));

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build().map_err(CrawlError::BrowserLaunchFailed)
}
