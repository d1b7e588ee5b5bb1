//! Browser capability used by crawl jobs
//!
//! Crawl code only sees the [`Browser`] trait: navigate, save an image,
//! read the rendered markup, close. [`ChromeBrowser`] implements it on top of
//! a headless Chrome instance driven over the DevTools protocol.

use crate::{create_browser_config, Config, CrawlError};
use async_trait::async_trait;
use chromiumoxide::browser::Browser as ChromeProcess;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::Path;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A single browser session owned by one crawl job.
#[async_trait]
pub trait Browser: Send {
    /// Load `url` in the session's page.
    async fn navigate(&mut self, url: &str) -> Result<(), CrawlError>;

    /// Render the current page to a PNG at `path`.
    async fn save_image(&mut self, path: &Path) -> Result<(), CrawlError>;

    /// Markup of the current page after scripts have run.
    async fn rendered_markup(&mut self) -> Result<String, CrawlError>;

    /// Shut the session down. Safe to call more than once.
    async fn close(&mut self) -> Result<(), CrawlError>;
}

/// Starts new browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Browser>, CrawlError>;
}

/// Launches one headless Chrome per session.
pub struct ChromeLauncher {
    config: Config,
}

impl ChromeLauncher {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, CrawlError> {
        let browser = ChromeBrowser::launch(&self.config).await?;
        Ok(Box::new(browser))
    }
}

pub struct ChromeBrowser {
    browser: ChromeProcess,
    page: Page,
    handler: JoinHandle<Result<(), chromiumoxide::error::CdpError>>,
    full_page: bool,
    closed: bool,
}

impl ChromeBrowser {
    pub async fn launch(config: &Config) -> Result<Self, CrawlError> {
        let browser_config = create_browser_config(config)?;

        let (browser, mut handler) = ChromeProcess::launch(browser_config)
            .await
            .map_err(|e| CrawlError::BrowserLaunchFailed(e.to_string()))?;

        // The handler drives the DevTools connection and must be polled for
        // the lifetime of the browser.
        let handler = tokio::spawn(async move {
            loop {
                match handler.next().await {
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!("Browser handler error: {}", e);
                        return Err(e);
                    }
                    None => {
                        debug!("Browser handler stream ended");
                        break;
                    }
                }
            }
            Ok(())
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(CrawlError::BrowserLaunchFailed(e.to_string()));
            }
        };

        info!("Browser session started");

        Ok(Self {
            browser,
            page,
            handler,
            full_page: config.full_page,
            closed: false,
        })
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), CrawlError> {
        debug!("Navigating to {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| CrawlError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn save_image(&mut self, path: &Path) -> Result<(), CrawlError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(self.full_page)
            .build();

        self.page
            .save_screenshot(params, path)
            .await
            .map_err(|e| CrawlError::Capture {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        debug!("Saved screenshot to {}", path.display());
        Ok(())
    }

    async fn rendered_markup(&mut self) -> Result<String, CrawlError> {
        self.page
            .content()
            .await
            .map_err(|e| CrawlError::Browser(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), CrawlError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!("Failed waiting for browser process to exit: {}", e);
        }
        self.handler.abort();

        result
            .map(|_| ())
            .map_err(|e| CrawlError::Browser(e.to_string()))
    }
}

impl Drop for ChromeBrowser {
    fn drop(&mut self) {
        if !self.closed {
            warn!("Browser session dropped without close");
        }
        self.handler.abort();
    }
}
