//! In-memory browser doubles shared by the unit tests.

use crate::{Browser, BrowserLauncher, CrawlError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Activity {
    navigations: Vec<String>,
    saved: Vec<PathBuf>,
    closes: usize,
}

/// Browser that records what it was asked to do.
///
/// Clones share the same activity log, so a launcher can hand out clones
/// and the test can still inspect them afterwards.
#[derive(Clone, Default)]
pub struct FakeBrowser {
    markup: String,
    fail_navigation: Option<String>,
    fail_save: Option<String>,
    panic_on_navigate: bool,
    activity: Arc<Mutex<Activity>>,
}

impl FakeBrowser {
    pub fn new(markup: &str) -> Self {
        Self {
            markup: markup.to_string(),
            ..Default::default()
        }
    }

    /// Fail navigation to exactly this URL.
    pub fn fail_navigation(mut self, url: &str) -> Self {
        self.fail_navigation = Some(url.to_string());
        self
    }

    /// Fail saving to any path ending with this suffix.
    pub fn fail_save(mut self, suffix: &str) -> Self {
        self.fail_save = Some(suffix.to_string());
        self
    }

    pub fn panic_on_navigate(mut self) -> Self {
        self.panic_on_navigate = true;
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.activity.lock().unwrap().navigations.clone()
    }

    pub fn saved(&self) -> Vec<PathBuf> {
        self.activity.lock().unwrap().saved.clone()
    }

    pub fn closes(&self) -> usize {
        self.activity.lock().unwrap().closes
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), CrawlError> {
        if self.panic_on_navigate {
            panic!("browser crashed while loading {url}");
        }

        self.activity.lock().unwrap().navigations.push(url.to_string());

        if self.fail_navigation.as_deref() == Some(url) {
            return Err(CrawlError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_REFUSED".to_string(),
            });
        }
        Ok(())
    }

    async fn save_image(&mut self, path: &Path) -> Result<(), CrawlError> {
        if let Some(suffix) = &self.fail_save {
            if path.to_string_lossy().ends_with(suffix.as_str()) {
                return Err(CrawlError::Capture {
                    path: path.display().to_string(),
                    reason: "read-only file system".to_string(),
                });
            }
        }

        self.activity.lock().unwrap().saved.push(path.to_path_buf());
        Ok(())
    }

    async fn rendered_markup(&mut self) -> Result<String, CrawlError> {
        Ok(self.markup.clone())
    }

    async fn close(&mut self) -> Result<(), CrawlError> {
        self.activity.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Launcher handing out clones of one [`FakeBrowser`].
pub struct FakeLauncher {
    browser: FakeBrowser,
    fail_launch: bool,
    launches: AtomicUsize,
}

impl FakeLauncher {
    pub fn new(browser: FakeBrowser) -> Self {
        Self {
            browser,
            fail_launch: false,
            launches: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::new(FakeBrowser::default())
        }
    }

    pub fn browser(&self) -> &FakeBrowser {
        &self.browser
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, CrawlError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            return Err(CrawlError::BrowserLaunchFailed(
                "chrome executable not found".to_string(),
            ));
        }
        Ok(Box::new(self.browser.clone()))
    }
}
