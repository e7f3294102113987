use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, info, warn};

use crate::config::BrowserConfig;
use crate::error::FetchError;

/// Starts browser sessions. One session serves all pages of one query.
pub trait BrowserLauncher {
    fn launch(&self) -> Result<Box<dyn BrowserSession>, FetchError>;
}

pub trait BrowserSession {
    fn navigate(&mut self, url: &str) -> Result<(), FetchError>;

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), FetchError>;

    /// The current DOM serialized as HTML.
    fn content(&mut self) -> Result<String, FetchError>;

    /// Releases the browser. Must be safe to call more than once.
    fn close(&mut self);
}

pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        ChromeLauncher { config }
    }
}

impl BrowserLauncher for ChromeLauncher {
    fn launch(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        let user_agent = format!("--user-agent={}", self.config.user_agent);
        let args = vec![
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(user_agent.as_str()),
        ];

        let options = LaunchOptions::default_builder()
            .headless(self.config.headless)
            .sandbox(self.config.sandbox)
            .path(self.config.chrome_path.clone())
            .args(args)
            .build()
            .map_err(|e| FetchError::Launch(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| FetchError::Launch(e.to_string()))?;
        let tab = browser.new_tab().map_err(|e| FetchError::Launch(e.to_string()))?;
        tab.set_default_timeout(self.config.navigation_timeout);

        info!("Browser session started (headless: {})", self.config.headless);
        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            tab,
            current_url: String::new(),
        }))
    }
}

struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
    current_url: String,
}

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        self.current_url = url.to_string();
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| FetchError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), FetchError> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|e| {
                debug!("wait for `{}` ended: {}", selector, e);
                FetchError::WaitTimeout {
                    url: self.current_url.clone(),
                    selector: selector.to_string(),
                }
            })
    }

    fn content(&mut self) -> Result<String, FetchError> {
        self.tab.get_content().map_err(|e| FetchError::Content {
            url: self.current_url.clone(),
            reason: e.to_string(),
        })
    }

    fn close(&mut self) {
        // Dropping the last Browser handle kills the Chrome process.
        if let Some(browser) = self.browser.take() {
            if let Err(e) = self.tab.close(true) {
                warn!("Failed to close tab cleanly: {}", e);
            }
            drop(browser);
            info!("Browser session closed");
        }
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.close();
    }
}
