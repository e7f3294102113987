use std::time::Duration;

use log::{debug, info, warn};

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::delay_manager::Throttle;
use crate::error::FetchError;
use crate::sources::JobSource;

/// How to decide a freshly navigated page has rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Sleep the throttle's settle delay.
    Settle,
    /// Poll for the source's card selector, up to the timeout.
    CardSelector(Duration),
}

/// Loads search-result pages through a browser.
pub struct PageFetcher {
    launcher: Box<dyn BrowserLauncher>,
    throttle: Throttle,
    wait: WaitStrategy,
}

impl PageFetcher {
    pub fn new(launcher: Box<dyn BrowserLauncher>, throttle: Throttle, wait: WaitStrategy) -> Self {
        PageFetcher {
            launcher,
            throttle,
            wait,
        }
    }

    /// Starts a browser session for one (source, keyword, city) scrape. The
    /// session closes when the returned guard is dropped.
    pub fn open(&self) -> Result<FetchSession<'_>, FetchError> {
        let session = self.launcher.launch()?;
        Ok(FetchSession {
            fetcher: self,
            session,
            pages_loaded: 0,
        })
    }
}

pub struct FetchSession<'a> {
    fetcher: &'a PageFetcher,
    session: Box<dyn BrowserSession>,
    pages_loaded: u32,
}

impl FetchSession<'_> {
    /// Rendered markup of one results page. Every call after the first in
    /// this session waits the inter-page delay before navigating.
    pub fn fetch(
        &mut self,
        source: &dyn JobSource,
        keyword: &str,
        city: &str,
        page: u32,
    ) -> Result<String, FetchError> {
        if self.pages_loaded > 0 {
            self.fetcher.throttle.page_pause();
        }
        self.pages_loaded += 1;

        let url = source.search_url(keyword, city, page);
        info!("Visiting: {}", url);
        self.session.navigate(&url)?;

        match self.fetcher.wait {
            WaitStrategy::Settle => self.fetcher.throttle.settle(),
            WaitStrategy::CardSelector(timeout) => {
                if let Err(e) = self.session.wait_for(source.card_selector(), timeout) {
                    // An empty result page never renders a card; read it anyway.
                    debug!("{}", e);
                }
            }
        }

        self.session.content()
    }
}

impl Drop for FetchSession<'_> {
    fn drop(&mut self) {
        self.session.close();
    }
}

impl std::fmt::Debug for FetchSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchSession")
            .field("pages_loaded", &self.pages_loaded)
            .finish()
    }
}

/// Logs a page failure with everything needed to find the page again.
pub fn log_page_failure(source: &str, keyword: &str, city: &str, page: u32, error: &FetchError) {
    warn!(
        "Page {} of {} - {} - {} skipped: {}",
        page, source, keyword, city, error
    );
}
