use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;

use crate::error::ConfigError;
use crate::models::DEFAULT_PAGES_PER_QUERY;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8081/api";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub notify_timeout: Duration,
    pub submit_timeout: Duration,
    pub max_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
            notify_timeout: Duration::from_secs(10),
            submit_timeout: Duration::from_secs(30),
            max_retries: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrowserConfig {
    pub headless: bool,
    pub sandbox: bool,
    pub user_agent: String,
    pub chrome_path: Option<PathBuf>,
    pub navigation_timeout: Duration,
    /// Poll for the source's card selector instead of sleeping the settle delay.
    pub wait_for_cards: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            headless: true,
            sandbox: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chrome_path: None,
            navigation_timeout: Duration::from_secs(30),
            wait_for_cards: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleConfig {
    pub settle: Duration,
    pub page_delay: Duration,
    pub triple_delay: Duration,
    pub retry_backoff: Duration,
    /// Upper bound of a random extra wait added to page and triple delays.
    pub jitter: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        ThrottleConfig {
            settle: Duration::from_millis(2000),
            page_delay: Duration::from_millis(1000),
            triple_delay: Duration::from_millis(2000),
            retry_backoff: Duration::from_millis(500),
            jitter: Duration::ZERO,
        }
    }
}

impl ThrottleConfig {
    /// No waits at all. Used by tests and dry runs.
    pub fn immediate() -> Self {
        ThrottleConfig {
            settle: Duration::ZERO,
            page_delay: Duration::ZERO,
            triple_delay: Duration::ZERO,
            retry_backoff: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScraperConfig {
    pub api: ApiConfig,
    pub browser: BrowserConfig,
    pub throttle: ThrottleConfig,
    pub pages_per_query: u32,
    pub daily_at: NaiveTime,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            api: ApiConfig::default(),
            browser: BrowserConfig::default(),
            throttle: ThrottleConfig::default(),
            pages_per_query: DEFAULT_PAGES_PER_QUERY,
            daily_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
        }
    }
}

impl ScraperConfig {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("Loaded environment from {:?}", path),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("Ignoring unreadable .env file: {}", e),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset or blank keys
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = ScraperConfig::default();

        let api = ApiConfig {
            base_url: get("API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api.base_url),
            token: get("API_TOKEN"),
            notify_timeout: secs(&get, "SCRAPER_NOTIFY_TIMEOUT_SECS", defaults.api.notify_timeout)?,
            submit_timeout: secs(&get, "SCRAPER_SUBMIT_TIMEOUT_SECS", defaults.api.submit_timeout)?,
            max_retries: parse(&get, "SCRAPER_SUBMIT_RETRIES", defaults.api.max_retries)?,
        };

        let browser = BrowserConfig {
            headless: parse(&get, "SCRAPER_HEADLESS", defaults.browser.headless)?,
            sandbox: defaults.browser.sandbox,
            user_agent: get("SCRAPER_USER_AGENT").unwrap_or(defaults.browser.user_agent),
            chrome_path: get("CHROME_PATH").map(PathBuf::from),
            navigation_timeout: secs(
                &get,
                "SCRAPER_NAVIGATION_TIMEOUT_SECS",
                defaults.browser.navigation_timeout,
            )?,
            wait_for_cards: parse(&get, "SCRAPER_WAIT_FOR_CARDS", defaults.browser.wait_for_cards)?,
        };

        let throttle = ThrottleConfig {
            settle: millis(&get, "SCRAPER_SETTLE_MS", defaults.throttle.settle)?,
            page_delay: millis(&get, "SCRAPER_PAGE_DELAY_MS", defaults.throttle.page_delay)?,
            triple_delay: millis(&get, "SCRAPER_TRIPLE_DELAY_MS", defaults.throttle.triple_delay)?,
            retry_backoff: millis(&get, "SCRAPER_RETRY_BACKOFF_MS", defaults.throttle.retry_backoff)?,
            jitter: millis(&get, "SCRAPER_JITTER_MS", defaults.throttle.jitter)?,
        };

        let daily_at = match get("SCRAPER_DAILY_AT") {
            Some(value) => NaiveTime::parse_from_str(&value, "%H:%M").map_err(|e| {
                ConfigError::Invalid {
                    key: "SCRAPER_DAILY_AT",
                    value,
                    reason: e.to_string(),
                }
            })?,
            None => defaults.daily_at,
        };

        Ok(ScraperConfig {
            api,
            browser,
            throttle,
            pages_per_query: parse(&get, "SCRAPER_PAGES", defaults.pages_per_query)?,
            daily_at,
        })
    }
}

fn parse<T, F>(get: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn millis<F>(get: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse(get, key, default.as_millis() as u64).map(Duration::from_millis)
}

fn secs<F>(get: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse(get, key, default.as_secs()).map(Duration::from_secs)
}
