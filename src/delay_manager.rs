use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info};
use rand::Rng;

use crate::config::ThrottleConfig;

/// Blocks the calling thread. Swapped out in tests so nothing waits on the
/// wall clock.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// All the waits the scraper spends to stay polite with the target site.
#[derive(Clone)]
pub struct Throttle {
    config: ThrottleConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl Throttle {
    pub fn new(config: ThrottleConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Throttle { config, sleeper }
    }

    pub fn with_thread_sleeper(config: ThrottleConfig) -> Self {
        Self::new(config, Arc::new(ThreadSleeper))
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Lets client-side rendering finish after a navigation.
    pub fn settle(&self) {
        let settle = self.config.settle;
        if !settle.is_zero() {
            debug!("Waiting {} ms for page to render...", settle.as_millis());
            self.sleeper.sleep(settle);
        }
    }

    pub fn page_pause(&self) {
        self.pause(self.config.page_delay, "Page Delay");
    }

    pub fn triple_pause(&self) {
        self.pause(self.config.triple_delay, "Query Delay");
    }

    /// Exponential backoff before retry number `attempt` (1-based).
    pub fn retry_backoff(&self, attempt: u32) {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        let wait = self.config.retry_backoff.saturating_mul(factor);
        if !wait.is_zero() {
            info!("Retrying in {} ms (attempt {})...", wait.as_millis(), attempt);
            self.sleeper.sleep(wait);
        }
    }

    fn pause(&self, base: Duration, label: &str) {
        let wait = base + self.jitter();
        if wait.is_zero() {
            return;
        }
        info!("Waiting for {} ms ({})...", wait.as_millis(), label);
        self.sleeper.sleep(wait);
    }

    fn jitter(&self) -> Duration {
        let max = self.config.jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(0..=max))
    }
}
