//! In-memory stand-ins for the browser, the job API and the clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::delay_manager::Sleeper;
use crate::error::FetchError;
use crate::models::{JobRecord, RunRequest, SubmitOutcome};
use crate::submission::JobSink;

#[derive(Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

#[derive(Debug, Default)]
pub struct BrowserLog {
    pub launches: usize,
    pub closes: usize,
    pub visited: Vec<String>,
    pub waited_for: Vec<String>,
}

/// Serves canned pages in navigation order, cycling through `pages`.
pub struct FakeLauncher {
    pages: Arc<Vec<String>>,
    failing_launches: Vec<usize>,
    failing_navigations: Vec<usize>,
    fail_every_launch: bool,
    log: Arc<Mutex<BrowserLog>>,
}

impl FakeLauncher {
    pub fn serving(pages: Vec<&str>) -> Self {
        FakeLauncher {
            pages: Arc::new(pages.into_iter().map(str::to_string).collect()),
            failing_launches: Vec::new(),
            failing_navigations: Vec::new(),
            fail_every_launch: false,
            log: Arc::new(Mutex::new(BrowserLog::default())),
        }
    }

    pub fn broken() -> Self {
        FakeLauncher {
            fail_every_launch: true,
            ..Self::serving(vec![])
        }
    }

    /// Launch number `n` (1-based) fails.
    pub fn failing_launch_on(mut self, n: usize) -> Self {
        self.failing_launches.push(n);
        self
    }

    /// Navigation number `n` (1-based, counted across sessions) fails.
    pub fn failing_navigation_on(mut self, n: usize) -> Self {
        self.failing_navigations.push(n);
        self
    }

    pub fn log(&self) -> Arc<Mutex<BrowserLog>> {
        self.log.clone()
    }
}

impl BrowserLauncher for FakeLauncher {
    fn launch(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        let launch = {
            let mut log = self.log.lock().unwrap();
            log.launches += 1;
            log.launches
        };
        if self.fail_every_launch || self.failing_launches.contains(&launch) {
            return Err(FetchError::Launch("chrome not found".to_string()));
        }
        Ok(Box::new(FakeSession {
            pages: self.pages.clone(),
            failing_navigations: self.failing_navigations.clone(),
            log: self.log.clone(),
            current: None,
            closed: false,
        }))
    }
}

struct FakeSession {
    pages: Arc<Vec<String>>,
    failing_navigations: Vec<usize>,
    log: Arc<Mutex<BrowserLog>>,
    current: Option<String>,
    closed: bool,
}

impl BrowserSession for FakeSession {
    fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        let mut log = self.log.lock().unwrap();
        log.visited.push(url.to_string());
        let n = log.visited.len();
        if self.failing_navigations.contains(&n) {
            self.current = None;
            return Err(FetchError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        self.current = if self.pages.is_empty() {
            Some(String::new())
        } else {
            Some(self.pages[(n - 1) % self.pages.len()].clone())
        };
        Ok(())
    }

    fn wait_for(&mut self, selector: &str, _timeout: Duration) -> Result<(), FetchError> {
        self.log.lock().unwrap().waited_for.push(selector.to_string());
        Ok(())
    }

    fn content(&mut self) -> Result<String, FetchError> {
        self.current.clone().ok_or_else(|| FetchError::Content {
            url: String::new(),
            reason: "nothing loaded".to_string(),
        })
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.log.lock().unwrap().closes += 1;
        }
    }
}

#[derive(Debug, Default)]
pub struct SinkLog {
    pub starts: Vec<RunRequest>,
    pub submitted: Vec<JobRecord>,
    pub finishes: Vec<u64>,
}

/// Accepts every job as new unless an outcome is scripted for its title.
#[derive(Default)]
pub struct RecordingSink {
    outcomes: HashMap<String, SubmitOutcome>,
    log: Mutex<SinkLog>,
}

impl RecordingSink {
    pub fn with_outcome(mut self, title: &str, outcome: SubmitOutcome) -> Self {
        self.outcomes.insert(title.to_string(), outcome);
        self
    }

    pub fn starts(&self) -> usize {
        self.log.lock().unwrap().starts.len()
    }

    pub fn submitted_titles(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .submitted
            .iter()
            .map(|job| job.title.clone())
            .collect()
    }

    pub fn finishes(&self) -> Vec<u64> {
        self.log.lock().unwrap().finishes.clone()
    }
}

impl JobSink for RecordingSink {
    fn notify_start(&self, request: &RunRequest) -> bool {
        self.log.lock().unwrap().starts.push(request.clone());
        true
    }

    fn submit(&self, job: &JobRecord) -> SubmitOutcome {
        self.log.lock().unwrap().submitted.push(job.clone());
        self.outcomes
            .get(&job.title)
            .copied()
            .unwrap_or(SubmitOutcome::Created)
    }

    fn notify_finish(&self, total_new: u64) -> bool {
        self.log.lock().unwrap().finishes.push(total_new);
        true
    }
}

impl<T: JobSink + ?Sized> JobSink for Arc<T> {
    fn notify_start(&self, request: &RunRequest) -> bool {
        (**self).notify_start(request)
    }

    fn submit(&self, job: &JobRecord) -> SubmitOutcome {
        (**self).submit(job)
    }

    fn notify_finish(&self, total_new: u64) -> bool {
        (**self).notify_finish(total_new)
    }
}
