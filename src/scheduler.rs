use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use log::info;

use crate::delay_manager::Sleeper;
use crate::models::{RunOutcome, RunRequest};
use crate::pipeline::Pipeline;

pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cadence {
    /// Once a day at a local wall-clock time.
    DailyAt(NaiveTime),
    /// A fixed interval after the previous run finished.
    Every(chrono::Duration),
}

impl Cadence {
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self {
            Cadence::DailyAt(at) => {
                let today = now.date().and_time(*at);
                if today > now {
                    today
                } else {
                    today + chrono::Duration::days(1)
                }
            }
            Cadence::Every(interval) => now + *interval,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub name: &'static str,
    pub cadence: Cadence,
    pub request: RunRequest,
}

/// The daily full sweep and the hourly sweep over the busiest queries.
pub fn default_jobs(daily_at: NaiveTime, pages_per_query: u32) -> Vec<ScheduledJob> {
    vec![
        ScheduledJob {
            name: "daily",
            cadence: Cadence::DailyAt(daily_at),
            request: RunRequest::new(
                ["zhipin"],
                ["Python", "JavaScript", "Java", "Node.js", "React", "Vue"],
                ["北京", "上海", "深圳", "杭州", "广州"],
            )
            .with_pages(pages_per_query),
        },
        ScheduledJob {
            name: "hourly",
            cadence: Cadence::Every(chrono::Duration::hours(1)),
            request: RunRequest::new(["zhipin"], ["Python", "JavaScript"], ["北京", "上海"])
                .with_pages(pages_per_query),
        },
    ]
}

struct Entry {
    job: ScheduledJob,
    next_run: NaiveDateTime,
}

/// Runs scheduled jobs one after another on the calling thread, so two runs
/// never overlap. A job that comes due while another is running waits for
/// the next poll.
pub struct Scheduler {
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new(jobs: Vec<ScheduledJob>, now: NaiveDateTime) -> Self {
        let entries = jobs
            .into_iter()
            .map(|job| Entry {
                next_run: job.cadence.next_after(now),
                job,
            })
            .collect();
        Scheduler { entries }
    }

    pub fn next_run(&self, name: &str) -> Option<NaiveDateTime> {
        self.entries
            .iter()
            .find(|entry| entry.job.name == name)
            .map(|entry| entry.next_run)
    }

    /// Indices of jobs whose next run is at or before `now`.
    pub fn due(&self, now: NaiveDateTime) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.next_run <= now)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn mark_ran(&mut self, index: usize, finished_at: NaiveDateTime) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.next_run = entry.job.cadence.next_after(finished_at);
        }
    }

    /// Runs the named job right away without touching its schedule.
    pub fn run_now<F>(&self, name: &str, pipeline: &Pipeline, on_outcome: &mut F) -> bool
    where
        F: FnMut(&ScheduledJob, &RunOutcome),
    {
        match self.entries.iter().find(|entry| entry.job.name == name) {
            Some(entry) => {
                info!("Running '{}' job immediately", name);
                let outcome = pipeline.run(&entry.job.request);
                on_outcome(&entry.job, &outcome);
                true
            }
            None => false,
        }
    }

    /// Runs every job due at `clock()`, rescheduling each from the time it
    /// finished. Returns how many ran.
    pub fn run_due<C, F>(&mut self, clock: &C, pipeline: &Pipeline, on_outcome: &mut F) -> usize
    where
        C: Fn() -> NaiveDateTime,
        F: FnMut(&ScheduledJob, &RunOutcome),
    {
        let due = self.due(clock());
        for &index in &due {
            let entry = &self.entries[index];
            info!("Starting scheduled '{}' job", entry.job.name);
            let outcome = pipeline.run(&entry.job.request);
            info!(
                "Scheduled '{}' job done, {} new jobs",
                entry.job.name, outcome.total_new
            );
            on_outcome(&entry.job, &outcome);

            self.mark_ran(index, clock());
        }
        due.len()
    }

    pub fn run_forever<F>(&mut self, pipeline: &Pipeline, sleeper: &dyn Sleeper, mut on_outcome: F)
    where
        F: FnMut(&ScheduledJob, &RunOutcome),
    {
        for entry in &self.entries {
            info!("Job '{}' next runs at {}", entry.job.name, entry.next_run);
        }

        let clock = || Local::now().naive_local();
        loop {
            self.run_due(&clock, pipeline, &mut on_outcome);
            sleeper.sleep(POLL_INTERVAL);
        }
    }
}
