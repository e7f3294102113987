use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

impl Default for JobType {
    fn default() -> Self {
        JobType::FullTime
    }
}

/// One listing as submitted to the job API.
///
/// Only the card extractor builds these, and only when both `title` and
/// `company` are non-empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub tags: Vec<String>,
    pub job_type: JobType,
    pub experience: String,
    pub education: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
}

/// What one run should cover. Sources keep their first-seen order and are
/// deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub sources: Vec<String>,
    pub keywords: Vec<String>,
    pub cities: Vec<String>,
    pub pages_per_query: u32,
}

pub const DEFAULT_PAGES_PER_QUERY: u32 = 3;

impl RunRequest {
    pub fn new<S, K, C>(sources: S, keywords: K, cities: C) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        K: IntoIterator,
        K::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for source in sources {
            let source = source.into();
            if !unique.contains(&source) {
                unique.push(source);
            }
        }

        RunRequest {
            sources: unique,
            keywords: keywords.into_iter().map(Into::into).collect(),
            cities: cities.into_iter().map(Into::into).collect(),
            pages_per_query: DEFAULT_PAGES_PER_QUERY,
        }
    }

    pub fn with_pages(mut self, pages_per_query: u32) -> Self {
        self.pages_per_query = pages_per_query;
        self
    }

    pub fn triple_count(&self) -> usize {
        self.sources.len() * self.keywords.len() * self.cities.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created,
    Duplicate,
    Failed,
}

impl SubmitOutcome {
    /// 201 is the only status that means a new job; 409 is the API's
    /// duplicate signal. Everything else is a failure.
    pub fn from_status(status: u16) -> Self {
        match status {
            201 => SubmitOutcome::Created,
            409 => SubmitOutcome::Duplicate,
            _ => SubmitOutcome::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripleStatus {
    Completed,
    Failed(String),
}

/// Result of scraping and submitting one (source, keyword, city) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripleReport {
    pub source: String,
    pub keyword: String,
    pub city: String,
    pub pages_fetched: u32,
    pub pages_failed: u32,
    pub jobs_found: u64,
    pub created: u32,
    pub duplicate: u32,
    pub failed: u32,
    pub status: TripleStatus,
}

impl TripleReport {
    pub fn new(source: &str, keyword: &str, city: &str) -> Self {
        TripleReport {
            source: source.to_string(),
            keyword: keyword.to_string(),
            city: city.to_string(),
            pages_fetched: 0,
            pages_failed: 0,
            jobs_found: 0,
            created: 0,
            duplicate: 0,
            failed: 0,
            status: TripleStatus::Completed,
        }
    }

    pub fn failed(source: &str, keyword: &str, city: &str, reason: String) -> Self {
        TripleReport {
            status: TripleStatus::Failed(reason),
            ..TripleReport::new(source, keyword, city)
        }
    }

    pub fn record(&mut self, outcome: SubmitOutcome) {
        match outcome {
            SubmitOutcome::Created => self.created += 1,
            SubmitOutcome::Duplicate => self.duplicate += 1,
            SubmitOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub total_new: u64,
    pub total_duplicate: u64,
    pub total_failed: u64,
    pub jobs_found: u64,
    pub pages_failed: u64,
    pub triples_failed: u64,
    pub skipped_sources: Vec<String>,
    pub triples: Vec<TripleReport>,
}

impl RunOutcome {
    pub fn new(run_id: Uuid) -> Self {
        RunOutcome {
            run_id,
            total_new: 0,
            total_duplicate: 0,
            total_failed: 0,
            jobs_found: 0,
            pages_failed: 0,
            triples_failed: 0,
            skipped_sources: Vec::new(),
            triples: Vec::new(),
        }
    }

    pub fn absorb(&mut self, report: TripleReport) {
        self.total_new += u64::from(report.created);
        self.total_duplicate += u64::from(report.duplicate);
        self.total_failed += u64::from(report.failed);
        self.jobs_found += report.jobs_found;
        self.pages_failed += u64::from(report.pages_failed);
        if matches!(report.status, TripleStatus::Failed(_)) {
            self.triples_failed += 1;
        }
        self.triples.push(report);
    }
}
