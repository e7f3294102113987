use chrono::Utc;
use log::{error, info, warn};
use uuid::Uuid;

use crate::delay_manager::Throttle;
use crate::error::FetchError;
use crate::fetcher::{log_page_failure, PageFetcher};
use crate::models::{JobRecord, RunOutcome, RunRequest, TripleReport};
use crate::sources::{JobSource, SourceRegistry};
use crate::submission::JobSink;

/// Drives one run: every source × keyword × city, scraped, extracted and
/// submitted in that order, one triple at a time.
///
/// There is no internal locking; callers must not start a second run while
/// one is in progress.
pub struct Pipeline {
    registry: SourceRegistry,
    fetcher: PageFetcher,
    sink: Box<dyn JobSink>,
    throttle: Throttle,
}

/// Jobs scraped for one triple, with page bookkeeping.
struct Scrape {
    jobs: Vec<JobRecord>,
    pages_fetched: u32,
    pages_failed: u32,
}

impl Pipeline {
    pub fn new(
        registry: SourceRegistry,
        fetcher: PageFetcher,
        sink: Box<dyn JobSink>,
        throttle: Throttle,
    ) -> Self {
        Pipeline {
            registry,
            fetcher,
            sink,
            throttle,
        }
    }

    pub fn run(&self, request: &RunRequest) -> RunOutcome {
        let mut outcome = RunOutcome::new(Uuid::new_v4());
        info!(
            "Run {} started: sources [{}] (registered: {}), keywords [{}], cities [{}], {} pages per query",
            outcome.run_id,
            request.sources.join(", "),
            self.registry.names().join(", "),
            request.keywords.join(", "),
            request.cities.join(", "),
            request.pages_per_query
        );

        if !self.sink.notify_start(request) {
            warn!("Job API did not acknowledge run start; continuing");
        }

        let mut scraped_any = false;
        for source_name in &request.sources {
            let Some(source) = self.registry.resolve(source_name) else {
                warn!("No scraper registered for source '{}', skipping", source_name);
                outcome.skipped_sources.push(source_name.clone());
                continue;
            };

            for keyword in &request.keywords {
                for city in &request.cities {
                    if scraped_any {
                        self.throttle.triple_pause();
                    }
                    scraped_any = true;

                    let report = match self.run_triple(source, keyword, city, request.pages_per_query) {
                        Ok(report) => {
                            info!(
                                "{} - {} - {}: {} new, {} duplicate, {} failed",
                                source_name,
                                keyword,
                                city,
                                report.created,
                                report.duplicate,
                                report.failed
                            );
                            report
                        }
                        Err(e) => {
                            error!("Scrape failed {} - {} - {}: {}", source_name, keyword, city, e);
                            TripleReport::failed(source_name, keyword, city, e.to_string())
                        }
                    };
                    outcome.absorb(report);
                }
            }
        }

        if !self.sink.notify_finish(outcome.total_new) {
            warn!("Job API did not acknowledge run finish");
        }

        info!(
            "Run {} finished: {} new, {} duplicate, {} failed submissions; {} jobs found, {} pages and {} queries failed",
            outcome.run_id,
            outcome.total_new,
            outcome.total_duplicate,
            outcome.total_failed,
            outcome.jobs_found,
            outcome.pages_failed,
            outcome.triples_failed
        );
        outcome
    }

    /// Scrapes and submits one triple. Only a browser that will not start
    /// fails the whole triple; page and submission failures are counted.
    fn run_triple(
        &self,
        source: &dyn JobSource,
        keyword: &str,
        city: &str,
        pages: u32,
    ) -> Result<TripleReport, FetchError> {
        let scrape = self.scrape(source, keyword, city, pages)?;

        let mut report = TripleReport::new(source.name(), keyword, city);
        report.pages_fetched = scrape.pages_fetched;
        report.pages_failed = scrape.pages_failed;
        report.jobs_found = u64::try_from(scrape.jobs.len()).unwrap_or(u64::MAX);

        for job in &scrape.jobs {
            report.record(self.sink.submit(job));
        }
        Ok(report)
    }

    fn scrape(
        &self,
        source: &dyn JobSource,
        keyword: &str,
        city: &str,
        pages: u32,
    ) -> Result<Scrape, FetchError> {
        let mut session = self.fetcher.open()?;
        let mut scrape = Scrape {
            jobs: Vec::new(),
            pages_fetched: 0,
            pages_failed: 0,
        };

        for page in 1..=pages {
            match session.fetch(source, keyword, city, page) {
                Ok(markup) => {
                    let jobs = source.extract(&markup, Utc::now());
                    info!(
                        "{} page {} for {} - {} done, {} jobs",
                        source.name(),
                        page,
                        keyword,
                        city,
                        jobs.len()
                    );
                    scrape.pages_fetched += 1;
                    scrape.jobs.extend(jobs);
                }
                Err(e) => {
                    scrape.pages_failed += 1;
                    log_page_failure(source.name(), keyword, city, page, &e);
                }
            }
        }

        Ok(scrape)
    }
}
