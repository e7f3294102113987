use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use log::{error, info};

use jobs_scraper_lib::delay_manager::ThreadSleeper;
use jobs_scraper_lib::scheduler::{self, Scheduler, ScheduledJob};
use jobs_scraper_lib::{logger, report};
use jobs_scraper_lib::{
    ApiClient, ChromeLauncher, PageFetcher, Pipeline, RunOutcome, RunRequest, ScraperConfig,
    SourceRegistry, Throttle, WaitStrategy,
};

#[derive(Parser)]
#[command(name = "jobs-scraper", version, about = "Scrape job listings and forward them to the job API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape once and exit.
    Run {
        #[arg(long = "source", default_values = ["zhipin"])]
        sources: Vec<String>,
        #[arg(long = "keyword", default_values = ["Python", "JavaScript", "Java"])]
        keywords: Vec<String>,
        #[arg(long = "city", default_values = ["北京", "上海", "深圳", "杭州"])]
        cities: Vec<String>,
        /// Result pages per keyword and city (defaults to SCRAPER_PAGES).
        #[arg(long)]
        pages: Option<u32>,
        /// Append per-query results to this CSV file.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Run the daily and hourly sweeps until killed.
    Schedule {
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn build_pipeline(config: &ScraperConfig) -> anyhow::Result<Pipeline> {
    let throttle = Throttle::with_thread_sleeper(config.throttle.clone());
    let wait = if config.browser.wait_for_cards {
        WaitStrategy::CardSelector(config.browser.navigation_timeout)
    } else {
        WaitStrategy::Settle
    };

    let registry = SourceRegistry::with_defaults().context("Failed to compile source selectors")?;
    let fetcher = PageFetcher::new(
        Box::new(ChromeLauncher::new(config.browser.clone())),
        throttle.clone(),
        wait,
    );
    let client = ApiClient::new(config.api.clone(), throttle.clone())
        .context("Failed to build job API client")?;

    info!("Job API: {}", config.api.base_url);
    Ok(Pipeline::new(registry, fetcher, Box::new(client), throttle))
}

fn write_report(path: Option<&PathBuf>, outcome: &RunOutcome) {
    if let Some(path) = path {
        if let Err(e) = report::append_report(path, outcome) {
            error!("Failed to write report {:?}: {}", path, e);
        }
    }
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let cli = Cli::parse();
    let config = ScraperConfig::from_env().context("Invalid configuration")?;
    let pipeline = build_pipeline(&config)?;

    match cli.command {
        Command::Run {
            sources,
            keywords,
            cities,
            pages,
            report,
        } => {
            let request = RunRequest::new(sources, keywords, cities)
                .with_pages(pages.unwrap_or(config.pages_per_query));
            let outcome = pipeline.run(&request);
            write_report(report.as_ref(), &outcome);
            info!("Scraping completed. {} new jobs added.", outcome.total_new);
        }
        Command::Schedule { report } => {
            let mut on_outcome = |job: &ScheduledJob, outcome: &RunOutcome| {
                info!("'{}' sweep added {} new jobs", job.name, outcome.total_new);
                write_report(report.as_ref(), outcome);
            };

            let jobs = scheduler::default_jobs(config.daily_at, config.pages_per_query);
            let mut scheduler = Scheduler::new(jobs, Local::now().naive_local());
            info!("Scheduler started: daily at {}, hourly sweep every hour", config.daily_at.format("%H:%M"));

            scheduler.run_now("daily", &pipeline, &mut on_outcome);
            if let Some(next) = scheduler.next_run("daily") {
                info!("Next daily sweep at {}", next);
            }
            scheduler.run_forever(&pipeline, &ThreadSleeper, on_outcome);
        }
    }

    Ok(())
}
