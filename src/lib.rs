pub mod browser;
pub mod config;
pub mod delay_manager;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod sources;
pub mod submission;

#[cfg(test)]
mod testing;

// Exporting types for convenience
pub use browser::ChromeLauncher;
pub use config::ScraperConfig;
pub use delay_manager::Throttle;
pub use fetcher::{PageFetcher, WaitStrategy};
pub use models::{JobRecord, RunOutcome, RunRequest, SubmitOutcome};
pub use pipeline::Pipeline;
pub use sources::{JobSource, SourceRegistry};
pub use submission::{ApiClient, JobSink};
