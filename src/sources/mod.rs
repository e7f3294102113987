//! Recruiting sites the scraper knows how to read.
//!
//! Each site is a [`JobSource`]: it knows its search URL scheme and how to
//! pull job cards out of a rendered results page. The [`SourceRegistry`]
//! maps the names used in a run request to those implementations; a name
//! with no registered source is skipped by the pipeline rather than treated
//! as an error, so new sites can be added one at a time.

pub mod zhipin;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::ExtractError;
use crate::models::JobRecord;

pub use zhipin::Zhipin;

pub trait JobSource {
    /// Key used in run requests, e.g. `zhipin`.
    fn name(&self) -> &'static str;

    /// Search-results URL for one page of one query. `page` starts at 1.
    fn search_url(&self, keyword: &str, city: &str, page: u32) -> String;

    /// Selector matching one job card, used to wait for rendering.
    fn card_selector(&self) -> &'static str;

    fn extract(&self, markup: &str, scraped_at: DateTime<Utc>) -> Vec<JobRecord>;
}

#[derive(Default)]
pub struct SourceRegistry {
    sources: HashMap<&'static str, Box<dyn JobSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in source.
    pub fn with_defaults() -> Result<Self, ExtractError> {
        let mut registry = Self::new();
        registry.register(Box::new(Zhipin::new()?));
        Ok(registry)
    }

    pub fn register(&mut self, source: Box<dyn JobSource>) {
        self.sources.insert(source.name(), source);
    }

    pub fn resolve(&self, name: &str) -> Option<&dyn JobSource> {
        self.sources.get(name).map(|source| source.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.sources.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
