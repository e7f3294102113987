use chrono::{DateTime, Utc};
use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ExtractError;
use crate::models::{JobRecord, JobType};

/// Where each field of a job card lives, as CSS selectors. Every field
/// selector is evaluated relative to one card.
#[derive(Debug, Clone, Copy)]
pub struct CardLayout {
    pub card: &'static str,
    pub title: &'static str,
    pub company: &'static str,
    pub salary: &'static str,
    pub location: &'static str,
    pub experience: &'static str,
    pub education: &'static str,
    pub link: &'static str,
    pub tag: &'static str,
}

struct CardSelectors {
    card: Selector,
    title: Selector,
    company: Selector,
    salary: Selector,
    location: Selector,
    experience: Selector,
    education: Selector,
    link: Selector,
    tag: Selector,
}

impl CardSelectors {
    fn compile(layout: &CardLayout) -> Result<Self, ExtractError> {
        Ok(CardSelectors {
            card: compile(layout.card)?,
            title: compile(layout.title)?,
            company: compile(layout.company)?,
            salary: compile(layout.salary)?,
            location: compile(layout.location)?,
            experience: compile(layout.experience)?,
            education: compile(layout.education)?,
            link: compile(layout.link)?,
            tag: compile(layout.tag)?,
        })
    }
}

/// Turns a rendered search-results page into job records.
///
/// Fields are read independently: a missing element leaves that field empty
/// and never affects the other fields or the other cards. Cards without a
/// title or company are dropped.
pub struct CardExtractor {
    layout: CardLayout,
    selectors: CardSelectors,
    origin: Url,
    source_label: String,
}

impl CardExtractor {
    pub fn new(layout: CardLayout, origin: &str, source_label: &str) -> Result<Self, ExtractError> {
        let origin = Url::parse(origin).map_err(|source| ExtractError::InvalidOrigin {
            origin: origin.to_string(),
            source,
        })?;

        Ok(CardExtractor {
            selectors: CardSelectors::compile(&layout)?,
            layout,
            origin,
            source_label: source_label.to_string(),
        })
    }

    pub fn card_selector(&self) -> &'static str {
        self.layout.card
    }

    pub fn extract(&self, markup: &str, scraped_at: DateTime<Utc>) -> Vec<JobRecord> {
        let document = Html::parse_document(markup);
        let mut jobs = Vec::new();
        let mut dropped = 0usize;

        for (index, card) in document.select(&self.selectors.card).enumerate() {
            match self.parse_card(card, scraped_at) {
                Ok(job) => jobs.push(job),
                Err(ExtractError::MissingField(field)) => {
                    dropped += 1;
                    debug!("Skipping card #{} from {}: no {}", index, self.source_label, field);
                }
                Err(e) => {
                    dropped += 1;
                    warn!("Failed to parse card #{} from {}: {}", index, self.source_label, e);
                }
            }
        }

        debug!(
            "Extracted {} jobs from {} markup ({} cards dropped)",
            jobs.len(),
            self.source_label,
            dropped
        );
        jobs
    }

    pub fn parse_card(
        &self,
        card: ElementRef<'_>,
        scraped_at: DateTime<Utc>,
    ) -> Result<JobRecord, ExtractError> {
        let s = &self.selectors;

        let title = first_text(card, &s.title);
        if title.is_empty() {
            return Err(ExtractError::MissingField("title"));
        }
        let company = first_text(card, &s.company);
        if company.is_empty() {
            return Err(ExtractError::MissingField("company"));
        }

        let url = card
            .select(&s.link)
            .next()
            .and_then(|link| link.value().attr("href"))
            .and_then(|href| resolve_link(&self.origin, href))
            .unwrap_or_default();

        Ok(JobRecord {
            description: format!("{}职位", title),
            title,
            company,
            location: first_text(card, &s.location),
            salary: first_text(card, &s.salary),
            requirements: Vec::new(),
            tags: all_texts(card, &s.tag),
            job_type: JobType::FullTime,
            experience: first_text(card, &s.experience),
            education: first_text(card, &s.education),
            url,
            source: self.source_label.clone(),
            published_at: scraped_at,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}

/// Text of an element with every text node trimmed and the non-empty pieces
/// joined without separators.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> String {
    card.select(selector).next().map(element_text).unwrap_or_default()
}

fn all_texts(card: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    card.select(selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Resolves `href` against the site origin. Absolute links come back as-is.
pub fn resolve_link(origin: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") {
        return None;
    }
    match origin.join(href) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            debug!("Unresolvable link '{}': {}", href, e);
            None
        }
    }
}
