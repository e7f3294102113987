use chrono::{DateTime, Utc};

use super::JobSource;
use crate::error::ExtractError;
use crate::extractor::{CardExtractor, CardLayout};
use crate::models::JobRecord;

pub const ORIGIN: &str = "https://www.zhipin.com";
const SOURCE_LABEL: &str = "Boss直聘";

const LAYOUT: CardLayout = CardLayout {
    card: "div.job-card-wrapper",
    title: "span.job-name",
    company: "h3.name",
    salary: "span.salary",
    location: "span.job-area",
    experience: "span.job-experience",
    education: "span.job-degree",
    link: "a",
    tag: "li.tag-item",
};

/// Boss直聘. The listing page carries no description, requirements or
/// publish date, so those fall back to defaults.
pub struct Zhipin {
    extractor: CardExtractor,
}

impl Zhipin {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Zhipin {
            extractor: CardExtractor::new(LAYOUT, ORIGIN, SOURCE_LABEL)?,
        })
    }
}

impl JobSource for Zhipin {
    fn name(&self) -> &'static str {
        "zhipin"
    }

    fn search_url(&self, keyword: &str, city: &str, page: u32) -> String {
        format!(
            "{}/web/geek/job?query={}&city={}&page={}",
            ORIGIN,
            urlencoding::encode(keyword),
            urlencoding::encode(city),
            page
        )
    }

    fn card_selector(&self) -> &'static str {
        self.extractor.card_selector()
    }

    fn extract(&self, markup: &str, scraped_at: DateTime<Utc>) -> Vec<JobRecord> {
        self.extractor.extract(markup, scraped_at)
    }
}
