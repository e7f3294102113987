use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Serialize;

use crate::config::ApiConfig;
use crate::delay_manager::Throttle;
use crate::error::SubmitError;
use crate::models::{JobRecord, RunRequest, SubmitOutcome};

/// Downstream receiver of scraped jobs and run notifications.
///
/// None of these calls fail from the caller's point of view: problems are
/// logged and surface as `false` or [`SubmitOutcome::Failed`].
pub trait JobSink {
    fn notify_start(&self, request: &RunRequest) -> bool;

    fn submit(&self, job: &JobRecord) -> SubmitOutcome;

    fn notify_finish(&self, total_new: u64) -> bool;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartNotice<'a> {
    sources: &'a [String],
    keywords: &'a [String],
    cities: &'a [String],
    start_time: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FinishNotice {
    total_scraped: u64,
    finish_time: DateTime<Utc>,
}

/// Client for the job API's scraper endpoints.
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
    throttle: Throttle,
}

impl ApiClient {
    pub fn new(config: ApiConfig, throttle: Throttle) -> Result<Self, SubmitError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(ApiClient {
            client,
            config,
            throttle,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/jobs/scraper/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T, timeout: Duration) -> RequestBuilder {
        let request = self
            .client
            .post(self.endpoint(path))
            .timeout(timeout)
            .json(body);
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// One POST of `job`, with no retry.
    pub fn try_submit(&self, job: &JobRecord) -> Result<SubmitOutcome, SubmitError> {
        let resp = self.post("save", job, self.config.submit_timeout).send()?;
        let status = resp.status();

        match SubmitOutcome::from_status(status.as_u16()) {
            SubmitOutcome::Failed => {
                let body = resp.text().unwrap_or_default();
                Err(SubmitError::Server {
                    status: status.as_u16(),
                    body,
                })
            }
            outcome => Ok(outcome),
        }
    }

    fn notify<T: Serialize>(&self, path: &str, body: &T) -> Result<bool, SubmitError> {
        let resp = self.post(path, body, self.config.notify_timeout).send()?;
        let status = resp.status();
        if status.as_u16() == 200 {
            return Ok(true);
        }
        let body = resp.text().unwrap_or_default();
        warn!("Scraper {} notice rejected with status {}: {}", path, status, body);
        Ok(false)
    }
}

impl JobSink for ApiClient {
    fn notify_start(&self, request: &RunRequest) -> bool {
        let notice = StartNotice {
            sources: &request.sources,
            keywords: &request.keywords,
            cities: &request.cities,
            start_time: Utc::now(),
        };
        self.notify("start", &notice).unwrap_or_else(|e| {
            error!("Failed to notify API of scrape start: {}", e);
            false
        })
    }

    fn submit(&self, job: &JobRecord) -> SubmitOutcome {
        let mut attempt = 0;
        loop {
            match self.try_submit(job) {
                Ok(SubmitOutcome::Created) => {
                    info!("Saved new job: {} - {}", job.title, job.company);
                    return SubmitOutcome::Created;
                }
                Ok(outcome) => {
                    info!("Job already exists: {} - {}", job.title, job.company);
                    return outcome;
                }
                Err(e) if e.is_transport() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!("Submitting {} - {} failed: {}", job.title, job.company, e);
                    self.throttle.retry_backoff(attempt);
                }
                Err(e) => {
                    error!("Failed to save job {} - {}: {}", job.title, job.company, e);
                    return SubmitOutcome::Failed;
                }
            }
        }
    }

    fn notify_finish(&self, total_new: u64) -> bool {
        let notice = FinishNotice {
            total_scraped: total_new,
            finish_time: Utc::now(),
        };
        self.notify("finish", &notice).unwrap_or_else(|e| {
            error!("Failed to notify API of scrape finish: {}", e);
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThrottleConfig;
    use crate::models::JobType;
    use crate::testing::RecordingSleeper;
    use mockito::Matcher;
    use serde_json::json;
    use std::sync::Arc;

    fn job() -> JobRecord {
        JobRecord {
            title: "Python开发工程师".into(),
            company: "某科技有限公司".into(),
            location: "北京".into(),
            salary: "20-35K".into(),
            description: "Python开发工程师职位".into(),
            requirements: vec![],
            tags: vec!["Python".into(), "Django".into()],
            job_type: JobType::FullTime,
            experience: "3-5年".into(),
            education: "本科".into(),
            url: "https://www.zhipin.com/job_detail/a1b2c3.html".into(),
            source: "Boss直聘".into(),
            published_at: Utc::now(),
        }
    }

    fn api_client(base_url: String, token: Option<&str>) -> (ApiClient, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let config = ApiConfig {
            base_url,
            token: token.map(str::to_string),
            ..ApiConfig::default()
        };
        let throttle = Throttle::new(ThrottleConfig::default(), sleeper.clone());
        (ApiClient::new(config, throttle).unwrap(), sleeper)
    }

    #[test]
    fn test_submit_created_with_bearer_token() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/jobs/scraper/save")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(json!({
                "title": "Python开发工程师",
                "company": "某科技有限公司",
                "jobType": "full-time",
                "tags": ["Python", "Django"],
                "requirements": []
            })))
            .with_status(201)
            .with_body(r#"{"message":"ok","jobId":"1"}"#)
            .create();

        let (client, _) = api_client(format!("{}/api", server.url()), Some("secret"));
        assert_eq!(client.submit(&job()), SubmitOutcome::Created);
        mock.assert();
    }

    #[test]
    fn test_submit_without_token_sends_no_auth_header() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/jobs/scraper/save")
            .match_header("authorization", Matcher::Missing)
            .with_status(201)
            .create();

        let (client, _) = api_client(format!("{}/api", server.url()), None);
        assert_eq!(client.submit(&job()), SubmitOutcome::Created);
        mock.assert();
    }

    #[test]
    fn test_submit_conflict_is_duplicate() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/jobs/scraper/save")
            .with_status(409)
            .with_body(r#"{"message":"职位已存在"}"#)
            .expect(1)
            .create();

        let (client, sleeper) = api_client(format!("{}/api", server.url()), None);
        assert_eq!(client.submit(&job()), SubmitOutcome::Duplicate);
        mock.assert();
        assert!(sleeper.recorded().is_empty());
    }

    #[test]
    fn test_server_errors_fail_without_retry() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/jobs/scraper/save")
            .with_status(500)
            .with_body("boom")
            .expect(2)
            .create();

        let (client, _) = api_client(format!("{}/api", server.url()), None);
        match client.try_submit(&job()) {
            Err(SubmitError::Server { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(client.submit(&job()), SubmitOutcome::Failed);
        mock.assert();
    }

    #[test]
    fn test_bad_request_is_failure() {
        let mut server = mockito::Server::new();
        let _bad = server.mock("POST", "/api/jobs/scraper/save").with_status(400).create();
        let (client, _) = api_client(format!("{}/api", server.url()), None);
        assert_eq!(client.submit(&job()), SubmitOutcome::Failed);
    }

    #[test]
    fn test_transport_error_retries_once_then_fails() {
        // Nothing listens on port 1.
        let (client, sleeper) = api_client("http://127.0.0.1:1/api".to_string(), None);
        assert_eq!(client.submit(&job()), SubmitOutcome::Failed);
        assert_eq!(sleeper.recorded(), vec![Duration::from_millis(500)]);
    }

    #[test]
    fn test_notify_start_posts_configuration() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/jobs/scraper/start")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({
                    "sources": ["zhipin"],
                    "keywords": ["Python", "Java"],
                    "cities": ["北京"]
                })),
                Matcher::Regex(r#""startTime":"\d{4}-\d{2}-\d{2}T"#.to_string()),
            ]))
            .with_status(200)
            .create();

        let (client, _) = api_client(format!("{}/api", server.url()), None);
        let request = RunRequest::new(["zhipin"], ["Python", "Java"], ["北京"]);
        assert!(client.notify_start(&request));
        mock.assert();
    }

    #[test]
    fn test_notify_finish_posts_total() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/jobs/scraper/finish")
            .match_body(Matcher::PartialJson(json!({ "totalScraped": 7 })))
            .with_status(200)
            .create();

        let (client, _) = api_client(format!("{}/api/", server.url()), None);
        assert!(client.notify_finish(7));
        mock.assert();
    }

    #[test]
    fn test_notify_failures_are_false() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("POST", "/api/jobs/scraper/finish").with_status(201).create();
        let (client, _) = api_client(format!("{}/api", server.url()), None);
        assert!(!client.notify_finish(1));

        let (unreachable, _) = api_client("http://127.0.0.1:1/api".to_string(), None);
        assert!(!unreachable.notify_finish(1));
        assert!(!unreachable.notify_start(&RunRequest::new(["zhipin"], ["Go"], ["上海"])));
    }
}
