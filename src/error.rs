use thiserror::Error;

/// Failure to load one search-results page. Recovered at page or triple scope.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out waiting for `{selector}` on {url}")]
    WaitTimeout { url: String, selector: String },

    #[error("could not read rendered markup of {url}: {reason}")]
    Content { url: String, reason: String },
}

/// Failure to turn markup into a job record. Recovered at card scope.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid source origin `{origin}`: {source}")]
    InvalidOrigin {
        origin: String,
        #[source]
        source: url::ParseError,
    },

    #[error("card has no {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Server { status: u16, body: String },
}

impl SubmitError {
    pub fn is_transport(&self) -> bool {
        matches!(self, SubmitError::Transport(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: `{value}` ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
