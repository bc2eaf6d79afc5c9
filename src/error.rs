use thiserror::Error;

/// Failures that abort a query workflow.
#[derive(Debug, Error)]
pub enum Error {
    /// The query cannot be sent as given; raised before any I/O.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Transport failure (connect, timeout, body read). Safe to retry by hand.
    #[error("request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The data source answered, but not with something usable.
    #[error("{}", source_message(.url, .status, .body))]
    Source {
        url: String,
        status: Option<u16>,
        body: String,
    },
}

fn source_message(url: &str, status: &Option<u16>, body: &str) -> String {
    match status {
        Some(code) => format!("data source error (HTTP {code}) at {url}: {body}"),
        None => format!("data source error at {url}: {body}"),
    }
}

impl Error {
    /// Only transport failures are worth a manual retry; the others need a different query
    /// or a healthy source.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Fetch { .. })
    }

    pub(crate) fn source_error(url: &str, status: Option<u16>, body: impl Into<String>) -> Self {
        Error::Source {
            url: url.to_string(),
            status,
            body: truncate(body.into(), MAX_BODY),
        }
    }
}

/// A single raw record that could not be turned into an observation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {index}: {reason}")]
pub struct RowError {
    pub index: usize,
    pub reason: String,
}

const MAX_BODY: usize = 512;

fn truncate(mut s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    s.push('…');
    s
}
