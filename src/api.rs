//! Synchronous client for the **World Bank Indicators API (v2)**.
//!
//! This module focuses on the `country/{codes}/indicator/{code}` endpoint and returns
//! results as a tidy [`Table`]. Pagination is handled automatically, one page at a time.
//!
//! ### Notes
//! - The API sometimes serializes `per_page` as a **string**; we accept both string/number.
//! - Failures are not retried. Transport errors come back as [`Error::Fetch`] so the caller
//!   can offer a manual retry.
//!
//! Typical usage:
//! ```no_run
//! # use wbi_reporter::{Client, Query};
//! let client = Client::default();
//! let q = Query::new(["DEU"], "SP.POP.TOTL", 2019, 2020)?;
//! let table = client.fetch(&q)?;
//! # Ok::<(), wbi_reporter::Error>(())
//! ```
use crate::cache::Loader;
use crate::error::Error;
use crate::models::{Meta, Query, Table};
use crate::normalize::normalize;
use crate::request::{DEFAULT_PER_PAGE, RequestDescriptor, build_requests};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";

// Safety cap to avoid pathological jobs
const MAX_PAGES: u32 = 1000;

#[derive(Debug, Clone)]
pub struct Client {
    pub base_url: String,
    pub api_key: Option<String>,
    pub per_page: u32,
    http: HttpClient,
}

impl Default for Client {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }
}

impl Client {
    /// Client against another base URL (a mirror, or a mock server in tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30)) // total request timeout
            .connect_timeout(Duration::from_secs(10)) // connect timeout
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("wbi_reporter/", env!("CARGO_PKG_VERSION"))) // set user agent
            .build()
            .expect("reqwest client build");
        Self {
            base_url: base_url.into(),
            api_key: None,
            per_page: DEFAULT_PER_PAGE,
            http,
        }
    }

    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Fetch and normalize every observation matching `query`.
    pub fn fetch(&self, query: &Query) -> Result<Table, Error> {
        let entries = self.fetch_entries(query)?;
        let table = normalize(&entries);
        if table.len() < entries.len() {
            log::warn!(
                "{}: kept {} of {} entries",
                query.cache_key(),
                table.len(),
                entries.len()
            );
        }
        Ok(table)
    }

    /// Raw data entries of every page, in page order.
    ///
    /// Page 1 is requested first; the envelope's page count drives the remaining requests,
    /// which are issued sequentially.
    pub fn fetch_entries(&self, query: &Query) -> Result<Vec<Value>, Error> {
        let first = build_requests(&self.base_url, query, self.api_key.as_deref(), self.per_page)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidQuery("no request to issue".into()))?;

        let mut out = Vec::new();
        let mut req = first;
        loop {
            let url = req.url();
            if req.page > MAX_PAGES {
                return Err(Error::source_error(
                    &url,
                    None,
                    format!("page limit exceeded ({MAX_PAGES})"),
                ));
            }
            let (meta, entries) = parse_page(&url, self.get_json(&req)?)?;
            log::debug!(
                "page {}/{} of {}: {} entries",
                req.page,
                meta.pages,
                query.cache_key(),
                entries.len()
            );
            out.extend(entries);

            if req.page >= meta.pages {
                break;
            }
            req = req.for_page(req.page + 1);
        }
        Ok(out)
    }

    fn get_json(&self, req: &RequestDescriptor) -> Result<Value, Error> {
        let url = req.url();
        let fetch_err = |source: reqwest::Error| Error::Fetch {
            url: url.clone(),
            source,
        };

        let resp = self.http.get(&url).send().map_err(fetch_err)?;
        let status = resp.status();
        let body = resp.text().map_err(fetch_err)?;
        if !status.is_success() {
            return Err(Error::source_error(&url, Some(status.as_u16()), body));
        }
        serde_json::from_str(&body).map_err(|e| {
            Error::source_error(
                &url,
                Some(status.as_u16()),
                format!("malformed json ({e}): {body}"),
            )
        })
    }
}

impl Loader for Client {
    fn load(&self, query: &Query) -> Result<Table, Error> {
        self.fetch(query)
    }
}

/// Split one decoded response into its envelope and data entries.
///
/// The API returns `[Meta, [Entry, ...]]`, or a `message` object in position 0 on error.
/// A `null` data array means the query matched nothing.
pub fn parse_page(url: &str, v: Value) -> Result<(Meta, Vec<Value>), Error> {
    let Value::Array(mut arr) = v else {
        return Err(Error::source_error(
            url,
            None,
            "unexpected response shape: not a top-level array",
        ));
    };
    if arr.is_empty() {
        return Err(Error::source_error(url, None, "unexpected response: empty array"));
    }

    // If first element has "message", surface API error.
    if arr[0].get("message").is_some() {
        return Err(Error::source_error(
            url,
            None,
            format!("world bank api error: {}", arr[0]),
        ));
    }

    let data = if arr.len() > 1 {
        arr.swap_remove(1)
    } else {
        Value::Null
    };
    let meta: Meta = serde_json::from_value(arr.swap_remove(0))
        .map_err(|e| Error::source_error(url, None, format!("parse envelope: {e}")))?;

    let entries = match data {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        other => {
            return Err(Error::source_error(
                url,
                None,
                format!("unexpected data section: {other}"),
            ));
        }
    };
    Ok((meta, entries))
}
