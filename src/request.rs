//! Turns a [`Query`] into the URLs of the `country/{codes}/indicator/{code}` endpoint.

use crate::error::Error;
use crate::models::Query;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

/// Rows requested per page. The API accepts large pages, so most queries fit in one.
pub const DEFAULT_PER_PAGE: u32 = 1000;

// Allow -, _, . unescaped in codes (common for indicator ids)
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

fn enc(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s.trim(), SAFE).to_string()
}

fn enc_join<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts.into_iter().map(enc).collect::<Vec<_>>().join(";")
}

/// One GET request against the data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Everything up to, but excluding, the `page` parameter.
    base: String,
    pub page: u32,
    pub per_page: u32,
}

impl RequestDescriptor {
    /// Same request, different page.
    pub fn for_page(&self, page: u32) -> Self {
        Self {
            base: self.base.clone(),
            page,
            per_page: self.per_page,
        }
    }

    pub fn url(&self) -> String {
        format!("{}&page={}", self.base, self.page)
    }
}

/// Build the descriptors needed to start retrieving `query`.
///
/// The page count is only known once page 1 has answered, so this yields a single
/// descriptor; the fetcher derives the rest with [`RequestDescriptor::for_page`].
pub fn build_requests(
    base_url: &str,
    query: &Query,
    api_key: Option<&str>,
    per_page: u32,
) -> Result<Vec<RequestDescriptor>, Error> {
    query.validate()?;
    if per_page == 0 {
        return Err(Error::InvalidQuery("per_page must be positive".into()));
    }

    let countries = query.canonical_countries();
    let country_spec = enc_join(countries.iter().map(String::as_str));
    let mut base = format!(
        "{}/country/{}/indicator/{}?date={}&format=json&per_page={}",
        base_url.trim_end_matches('/'),
        country_spec,
        enc(&query.indicator_code),
        query.date_param(),
        per_page
    );
    if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
        base.push_str(&format!("&api_key={}", enc(key)));
    }

    Ok(vec![RequestDescriptor {
        base,
        page: 1,
        per_page,
    }])
}
