use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Deref;

/// What to ask the World Bank for: one indicator across a set of countries and an inclusive
/// year range.
///
/// Country codes are kept trimmed, upper-cased and sorted, so two queries naming the same
/// countries in a different order (or case) are the same query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    pub country_codes: BTreeSet<String>,
    pub indicator_code: String,
    pub start_year: i32,
    pub end_year: i32,
}

impl Query {
    /// Build and validate a query.
    ///
    /// ```
    /// # use wbi_reporter::Query;
    /// let q = Query::new(["usa", " FRA "], "NY.GDP.PCAP.CD", 2015, 2017)?;
    /// assert_eq!(q.cache_key(), "FRA;USA|NY.GDP.PCAP.CD|2015:2017");
    /// # Ok::<(), wbi_reporter::Error>(())
    /// ```
    pub fn new<I, S>(countries: I, indicator: &str, start_year: i32, end_year: i32) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let q = Self {
            country_codes: countries
                .into_iter()
                .map(|c| c.as_ref().trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty())
                .collect(),
            indicator_code: indicator.trim().to_string(),
            start_year,
            end_year,
        };
        q.validate()?;
        Ok(q)
    }

    /// Check the query before any request is built.
    pub fn validate(&self) -> Result<(), Error> {
        if self.country_codes.is_empty() {
            return Err(Error::InvalidQuery(
                "at least one country/region code required".into(),
            ));
        }
        if self.country_codes.iter().any(|c| c.trim().is_empty()) {
            return Err(Error::InvalidQuery("blank country/region code".into()));
        }
        if self.indicator_code.trim().is_empty() {
            return Err(Error::InvalidQuery("indicator code required".into()));
        }
        if self.start_year > self.end_year {
            return Err(Error::InvalidQuery(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            )));
        }
        Ok(())
    }

    /// Cheap check for hosts that gate their submit action on it.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// `start:end`, as the `date` parameter expects it.
    pub fn date_param(&self) -> String {
        format!("{}:{}", self.start_year, self.end_year)
    }

    /// Country codes trimmed, upper-cased, de-duplicated and sorted. Both the request URL
    /// and the cache key are built from this, so equal keys always mean equal requests.
    pub fn canonical_countries(&self) -> Vec<String> {
        self.country_codes
            .iter()
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Order-independent key identifying this query in the cache.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.canonical_countries().join(";"),
            self.indicator_code.trim(),
            self.date_param()
        )
    }
}

/// Pagination envelope returned by the API (position 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub page: u32,
    pub pages: u32,
    /// Some responses encode `per_page` as a string, others as a number.
    /// Accept both and normalize to `u32`.
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub per_page: u32,
    #[serde(default, deserialize_with = "de_u32_from_string_or_number")]
    pub total: u32,
}

/// Serde helper: parse `u32` from either a JSON number or a string.
fn de_u32_from_string_or_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct U32Visitor;

    impl<'de> Visitor<'de> for U32Visitor {
        type Value = u32;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a string or integer representing a non-negative number")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u32::try_from(v).map_err(E::custom)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u32::try_from(v).map_err(|_| E::custom("value out of range for u32"))
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            s.trim().parse::<u32>().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(U32Visitor)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeName {
    pub id: String,
    pub value: String,
}

/// Raw entry from the API (position 1 array).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub indicator: CodeName,
    pub country: CodeName,
    #[serde(default)]
    pub countryiso3code: Option<String>,
    pub date: String,
    #[serde(default)]
    pub value: Option<f64>,
}

/// One row of the result table: a country/indicator/year observation.
///
/// `value` is `None` when the source has no data for that year. Zero is a real value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub country_id: String,
    pub country_name: String,
    pub country_iso3: Option<String>,
    pub indicator_id: String,
    pub indicator_name: String,
    pub year: i32,
    pub value: Option<f64>,
}

/// Observations in source page order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    rows: Vec<Observation>,
}

impl Table {
    pub fn new(rows: Vec<Observation>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Observation> {
        self.rows
    }

    /// Compact comma-delimited rendering (header + one line per row), used as context text
    /// for the summarizer. Missing values are left empty.
    pub fn to_delimited(&self) -> Result<String, csv::Error> {
        let mut wtr = csv::WriterBuilder::new().from_writer(Vec::new());
        wtr.write_record(["country_id", "country_name", "indicator_id", "year", "value"])?;
        for o in &self.rows {
            wtr.serialize((
                &o.country_id,
                &o.country_name,
                &o.indicator_id,
                o.year,
                o.value,
            ))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Deref for Table {
    type Target = [Observation];

    fn deref(&self) -> &[Observation] {
        &self.rows
    }
}

impl From<Vec<Observation>> for Table {
    fn from(rows: Vec<Observation>) -> Self {
        Self::new(rows)
    }
}
