//! Raw API entries to [`Observation`] rows.
//!
//! Malformed entries are dropped one at a time (with a warning) rather than failing the
//! whole page: one broken record should not void an otherwise useful table.

use crate::error::RowError;
use crate::models::{Entry, Observation, Table};
use serde::Deserialize;
use serde_json::Value;

/// Map every well-formed entry to one observation, keeping input order.
pub fn normalize(entries: &[Value]) -> Table {
    let mut rows = Vec::with_capacity(entries.len());
    for (index, raw) in entries.iter().enumerate() {
        match normalize_entry(index, raw) {
            Ok(o) => rows.push(o),
            Err(e) => log::warn!("dropping malformed entry: {e}"),
        }
    }
    Table::new(rows)
}

/// Convert a single raw entry. `index` only labels the error.
pub fn normalize_entry(index: usize, raw: &Value) -> Result<Observation, RowError> {
    let fail = |reason: String| RowError { index, reason };

    let e = Entry::deserialize(raw).map_err(|err| fail(err.to_string()))?;
    let year = e
        .date
        .trim()
        .parse::<i32>()
        .map_err(|_| fail(format!("unparsable year {:?}", e.date)))?;

    Ok(Observation {
        country_id: e.country.id,
        country_name: e.country.value,
        country_iso3: e.countryiso3code.filter(|s| !s.trim().is_empty()),
        indicator_id: e.indicator.id,
        indicator_name: e.indicator.value,
        year,
        value: e.value,
    })
}
