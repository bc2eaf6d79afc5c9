use crate::models::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary statistics for one country's series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountrySummary {
    pub country_name: String,
    pub count: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

/// Compute statistics per country, ordered by country name.
pub fn by_country(table: &Table) -> Vec<CountrySummary> {
    let mut groups: BTreeMap<&str, (Vec<f64>, usize)> = BTreeMap::new();
    for o in table.iter() {
        let (vals, missing) = groups.entry(o.country_name.as_str()).or_default();
        match o.value {
            Some(v) if v.is_finite() => vals.push(v),
            _ => *missing += 1,
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for (name, (mut vals, missing)) in groups {
        vals.sort_by(f64::total_cmp);
        let count = vals.len();
        let mean = if count > 0 {
            Some(vals.iter().sum::<f64>() / count as f64)
        } else {
            None
        };
        let median = if count == 0 {
            None
        } else if count % 2 == 1 {
            Some(vals[count / 2])
        } else {
            Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
        };
        out.push(CountrySummary {
            country_name: name.to_string(),
            count,
            missing,
            min: vals.first().copied(),
            max: vals.last().copied(),
            mean,
            median,
        });
    }
    out
}

/// One line per country with data, compact enough to hand to a language model.
/// `None` when the table holds no values at all.
pub fn context_text(table: &Table) -> Option<String> {
    let lines: Vec<String> = by_country(table)
        .into_iter()
        .filter_map(|s| match (s.mean, s.min, s.max) {
            (Some(mean), Some(min), Some(max)) => Some(format!(
                "{}: n={} years, mean={:.2}, min={:.2}, max={:.2}",
                s.country_name, s.count, mean, min, max
            )),
            _ => None,
        })
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Observation;

    fn obs(country: &str, year: i32, value: Option<f64>) -> Observation {
        Observation {
            country_id: country[..2].to_string(),
            country_name: country.into(),
            country_iso3: None,
            indicator_id: "IND".into(),
            indicator_name: "Dummy".into(),
            year,
            value,
        }
    }

    #[test]
    fn handles_missing_and_median_even_odd() {
        let t = Table::new(vec![
            obs("Bland", 2018, Some(10.0)),
            obs("Aland", 2018, Some(4.0)),
            obs("Aland", 2019, Some(1.0)),
            obs("Bland", 2019, None),
            obs("Aland", 2020, Some(3.0)),
            obs("Aland", 2021, Some(2.0)),
            obs("Bland", 2020, Some(30.0)),
            obs("Bland", 2021, Some(20.0)),
        ]);
        let got = by_country(&t);
        assert_eq!(got.len(), 2);

        let a = &got[0];
        assert_eq!(a.country_name, "Aland");
        assert_eq!((a.count, a.missing), (4, 0));
        assert_eq!((a.min, a.max), (Some(1.0), Some(4.0)));
        assert!((a.mean.unwrap() - 2.5).abs() < 1e-9);
        assert!((a.median.unwrap() - 2.5).abs() < 1e-9);

        let b = &got[1];
        assert_eq!((b.count, b.missing), (3, 1));
        assert_eq!(b.median, Some(20.0));
        assert_eq!(b.mean, Some(20.0));
    }

    #[test]
    fn context_skips_countries_without_values() {
        let t = Table::new(vec![
            obs("France", 2015, Some(1.0)),
            obs("France", 2016, Some(2.0)),
            obs("Chad", 2015, None),
        ]);
        assert_eq!(
            context_text(&t).unwrap(),
            "France: n=2 years, mean=1.50, min=1.00, max=2.00"
        );
        assert_eq!(context_text(&Table::new(vec![obs("Chad", 2015, None)])), None);
        assert_eq!(context_text(&Table::default()), None);
    }
}
