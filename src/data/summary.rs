//! Rolling world summary across the whole dataset: one day series per
//! country plus a global total. Built in memory over one ingestion cycle
//! and serialized once; nothing partial is ever persisted.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::aggregate::CountryMap;

/// `(confirmed, deaths, recovered)` for one country on one day.
/// The date serializes as `YYYY/MM/DD`, the format the charts consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPoint {
    #[serde(with = "slash_date")]
    pub date: NaiveDate,
    pub cdr: [u64; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountrySummary {
    pub daily: Vec<DailyPoint>,
    pub cdr: [u64; 3],
}

/// The published summary. The `countrys` key spelling is part of the wire
/// format consumed by the front end and is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSummary {
    pub countrys: HashMap<String, CountrySummary>,
    pub cdr: [u64; 3],
}

/// Accumulates per-day trees in ascending date order.
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    countrys: HashMap<String, CountrySummary>,
}

impl SummaryBuilder {
    pub fn new() -> SummaryBuilder {
        SummaryBuilder::default()
    }

    /// Appends one [`DailyPoint`] per country present on `date`. Callers
    /// feed days in ascending order; a date that is not strictly greater
    /// than a country's last recorded day is dropped to keep every series
    /// strictly increasing.
    pub fn add_day(&mut self, date: NaiveDate, countries: &CountryMap) {
        for (name, entity) in countries {
            let summary = self.countrys.entry(name.clone()).or_default();
            if summary.daily.last().is_some_and(|point| point.date >= date) {
                continue;
            }
            let cdr = entity.cdr();
            summary.daily.push(DailyPoint { date, cdr });
            summary.cdr = cdr;
        }
    }

    /// The global total is the sum of each country's latest triple, not a
    /// sum over the whole series: summing every day would count each case
    /// once per day it stays on the books.
    pub fn finish(self) -> WorldSummary {
        let mut cdr = [0u64; 3];
        for summary in self.countrys.values() {
            for (slot, value) in cdr.iter_mut().zip(summary.cdr) {
                *slot += value;
            }
        }
        WorldSummary {
            countrys: self.countrys,
            cdr,
        }
    }
}

mod slash_date {
    use chrono::NaiveDate;
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y/%m/%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::{CountryMap, Entity};

    fn day(countries: &[(&str, [u64; 3])]) -> CountryMap {
        countries
            .iter()
            .map(|(name, cdr)| {
                (
                    (*name).to_owned(),
                    Entity {
                        confirmed: cdr[0],
                        deaths: cdr[1],
                        recovered: cdr[2],
                        ..Entity::default()
                    },
                )
            })
            .collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("test date should be valid")
    }

    #[test]
    fn series_dates_are_strictly_increasing() {
        let mut builder = SummaryBuilder::new();
        builder.add_day(date(2020, 1, 22), &day(&[("China", [1, 0, 0])]));
        builder.add_day(date(2020, 1, 23), &day(&[("China", [2, 0, 0])]));
        // A stale or duplicated day must not corrupt the series.
        builder.add_day(date(2020, 1, 23), &day(&[("China", [99, 9, 9])]));
        builder.add_day(date(2020, 1, 24), &day(&[("China", [3, 1, 0])]));

        let world = builder.finish();
        let daily = &world.countrys["China"].daily;
        assert_eq!(daily.len(), 3);
        for pair in daily.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
        assert_eq!(world.countrys["China"].cdr, [3, 1, 0]);
    }

    #[test]
    fn global_total_is_sum_of_latest_triples() {
        let mut builder = SummaryBuilder::new();
        builder.add_day(
            date(2020, 1, 22),
            &day(&[("China", [100, 2, 0]), ("Japan", [2, 0, 0])]),
        );
        builder.add_day(
            date(2020, 1, 23),
            &day(&[("China", [150, 3, 10]), ("Korea, South", [1, 0, 0])]),
        );

        let world = builder.finish();
        let expected: [u64; 3] = world
            .countrys
            .values()
            .map(|c| c.daily.last().expect("series should be non-empty").cdr)
            .fold([0; 3], |mut acc, cdr| {
                for (slot, value) in acc.iter_mut().zip(cdr) {
                    *slot += value;
                }
                acc
            });
        assert_eq!(world.cdr, expected);
        assert_eq!(world.cdr, [153, 3, 10]);
    }

    #[test]
    fn first_appearance_starts_a_series() {
        let mut builder = SummaryBuilder::new();
        builder.add_day(date(2020, 2, 1), &day(&[("Italy", [3, 0, 0])]));
        let world = builder.finish();
        assert_eq!(world.countrys["Italy"].daily.len(), 1);
    }

    #[test]
    fn summary_round_trips_with_wire_field_names() {
        let mut builder = SummaryBuilder::new();
        builder.add_day(date(2020, 1, 22), &day(&[("China", [1, 0, 0])]));
        let world = builder.finish();

        let json = serde_json::to_value(&world).expect("summary should serialize");
        assert!(json.get("countrys").is_some());
        assert_eq!(json["countrys"]["China"]["daily"][0]["date"], "2020/01/22");

        let back: WorldSummary =
            serde_json::from_value(json).expect("summary should deserialize");
        assert_eq!(back, world);
    }
}
