//! Hierarchical case aggregation: country -> province/state -> county.
//! Counters are folded additively from the leaf upward, so a parent with
//! children always carries the sum of its children and the fold result does
//! not depend on row order.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::canonical::canonicalize;
use crate::data::row::{CaseRecord, ParsedRow};

/// One node of the aggregated tree. Serialized per-day as
/// `{confirmed, deaths, recovered, last_update?, latitude?, longitude?, children?}`
/// with `last_update` as unix seconds and empty maps omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub confirmed: u64,
    pub deaths: u64,
    pub recovered: u64,
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Entity>,
}

impl Entity {
    fn add_counts(&mut self, record: &CaseRecord) {
        self.confirmed += record.confirmed;
        self.deaths += record.deaths;
        self.recovered += record.recovered;
    }

    /// Row metadata lands on the deepest node for the row. Merges stay
    /// commutative: the newest timestamp wins, coordinates are set once.
    fn merge_metadata(&mut self, record: &CaseRecord) {
        self.last_update = match (self.last_update, record.last_update) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        if self.latitude.is_none() {
            self.latitude = record.latitude;
        }
        if self.longitude.is_none() {
            self.longitude = record.longitude;
        }
    }

    pub fn cdr(&self) -> [u64; 3] {
        [self.confirmed, self.deaths, self.recovered]
    }
}

/// Per-day aggregation result keyed by canonical country name.
pub type CountryMap = HashMap<String, Entity>;

/// Folds one parsed row into the tree. The country name is canonicalized
/// here so historical spellings of the same entity merge into one node.
pub fn add_row(countries: &mut CountryMap, row: &ParsedRow) {
    let country = countries
        .entry(canonicalize(&row.country).to_owned())
        .or_default();
    country.add_counts(&row.record);

    let Some(province_name) = &row.province else {
        // Whole-country row: counters and metadata go straight to the root.
        country.merge_metadata(&row.record);
        return;
    };

    let province = country.children.entry(province_name.clone()).or_default();
    province.add_counts(&row.record);

    match &row.admin2 {
        Some(admin2_name) => {
            let county = province.children.entry(admin2_name.clone()).or_default();
            county.add_counts(&row.record);
            county.merge_metadata(&row.record);
        }
        None => province.merge_metadata(&row.record),
    }
}

/// Folds a batch of rows into a fresh tree. Each day's file is aggregated
/// from scratch; nothing carries over between files.
pub fn fold_rows<'a, I>(rows: I) -> CountryMap
where
    I: IntoIterator<Item = &'a ParsedRow>,
{
    let mut countries = CountryMap::new();
    for row in rows {
        add_row(&mut countries, row);
    }
    countries
}
