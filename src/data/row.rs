//! Row-level parsing for one daily-report CSV record.
//! Individual cells are extracted independently: a malformed count or
//! coordinate degrades to zero/absent instead of losing the row, and the
//! last-update timestamp is tried against every format the upstream has
//! historically used.

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;

use crate::data::schema::ReportSchema;

/// Case counters and optional metadata for a single CSV row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseRecord {
    pub confirmed: u64,
    pub deaths: u64,
    pub recovered: u64,
    pub last_update: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// One parsed row, located in the country/province/admin2 hierarchy.
/// `admin2` is only meaningful underneath a province.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub country: String,
    pub province: Option<String>,
    pub admin2: Option<String>,
    pub record: CaseRecord,
}

/// Converts one data row into a [`ParsedRow`] using the resolved schema.
/// Returns `None` when the row has no usable country cell. The caller is
/// expected to have already skipped rows whose cell count differs from the
/// header width.
pub fn parse_row(cells: &StringRecord, schema: &ReportSchema) -> Option<ParsedRow> {
    let country = cells.get(schema.country)?.trim();
    if country.is_empty() {
        return None;
    }

    let province = schema
        .province
        .and_then(|i| cells.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    let admin2 = if province.is_some() {
        schema
            .admin2
            .and_then(|i| cells.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    } else {
        None
    };

    let record = CaseRecord {
        confirmed: parse_count(cells, schema.confirmed),
        deaths: parse_count(cells, schema.deaths),
        recovered: parse_count(cells, schema.recovered),
        last_update: schema
            .last_update
            .and_then(|i| cells.get(i))
            .and_then(parse_last_update),
        latitude: parse_coordinate(cells, schema.latitude),
        longitude: parse_coordinate(cells, schema.longitude),
    };

    Some(ParsedRow {
        country: country.to_owned(),
        province,
        admin2,
        record,
    })
}

fn parse_count(cells: &StringRecord, index: Option<usize>) -> u64 {
    index
        .and_then(|i| cells.get(i))
        .and_then(|cell| cell.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

fn parse_coordinate(cells: &StringRecord, index: Option<usize>) -> Option<f64> {
    index
        .and_then(|i| cells.get(i))
        .and_then(|cell| cell.trim().parse::<f64>().ok())
}

/// The upstream used three timestamp shapes over time: slash-delimited US
/// dates (4- or 2-digit years), ISO-8601 with a `T`, and ISO-8601 with a
/// space. Anything else is treated as absent.
fn parse_last_update(cell: &str) -> Option<DateTime<Utc>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    let parsed = if cell.contains('/') {
        // %Y also accepts short years, so pick the format by the year
        // token's width instead of trying one after the other.
        let year_digits = cell
            .split(' ')
            .next()
            .and_then(|date| date.rsplit('/').next())
            .map_or(0, str::len);
        if year_digits >= 4 {
            NaiveDateTime::parse_from_str(cell, "%m/%d/%Y %H:%M")
        } else {
            NaiveDateTime::parse_from_str(cell, "%m/%d/%y %H:%M")
        }
    } else if cell.contains('T') {
        NaiveDateTime::parse_from_str(cell, "%Y-%m-%dT%H:%M:%S")
    } else {
        NaiveDateTime::parse_from_str(cell, "%Y-%m-%d %H:%M:%S")
    };
    parsed.ok().map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::ReportSchema;
    use chrono::{NaiveDate, Timelike};

    fn schema() -> ReportSchema {
        ReportSchema::resolve(&StringRecord::from(vec![
            "Province/State",
            "Country/Region",
            "Last Update",
            "Confirmed",
            "Deaths",
            "Recovered",
            "Latitude",
            "Longitude",
        ]))
        .expect("test header should resolve")
    }

    fn row(cells: &[&str]) -> StringRecord {
        StringRecord::from(cells.to_vec())
    }

    #[test]
    fn parses_a_complete_row() {
        let parsed = parse_row(
            &row(&["Hubei", "Mainland China", "1/22/2020 17:00", "444", "17", "28", "30.97", "112.27"]),
            &schema(),
        )
        .expect("row should parse");

        assert_eq!(parsed.country, "Mainland China");
        assert_eq!(parsed.province.as_deref(), Some("Hubei"));
        assert_eq!(parsed.admin2, None);
        assert_eq!(parsed.record.confirmed, 444);
        assert_eq!(parsed.record.deaths, 17);
        assert_eq!(parsed.record.recovered, 28);
        assert_eq!(parsed.record.latitude, Some(30.97));
        let ts = parsed.record.last_update.expect("timestamp should parse");
        assert_eq!(ts.date_naive(), NaiveDate::from_ymd_opt(2020, 1, 22).unwrap());
        assert_eq!(ts.hour(), 17);
    }

    #[test]
    fn bad_cells_degrade_to_zero_or_absent() {
        let parsed = parse_row(
            &row(&["", "Japan", "not a date", "n/a", "", "3", "abc", ""]),
            &schema(),
        )
        .expect("row should parse despite bad cells");

        assert_eq!(parsed.province, None);
        assert_eq!(parsed.record.confirmed, 0);
        assert_eq!(parsed.record.deaths, 0);
        assert_eq!(parsed.record.recovered, 3);
        assert_eq!(parsed.record.last_update, None);
        assert_eq!(parsed.record.latitude, None);
    }

    #[test]
    fn empty_country_skips_the_row() {
        assert!(parse_row(&row(&["Hubei", "", "", "1", "0", "0", "", ""]), &schema()).is_none());
        assert!(parse_row(&row(&["Hubei", "   ", "", "1", "0", "0", "", ""]), &schema()).is_none());
    }

    #[test]
    fn all_three_timestamp_formats_parse() {
        assert!(parse_last_update("1/22/2020 17:00").is_some());
        assert!(parse_last_update("2/1/20 10:53").is_some());
        assert!(parse_last_update("2020-03-22T23:45:00").is_some());
        assert!(parse_last_update("2020-03-22 23:45:00").is_some());
        assert!(parse_last_update("March 22nd").is_none());
        assert!(parse_last_update("").is_none());
    }

    #[test]
    fn slash_dates_prefer_four_digit_years() {
        let four = parse_last_update("1/22/2020 17:00").unwrap();
        let two = parse_last_update("1/22/20 17:00").unwrap();
        assert_eq!(four, two);
    }
}
