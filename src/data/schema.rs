//! Header resolution for the upstream daily-report CSVs.
//! The column names drifted several times (slash vs underscore separators,
//! `Lat`/`Long_` abbreviations, the late `Admin2` county column); the schema
//! maps whatever header a given day carries onto a fixed set of field
//! indexes and ignores columns it does not know about.

use csv::StringRecord;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// No country-like column in the header; the file cannot be attributed
    /// to any entity and is skipped as a whole.
    #[error("no country column found in header")]
    MissingCountryColumn,
}

/// Column indexes for one day's header. Only the country column is
/// mandatory; everything else degrades to "absent" when the day's schema
/// predates the column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSchema {
    pub width: usize,
    pub country: usize,
    pub province: Option<usize>,
    pub admin2: Option<usize>,
    pub last_update: Option<usize>,
    pub confirmed: Option<usize>,
    pub deaths: Option<usize>,
    pub recovered: Option<usize>,
    pub latitude: Option<usize>,
    pub longitude: Option<usize>,
}

impl ReportSchema {
    /// Classifies each header cell against the known historical synonyms.
    /// Unknown columns are ignored so newly added upstream columns do not
    /// break older parsing logic.
    pub fn resolve(header: &StringRecord) -> Result<ReportSchema, SchemaError> {
        let mut country = None;
        let mut province = None;
        let mut admin2 = None;
        let mut last_update = None;
        let mut confirmed = None;
        let mut deaths = None;
        let mut recovered = None;
        let mut latitude = None;
        let mut longitude = None;

        for (index, cell) in header.iter().enumerate() {
            // The first file of the dataset carries a UTF-8 BOM.
            match cell.trim_start_matches('\u{feff}').trim() {
                "Country/Region" | "Country_Region" => country = Some(index),
                "Province/State" | "Province_State" => province = Some(index),
                "Admin2" => admin2 = Some(index),
                "Last Update" | "Last_Update" => last_update = Some(index),
                "Confirmed" => confirmed = Some(index),
                "Deaths" => deaths = Some(index),
                "Recovered" => recovered = Some(index),
                "Latitude" | "Lat" => latitude = Some(index),
                "Longitude" | "Long_" => longitude = Some(index),
                _ => {}
            }
        }

        let country = country.ok_or(SchemaError::MissingCountryColumn)?;
        Ok(ReportSchema {
            width: header.len(),
            country,
            province,
            admin2,
            last_update,
            confirmed,
            deaths,
            recovered,
            latitude,
            longitude,
        })
    }
}
