//! One ingestion cycle's conversion work: scan the mirror for dated CSVs,
//! normalize each day into its JSON tree, and rebuild the rolling summary.
//! A broken day is skipped with a warning; only output-directory creation
//! and the summary write can fail the cycle as a whole.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::data::aggregate::{self, CountryMap};
use crate::data::row::parse_row;
use crate::data::schema::{ReportSchema, SchemaError};
use crate::data::summary::{SummaryBuilder, WorldSummary};

/// Upstream encodes the report day in the file name.
const REPORT_DATE_FORMAT: &str = "%m-%d-%Y";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("csv read failed: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("json encode failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Converts every dated report in the mirror and rewrites the summary.
/// Days are processed in ascending date order derived from each file's
/// name, never from directory order: the summary series depend on it.
/// Returns the number of days converted.
pub fn refresh_data_files(cfg: &Config) -> Result<usize, PipelineError> {
    fs::create_dir_all(&cfg.converted_path)?;

    let reports = list_report_files(&cfg.reports_path)?;
    let mut builder = SummaryBuilder::new();
    let mut converted = 0usize;

    for (date, path) in &reports {
        match convert_report(path, *date, &cfg.converted_path) {
            Ok(tree) => {
                builder.add_day(*date, &tree);
                converted += 1;
            }
            Err(err) => {
                warn!(file = %path.display(), error = %err, "skipping daily report");
            }
        }
    }

    let summary = builder.finish();
    write_summary(&summary, &cfg.summary_path)?;
    info!(
        days = converted,
        countries = summary.countrys.len(),
        "conversion finished"
    );
    Ok(converted)
}

/// Dated report files, ascending by the date parsed from the file name.
/// Files whose name is not `MM-DD-YYYY.csv` are ignored.
pub fn list_report_files(dir: &Path) -> Result<Vec<(NaiveDate, PathBuf)>, PipelineError> {
    let mut reports = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map_or(true, |ext| ext != "csv") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(stem, REPORT_DATE_FORMAT) else {
            continue;
        };
        reports.push((date, path));
    }
    reports.sort_by_key(|(date, _)| *date);
    Ok(reports)
}

/// Parses one day's CSV into a country tree and writes it out as
/// `<out_dir>/<YYYY-MM-DD>.json`. Malformed rows are skipped; a missing
/// country column fails the whole file.
pub fn convert_report(
    csv_path: &Path,
    date: NaiveDate,
    out_dir: &Path,
) -> Result<CountryMap, PipelineError> {
    let tree = parse_report(csv_path)?;

    let out_path = out_dir.join(format!("{}.json", date.format("%Y-%m-%d")));
    let file = File::create(&out_path)?;
    let mut writer = BufWriter::with_capacity(128 * 1024, file);
    serde_json::to_writer(&mut writer, &tree)?;
    writer.flush()?;

    Ok(tree)
}

/// Schema-tolerant parse of one report file.
pub fn parse_report(csv_path: &Path) -> Result<CountryMap, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(csv_path)?;
    let schema = ReportSchema::resolve(reader.headers()?)?;

    let mut countries = CountryMap::new();
    for result in reader.records() {
        // A record the reader itself cannot decode loses that row only.
        let Ok(cells) = result else { continue };
        // Embedded delimiters in free-text fields show up as a width
        // mismatch; such rows are unattributable and dropped.
        if cells.len() != schema.width {
            continue;
        }
        if let Some(row) = parse_row(&cells, &schema) {
            aggregate::add_row(&mut countries, &row);
        }
    }
    Ok(countries)
}

fn write_summary(summary: &WorldSummary, path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(128 * 1024, file);
    serde_json::to_writer(&mut writer, summary)?;
    writer.flush()?;
    Ok(())
}
