//! Raw Commitment of Traders report rows and their CSV layout.

use crate::domain::error::CotError;
use serde::Deserialize;
use std::io::Read;

/// One market line of a yearly legacy COT report.
///
/// Only the columns the pipeline reads are mapped; the published files carry
/// many more, which are ignored. Numeric cells that fail to parse come through
/// as `None` so that a single malformed line does not sink the year.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawReportRow {
    #[serde(rename = "Market and Exchange Names")]
    pub market: String,

    #[serde(rename = "As of Date in Form YYYY-MM-DD")]
    pub as_of_date: String,

    #[serde(
        rename = "Noncommercial Positions-Long (All)",
        deserialize_with = "csv::invalid_option"
    )]
    pub noncomm_long: Option<f64>,

    #[serde(
        rename = "Noncommercial Positions-Short (All)",
        deserialize_with = "csv::invalid_option"
    )]
    pub noncomm_short: Option<f64>,

    #[serde(
        rename = "Change in Noncommercial-Long (All)",
        deserialize_with = "csv::invalid_option"
    )]
    pub change_noncomm_long: Option<f64>,

    #[serde(
        rename = "Change in Noncommercial-Short (All)",
        deserialize_with = "csv::invalid_option"
    )]
    pub change_noncomm_short: Option<f64>,

    #[serde(
        rename = "% of OI-Noncommercial-Long (All)",
        deserialize_with = "csv::invalid_option"
    )]
    pub pct_oi_long: Option<f64>,

    #[serde(
        rename = "% of OI-Noncommercial-Short (All)",
        deserialize_with = "csv::invalid_option"
    )]
    pub pct_oi_short: Option<f64>,
}

/// Which yearly archive family to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    /// Legacy report, futures only.
    LegacyFutures,
    /// Legacy report, futures and options combined.
    LegacyFuturesOptions,
}

impl ReportType {
    pub fn parse(value: &str) -> Option<ReportType> {
        match value.trim().to_lowercase().as_str() {
            "legacy_fut" => Some(ReportType::LegacyFutures),
            "legacy_futopt" => Some(ReportType::LegacyFuturesOptions),
            _ => None,
        }
    }

    /// File name prefix of the yearly archive, e.g. `deacot2024.zip`.
    pub fn file_prefix(self) -> &'static str {
        match self {
            ReportType::LegacyFutures => "deacot",
            ReportType::LegacyFuturesOptions => "deahistfo",
        }
    }
}

/// Parse a yearly report from CSV text.
///
/// Fails with `SourceUnavailable` when the header row lacks a required column
/// or a line cannot be split into records at all.
pub fn parse_report<R: Read>(year: i32, reader: R) -> Result<Vec<RawReportRow>, CotError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.deserialize::<RawReportRow>() {
        let row = result.map_err(|e| CotError::SourceUnavailable {
            year,
            reason: format!("CSV parse error: {}", e),
        })?;
        rows.push(row);
    }
    Ok(rows)
}
