//! Configuration validation.
//!
//! Checks every key the update pipeline reads before any network or disk
//! work starts. Missing optional keys fall back to defaults; present keys
//! must be well-formed.

use crate::domain::bars::DEFAULT_BAR_COUNT;
use crate::domain::error::CotError;
use crate::domain::ohlcv::Interval;
use crate::domain::reconcile::MergePolicy;
use crate::domain::report::ReportType;
use crate::domain::settings::DEFAULT_TIMEOUT_SECS;
use crate::ports::config_port::ConfigPort;

/// First year the CFTC publishes legacy yearly archives for.
pub const FIRST_REPORT_YEAR: i32 = 1986;

pub fn validate_update_config(config: &dyn ConfigPort, current_year: i32) -> Result<(), CotError> {
    validate_start_year(config, current_year)?;
    validate_report_type(config)?;
    validate_merge_policy(config)?;
    validate_source(config)?;
    validate_store(config)?;
    validate_bars(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> CotError {
    CotError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_start_year(config: &dyn ConfigPort, current_year: i32) -> Result<(), CotError> {
    let Some(raw) = config.get_string("cot", "start_year") else {
        return Ok(());
    };
    let year: i32 = raw
        .trim()
        .parse()
        .map_err(|_| invalid("cot", "start_year", "start_year must be a year, e.g. 2024"))?;
    if year < FIRST_REPORT_YEAR || year > current_year {
        return Err(invalid(
            "cot",
            "start_year",
            format!(
                "start_year must be between {} and {}",
                FIRST_REPORT_YEAR, current_year
            ),
        ));
    }
    Ok(())
}

fn validate_report_type(config: &dyn ConfigPort) -> Result<(), CotError> {
    match config.get_string("cot", "report_type") {
        Some(s) if ReportType::parse(&s).is_none() => Err(invalid(
            "cot",
            "report_type",
            "report_type must be legacy_fut or legacy_futopt",
        )),
        _ => Ok(()),
    }
}

fn validate_merge_policy(config: &dyn ConfigPort) -> Result<(), CotError> {
    match config.get_string("cot", "merge_policy") {
        Some(s) if MergePolicy::parse(&s).is_none() => Err(invalid(
            "cot",
            "merge_policy",
            "merge_policy must be exact or upsert",
        )),
        _ => Ok(()),
    }
}

fn validate_source(config: &dyn ConfigPort) -> Result<(), CotError> {
    let kind = config
        .get_string("source", "kind")
        .unwrap_or_else(|| "cftc".to_string());
    match kind.trim().to_lowercase().as_str() {
        "cftc" => {
            if config.get_int("source", "timeout_secs", DEFAULT_TIMEOUT_SECS) <= 0 {
                return Err(invalid(
                    "source",
                    "timeout_secs",
                    "timeout_secs must be positive",
                ));
            }
            Ok(())
        }
        "csv" => match config.get_string("source", "dir") {
            Some(s) if !s.trim().is_empty() => Ok(()),
            _ => Err(CotError::ConfigMissing {
                section: "source".to_string(),
                key: "dir".to_string(),
            }),
        },
        _ => Err(invalid("source", "kind", "kind must be cftc or csv")),
    }
}

fn validate_store(config: &dyn ConfigPort) -> Result<(), CotError> {
    match config.get_string("store", "kind") {
        Some(s) if !matches!(s.trim().to_lowercase().as_str(), "csv" | "sqlite") => {
            return Err(invalid("store", "kind", "kind must be csv or sqlite"));
        }
        _ => {}
    }
    match config.get_string("store", "path") {
        Some(s) if s.trim().is_empty() => Err(invalid("store", "path", "path must not be empty")),
        _ => Ok(()),
    }
}

fn validate_bars(config: &dyn ConfigPort) -> Result<(), CotError> {
    if let Some(s) = config.get_string("bars", "interval") {
        if Interval::parse(&s).is_none() {
            return Err(invalid("bars", "interval", "interval must be 1D, 1W or 1M"));
        }
    }
    if config.get_int("bars", "n_bars", DEFAULT_BAR_COUNT as i64) < 1 {
        return Err(invalid("bars", "n_bars", "n_bars must be at least 1"));
    }
    Ok(())
}
