//! OHLCV bar representation.

use chrono::{Datelike, NaiveDate};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Bar width requested from a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    pub fn parse(value: &str) -> Option<Interval> {
        match value.trim().to_uppercase().as_str() {
            "1D" => Some(Interval::Daily),
            "1W" => Some(Interval::Weekly),
            "1M" => Some(Interval::Monthly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Daily => "1D",
            Interval::Weekly => "1W",
            Interval::Monthly => "1M",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bars dated within `start_year..=end_year`.
pub fn filter_years(bars: &[OhlcvBar], start_year: i32, end_year: i32) -> Vec<OhlcvBar> {
    bars.iter()
        .filter(|b| (start_year..=end_year).contains(&b.date.year()))
        .cloned()
        .collect()
}
