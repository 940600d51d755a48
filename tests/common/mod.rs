#![allow(dead_code)]

use chrono::NaiveDate;
use soycot::domain::error::CotError;
use soycot::domain::instrument::Instrument;
pub use soycot::domain::ohlcv::{Interval, OhlcvBar};
pub use soycot::domain::report::RawReportRow;
use soycot::domain::table::CotTable;
use soycot::ports::bar_port::BarFeed;
use soycot::ports::report_port::ReportSource;
use soycot::ports::store_port::{StoreLock, TableStore};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Report source serving canned rows per year; years without rows fail as
/// unavailable.
pub struct MockReportSource {
    pub years: HashMap<i32, Vec<RawReportRow>>,
    pub errors: HashMap<i32, String>,
    pub fetches: RefCell<Vec<i32>>,
}

impl MockReportSource {
    pub fn new() -> Self {
        Self {
            years: HashMap::new(),
            errors: HashMap::new(),
            fetches: RefCell::new(Vec::new()),
        }
    }

    pub fn with_year(mut self, year: i32, rows: Vec<RawReportRow>) -> Self {
        self.years.insert(year, rows);
        self
    }

    pub fn with_error(mut self, year: i32, reason: &str) -> Self {
        self.errors.insert(year, reason.to_string());
        self
    }
}

impl ReportSource for MockReportSource {
    fn fetch_yearly_report(&self, year: i32) -> Result<Vec<RawReportRow>, CotError> {
        self.fetches.borrow_mut().push(year);
        if let Some(reason) = self.errors.get(&year) {
            return Err(CotError::SourceUnavailable {
                year,
                reason: reason.clone(),
            });
        }
        self.years
            .get(&year)
            .cloned()
            .ok_or_else(|| CotError::SourceUnavailable {
                year,
                reason: "HTTP 404".into(),
            })
    }
}

/// In-memory table store with an optional injected save failure.
pub struct MemoryStore {
    pub table: RefCell<Option<CotTable>>,
    pub fail_save: bool,
    pub saves: Cell<usize>,
}

impl MemoryStore {
    pub fn empty() -> Self {
        Self {
            table: RefCell::new(None),
            fail_save: false,
            saves: Cell::new(0),
        }
    }

    pub fn with_table(table: CotTable) -> Self {
        Self {
            table: RefCell::new(Some(table)),
            fail_save: false,
            saves: Cell::new(0),
        }
    }

    pub fn failing_saves(mut self) -> Self {
        self.fail_save = true;
        self
    }

    pub fn snapshot(&self) -> Option<CotTable> {
        self.table.borrow().clone()
    }
}

impl TableStore for MemoryStore {
    fn load(&self) -> Result<Option<CotTable>, CotError> {
        Ok(self.table.borrow().clone())
    }

    fn save(&self, table: &CotTable) -> Result<(), CotError> {
        if self.fail_save {
            return Err(CotError::persistence("memory", "disk full"));
        }
        self.saves.set(self.saves.get() + 1);
        *self.table.borrow_mut() = Some(table.clone());
        Ok(())
    }

    fn lock(&self) -> Result<StoreLock, CotError> {
        Ok(StoreLock::unguarded())
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}

/// Bar feed keyed by continuous symbol (e.g. `ZS1!`).
pub struct MockBarFeed {
    pub bars: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockBarFeed {
    pub fn new() -> Self {
        Self {
            bars: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, instrument: Instrument, bars: Vec<OhlcvBar>) -> Self {
        self.bars.insert(instrument.continuous_symbol(), bars);
        self
    }

    pub fn with_error(mut self, instrument: Instrument, reason: &str) -> Self {
        self.errors
            .insert(instrument.continuous_symbol(), reason.to_string());
        self
    }
}

impl BarFeed for MockBarFeed {
    fn fetch_bars(
        &self,
        symbol: &str,
        _exchange: &str,
        _interval: Interval,
        n_bars: usize,
    ) -> Result<Vec<OhlcvBar>, CotError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(CotError::BarFeed {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        let bars = self.bars.get(symbol).cloned().unwrap_or_default();
        let skip = bars.len().saturating_sub(n_bars);
        Ok(bars[skip..].to_vec())
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Report row with the given noncommercial open-interest percentages.
pub fn report_row(market: &str, as_of: &str, pct_long: f64, pct_short: f64) -> RawReportRow {
    RawReportRow {
        market: market.to_string(),
        as_of_date: as_of.to_string(),
        noncomm_long: Some(pct_long * 1000.0),
        noncomm_short: Some(pct_short * 1000.0),
        change_noncomm_long: Some(0.0),
        change_noncomm_short: Some(0.0),
        pct_oi_long: Some(pct_long),
        pct_oi_short: Some(pct_short),
    }
}

pub fn soybeans(as_of: &str, pct_long: f64, pct_short: f64) -> RawReportRow {
    report_row(
        "SOYBEANS - CHICAGO BOARD OF TRADE",
        as_of,
        pct_long,
        pct_short,
    )
}

pub fn soybean_oil(as_of: &str, pct_long: f64, pct_short: f64) -> RawReportRow {
    report_row(
        "SOYBEAN OIL - CHICAGO BOARD OF TRADE",
        as_of,
        pct_long,
        pct_short,
    )
}

pub fn soybean_meal(as_of: &str, pct_long: f64, pct_short: f64) -> RawReportRow {
    report_row(
        "SOYBEAN MEAL - CHICAGO BOARD OF TRADE",
        as_of,
        pct_long,
        pct_short,
    )
}

pub fn mini_soybeans(as_of: &str, pct_long: f64, pct_short: f64) -> RawReportRow {
    report_row(
        "MINI SOYBEANS - CHICAGO BOARD OF TRADE",
        as_of,
        pct_long,
        pct_short,
    )
}

/// One weekly report for all three instruments.
pub fn complex_week(as_of: &str, zs: (f64, f64), zl: (f64, f64), zm: (f64, f64)) -> Vec<RawReportRow> {
    vec![
        soybeans(as_of, zs.0, zs.1),
        soybean_oil(as_of, zl.0, zl.1),
        soybean_meal(as_of, zm.0, zm.1),
    ]
}

pub fn make_bar(date_str: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: date(date_str),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

/// The metric column for `instrument` as (date, value) pairs.
pub fn column(table: &CotTable, instrument: Instrument) -> Vec<(NaiveDate, Option<f64>)> {
    table
        .column_values(&instrument.metric_column())
        .unwrap_or_default()
}
