//! Immutable run configuration, built once at program entry.

use crate::domain::aggregate::AggregateRequest;
use crate::domain::bars::BarRequest;
use crate::domain::instrument::Instrument;
use crate::domain::ohlcv::Interval;
use crate::domain::reconcile::MergePolicy;
use crate::domain::report::ReportType;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_START_YEAR: i32 = 2024;
pub const DEFAULT_CFTC_BASE_URL: &str = "https://www.cftc.gov/files/dea/history";
pub const DEFAULT_TIMEOUT_SECS: i64 = 60;
pub const DEFAULT_STORE_PATH: &str = "data/cot_soybean_products.csv";
pub const DEFAULT_BAR_DIR: &str = "data/feed";
pub const DEFAULT_OUTPUT_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    Cftc { base_url: String, timeout: Duration },
    Csv { dir: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Csv,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateConfig {
    pub start_year: i32,
    pub report_type: ReportType,
    pub exclude_token: String,
    pub merge_policy: MergePolicy,
    pub source: SourceKind,
    pub store_kind: StoreKind,
    pub store_path: PathBuf,
    pub bar_dir: PathBuf,
    pub exchange: String,
    pub interval: Interval,
    pub n_bars: usize,
    pub output_dir: PathBuf,
}

impl UpdateConfig {
    /// Aggregation request covering `start_year` through `current_year`.
    pub fn aggregate_request(&self, current_year: i32) -> AggregateRequest<'_> {
        AggregateRequest {
            start_year: self.start_year,
            end_year: current_year,
            instruments: &Instrument::ALL,
            exclude_token: &self.exclude_token,
        }
    }

    pub fn bar_request(&self) -> BarRequest<'_> {
        BarRequest {
            instruments: &Instrument::ALL,
            exchange: &self.exchange,
            interval: self.interval,
            n_bars: self.n_bars,
        }
    }
}
