//! CSV OHLCV files: a directory-backed bar feed and the per-instrument bar
//! files the dashboard reads.

use crate::domain::error::CotError;
use crate::domain::ohlcv::{Interval, OhlcvBar};
use crate::ports::bar_port::BarFeed;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

const BAR_HEADER: [&str; 6] = ["datetime", "open", "high", "low", "close", "volume"];

/// Bar feed over exported files named `<symbol>_<exchange>_<interval>.csv`.
pub struct CsvBarFeed {
    base_path: PathBuf,
}

impl CsvBarFeed {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, exchange: &str, interval: Interval) -> PathBuf {
        self.base_path
            .join(format!("{}_{}_{}.csv", symbol, exchange, interval))
    }
}

impl BarFeed for CsvBarFeed {
    fn fetch_bars(
        &self,
        symbol: &str,
        exchange: &str,
        interval: Interval,
        n_bars: usize,
    ) -> Result<Vec<OhlcvBar>, CotError> {
        let path = self.csv_path(symbol, exchange, interval);
        let content = fs::read_to_string(&path).map_err(|e| CotError::BarFeed {
            symbol: symbol.to_string(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut bars = parse_bars(&content).map_err(|reason| CotError::BarFeed {
            symbol: symbol.to_string(),
            reason,
        })?;
        bars.sort_by_key(|b| b.date);
        let skip = bars.len().saturating_sub(n_bars);
        Ok(bars.split_off(skip))
    }
}

/// Parse bars from CSV text with a `datetime,open,high,low,close,volume`
/// prefix. Extra trailing columns (e.g. `symbol`) are ignored. The date may
/// carry a time part, which is dropped.
pub fn parse_bars(content: &str) -> Result<Vec<OhlcvBar>, String> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| format!("CSV parse error: {}", e))?;

        let date_str = record.get(0).ok_or("missing datetime column")?;
        let date_part = date_str.split([' ', 'T']).next().unwrap_or(date_str);
        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map_err(|e| format!("invalid date format {:?}: {}", date_str, e))?;

        let mut fields = [0.0f64; 5];
        for (i, field) in fields.iter_mut().enumerate() {
            let name = BAR_HEADER[i + 1];
            *field = record
                .get(i + 1)
                .ok_or_else(|| format!("missing {} column", name))?
                .trim()
                .parse()
                .map_err(|e| format!("invalid {} value: {}", name, e))?;
        }
        let [open, high, low, close, volume] = fields;

        bars.push(OhlcvBar {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    Ok(bars)
}

/// Path of the stored bar file for an instrument key, e.g. `data/ZS_1D.csv`.
pub fn bar_file_path(dir: &Path, key: &str, interval: Interval) -> PathBuf {
    dir.join(format!("{}_{}.csv", key, interval))
}

/// Overwrite `path` with `bars`, via a temporary file and rename.
pub fn write_bars(path: &Path, bars: &[OhlcvBar]) -> Result<(), CotError> {
    let err = |reason: String| CotError::persistence(path.display(), reason);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| err(e.to_string()))?;
    }

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(BAR_HEADER).map_err(|e| err(e.to_string()))?;
    for bar in bars {
        wtr.write_record([
            bar.date.format("%Y-%m-%d").to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])
        .map_err(|e| err(e.to_string()))?;
    }
    let bytes = wtr.into_inner().map_err(|e| err(e.to_string()))?;

    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).map_err(|e| err(e.to_string()))?;
    fs::rename(&tmp, path).map_err(|e| err(e.to_string()))
}

/// Read a stored bar file.
pub fn read_bars(path: &Path) -> Result<Vec<OhlcvBar>, CotError> {
    let content = fs::read_to_string(path)
        .map_err(|e| CotError::persistence(path.display(), format!("failed to read: {}", e)))?;
    parse_bars(&content).map_err(|e| CotError::persistence(path.display(), e))
}
