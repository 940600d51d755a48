//! Refresh of the per-instrument OHLCV bar files.

use crate::domain::error::CotError;
use crate::domain::instrument::Instrument;
use crate::domain::ohlcv::{Interval, OhlcvBar};
use crate::ports::bar_port::BarFeed;
use tracing::{info, warn};

pub const DEFAULT_EXCHANGE: &str = "CBOT";
pub const DEFAULT_BAR_COUNT: usize = 5000;

#[derive(Debug, Clone)]
pub struct BarRequest<'a> {
    pub instruments: &'a [Instrument],
    pub exchange: &'a str,
    pub interval: Interval,
    pub n_bars: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BarRefreshReport {
    pub written: Vec<(Instrument, usize)>,
    pub failed: Vec<(Instrument, String)>,
}

/// Fetch each instrument's continuous contract and hand the bars to `sink`,
/// which replaces that instrument's stored bars.
///
/// A feed failure skips the instrument; a sink failure aborts the refresh.
pub fn refresh_bars(
    feed: &dyn BarFeed,
    request: &BarRequest<'_>,
    sink: &mut dyn FnMut(Instrument, &[OhlcvBar]) -> Result<(), CotError>,
) -> Result<BarRefreshReport, CotError> {
    let mut report = BarRefreshReport::default();

    for &instrument in request.instruments {
        let symbol = instrument.continuous_symbol();
        let bars = match feed.fetch_bars(&symbol, request.exchange, request.interval, request.n_bars) {
            Ok(bars) => bars,
            Err(e) => {
                warn!(%symbol, "skipping bar refresh: {}", e);
                report.failed.push((instrument, e.to_string()));
                continue;
            }
        };

        sink(instrument, &bars)?;
        info!(%symbol, bars = bars.len(), interval = %request.interval, "OHLCV data saved");
        report.written.push((instrument, bars.len()));
    }

    Ok(report)
}
