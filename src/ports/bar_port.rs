//! OHLCV bar feed port.

use crate::domain::error::CotError;
use crate::domain::ohlcv::{Interval, OhlcvBar};

pub trait BarFeed {
    /// The most recent `n_bars` bars for `symbol`, oldest first.
    fn fetch_bars(
        &self,
        symbol: &str,
        exchange: &str,
        interval: Interval,
        n_bars: usize,
    ) -> Result<Vec<OhlcvBar>, CotError>;
}
