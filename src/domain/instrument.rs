//! Tracked soybean-complex instruments.

use std::fmt;

/// One of the three soybean-complex futures the pipeline tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Instrument {
    /// Soybean oil.
    Zl,
    /// Soybean meal.
    Zm,
    /// Soybeans.
    Zs,
}

impl Instrument {
    /// Fixed processing order; also the column order of merged tables.
    pub const ALL: [Instrument; 3] = [Instrument::Zl, Instrument::Zm, Instrument::Zs];

    pub fn key(self) -> &'static str {
        match self {
            Instrument::Zl => "ZL",
            Instrument::Zm => "ZM",
            Instrument::Zs => "ZS",
        }
    }

    /// Token searched for in the report's market and exchange name.
    pub fn commodity(self) -> &'static str {
        match self {
            Instrument::Zl => "SOYBEAN OIL",
            Instrument::Zm => "SOYBEAN MEAL",
            Instrument::Zs => "SOYBEANS",
        }
    }

    /// Name of the derived positioning column, e.g. `ZS_COT_%`.
    pub fn metric_column(self) -> String {
        format!("{}_COT_%", self.key())
    }

    /// Continuous front-month symbol on the bar feed.
    pub fn continuous_symbol(self) -> String {
        format!("{}1!", self.key())
    }

    pub fn from_key(key: &str) -> Option<Instrument> {
        Instrument::ALL
            .into_iter()
            .find(|i| i.key().eq_ignore_ascii_case(key.trim()))
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
