//! Positioning-report source port.

use crate::domain::error::CotError;
use crate::domain::report::RawReportRow;

/// Source of yearly Commitment of Traders reports.
pub trait ReportSource {
    /// All report rows published for `year`, every market included.
    ///
    /// A year that cannot be obtained is reported as
    /// [`CotError::SourceUnavailable`]; callers skip it and continue.
    fn fetch_yearly_report(&self, year: i32) -> Result<Vec<RawReportRow>, CotError>;
}
