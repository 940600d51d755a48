//! Net noncommercial positioning as a percentage of open interest.

use crate::domain::instrument::Instrument;
use crate::domain::report::RawReportRow;
use chrono::NaiveDate;
use tracing::warn;

pub const REPORT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Date-indexed positioning metric for one instrument, ascending by date.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSeries {
    pub instrument: Instrument,
    pub points: Vec<SeriesPoint>,
}

impl InstrumentSeries {
    pub fn column(&self) -> String {
        self.instrument.metric_column()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }
}

/// % of OI long minus % of OI short. No clamping, no rounding.
pub fn net_position_pct(pct_long: f64, pct_short: f64) -> f64 {
    pct_long - pct_short
}

/// Build the series for `instrument` from its filtered report rows.
///
/// Rows with an unparsable date or a missing percentage are dropped with a
/// warning. The sort is stable, so rows sharing a date keep their input order.
pub fn calculate_cot(rows: &[RawReportRow], instrument: Instrument) -> InstrumentSeries {
    let mut points = Vec::with_capacity(rows.len());

    for row in rows {
        let date = match NaiveDate::parse_from_str(&row.as_of_date, REPORT_DATE_FORMAT) {
            Ok(d) => d,
            Err(e) => {
                warn!(
                    instrument = %instrument,
                    date = %row.as_of_date,
                    "dropping row with invalid as-of date: {}", e
                );
                continue;
            }
        };

        let (Some(long), Some(short)) = (row.pct_oi_long, row.pct_oi_short) else {
            warn!(
                instrument = %instrument,
                %date,
                "dropping row without % of OI long/short"
            );
            continue;
        };

        points.push(SeriesPoint {
            date,
            value: net_position_pct(long, short),
        });
    }

    points.sort_by_key(|p| p.date);
    InstrumentSeries { instrument, points }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, long: Option<f64>, short: Option<f64>) -> RawReportRow {
        RawReportRow {
            market: "SOYBEANS - CHICAGO BOARD OF TRADE".into(),
            as_of_date: date.into(),
            noncomm_long: None,
            noncomm_short: None,
            change_noncomm_long: None,
            change_noncomm_short: None,
            pct_oi_long: long,
            pct_oi_short: short,
        }
    }

    #[test]
    fn metric_is_long_minus_short() {
        assert_eq!(net_position_pct(30.0, 12.5), 17.5);
    }

    #[test]
    fn metric_can_be_negative() {
        let series = calculate_cot(&[row("2024-01-02", Some(8.0), Some(20.5))], Instrument::Zs);
        assert_eq!(series.points[0].value, -12.5);
    }

    #[test]
    fn output_sorted_by_date() {
        let rows = vec![
            row("2024-03-05", Some(30.0), Some(10.0)),
            row("2023-12-26", Some(25.0), Some(10.0)),
            row("2024-01-02", Some(30.0), Some(12.5)),
        ];
        let series = calculate_cot(&rows, Instrument::Zm);

        let dates: Vec<_> = series.dates().map(|d| d.to_string()).collect();
        assert_eq!(dates, vec!["2023-12-26", "2024-01-02", "2024-03-05"]);
        assert_eq!(series.points[1].value, 17.5);
        assert_eq!(series.column(), "ZM_COT_%");
    }

    #[test]
    fn drops_rows_with_bad_date_or_missing_pct() {
        let rows = vec![
            row("2024-01-02", Some(30.0), Some(10.0)),
            row("01/09/2024", Some(30.0), Some(10.0)),
            row("2024-01-16", None, Some(10.0)),
        ];
        let series = calculate_cot(&rows, Instrument::Zl);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn duplicate_dates_keep_input_order() {
        let rows = vec![
            row("2024-01-02", Some(30.0), Some(10.0)),
            row("2024-01-02", Some(40.0), Some(10.0)),
        ];
        let series = calculate_cot(&rows, Instrument::Zs);
        assert_eq!(series.points[0].value, 20.0);
        assert_eq!(series.points[1].value, 30.0);
    }
}
