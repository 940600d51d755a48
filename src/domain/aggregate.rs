//! Multi-year aggregation of COT reports into one merged table.

use crate::domain::error::CotError;
use crate::domain::filter::filter_commodity;
use crate::domain::instrument::Instrument;
use crate::domain::metric::{calculate_cot, InstrumentSeries};
use crate::domain::report::RawReportRow;
use crate::domain::table::CotTable;
use crate::ports::report_port::ReportSource;
use tracing::{debug, info, warn};

/// Parameters of one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregateRequest<'a> {
    pub start_year: i32,
    pub end_year: i32,
    pub instruments: &'a [Instrument],
    pub exclude_token: &'a str,
}

/// Why a year/instrument pair contributed nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    SourceUnavailable { reason: String },
    NoMatchingRows,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSlice {
    pub year: i32,
    pub instrument: Option<Instrument>,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub table: CotTable,
    pub series: Vec<InstrumentSeries>,
    pub skipped: Vec<SkippedSlice>,
}

/// Fetch every year in range, filter each instrument out of it, compute the
/// positioning metric and outer-join the instruments on date.
///
/// A year whose report cannot be fetched, or an instrument with no rows in a
/// year, is logged and skipped. Only when no instrument yields any row over
/// the whole range does this fail, with [`CotError::NoData`].
pub fn extract_cot(
    source: &dyn ReportSource,
    request: &AggregateRequest<'_>,
) -> Result<AggregateResult, CotError> {
    let mut accumulated: Vec<Vec<RawReportRow>> = vec![Vec::new(); request.instruments.len()];
    let mut skipped = Vec::new();

    for year in request.start_year..=request.end_year {
        let report = match source.fetch_yearly_report(year) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(year, "error fetching COT data: {}", e);
                skipped.push(SkippedSlice {
                    year,
                    instrument: None,
                    reason: SkipReason::SourceUnavailable {
                        reason: e.to_string(),
                    },
                });
                continue;
            }
        };
        debug!(year, rows = report.len(), "fetched yearly report");

        for (slot, &instrument) in accumulated.iter_mut().zip(request.instruments) {
            let rows = filter_commodity(&report, instrument.commodity(), request.exclude_token);
            if rows.is_empty() {
                info!(year, "no data found for {}", instrument.commodity());
                skipped.push(SkippedSlice {
                    year,
                    instrument: Some(instrument),
                    reason: SkipReason::NoMatchingRows,
                });
                continue;
            }
            slot.extend(rows);
        }
    }

    let series: Vec<InstrumentSeries> = accumulated
        .iter()
        .zip(request.instruments)
        .filter(|(rows, _)| !rows.is_empty())
        .map(|(rows, &instrument)| calculate_cot(rows, instrument))
        .filter(|s| !s.is_empty())
        .collect();

    if series.is_empty() {
        warn!(
            start_year = request.start_year,
            end_year = request.end_year,
            "no soybean data found for the requested period"
        );
        return Err(CotError::NoData {
            start_year: request.start_year,
            end_year: request.end_year,
        });
    }

    for s in &series {
        info!(instrument = %s.instrument, points = s.len(), "computed COT series");
    }

    let table = CotTable::outer_join(&series);
    Ok(AggregateResult {
        table,
        series,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeSource {
        years: HashMap<i32, Vec<RawReportRow>>,
    }

    impl ReportSource for FakeSource {
        fn fetch_yearly_report(&self, year: i32) -> Result<Vec<RawReportRow>, CotError> {
            self.years
                .get(&year)
                .cloned()
                .ok_or_else(|| CotError::SourceUnavailable {
                    year,
                    reason: "not published".into(),
                })
        }
    }

    fn row(market: &str, date: &str, long: f64, short: f64) -> RawReportRow {
        RawReportRow {
            market: market.into(),
            as_of_date: date.into(),
            noncomm_long: None,
            noncomm_short: None,
            change_noncomm_long: None,
            change_noncomm_short: None,
            pct_oi_long: Some(long),
            pct_oi_short: Some(short),
        }
    }

    fn request() -> AggregateRequest<'static> {
        AggregateRequest {
            start_year: 2023,
            end_year: 2024,
            instruments: &Instrument::ALL,
            exclude_token: "MINI",
        }
    }

    #[test]
    fn missing_year_is_skipped() {
        let source = FakeSource {
            years: HashMap::from([(
                2024,
                vec![row("SOYBEANS - CBOT", "2024-01-02", 30.0, 12.5)],
            )]),
        };

        let result = extract_cot(&source, &request()).unwrap();

        assert_eq!(result.table.columns, vec!["ZS_COT_%"]);
        assert_eq!(result.table.rows[0].values, vec![Some(17.5)]);
        assert!(result.skipped.iter().any(|s| s.year == 2023 && s.instrument.is_none()));
    }

    #[test]
    fn years_concatenate_chronologically() {
        let source = FakeSource {
            years: HashMap::from([
                (2023, vec![row("SOYBEAN OIL - CBOT", "2023-12-26", 20.0, 10.0)]),
                (2024, vec![row("SOYBEAN OIL - CBOT", "2024-01-02", 21.0, 10.0)]),
            ]),
        };

        let result = extract_cot(&source, &request()).unwrap();

        assert!(result.table.is_date_sorted());
        assert_eq!(result.table.len(), 2);
        assert_eq!(result.series.len(), 1);
    }

    #[test]
    fn every_year_missing_is_no_data() {
        let source = FakeSource {
            years: HashMap::new(),
        };
        let err = extract_cot(&source, &request()).unwrap_err();
        assert!(matches!(
            err,
            CotError::NoData {
                start_year: 2023,
                end_year: 2024
            }
        ));
    }

    #[test]
    fn reports_without_soybeans_are_no_data() {
        let source = FakeSource {
            years: HashMap::from([(2024, vec![row("CORN - CBOT", "2024-01-02", 30.0, 10.0)])]),
        };
        let err = extract_cot(&source, &request()).unwrap_err();
        assert!(matches!(err, CotError::NoData { .. }));
    }

    #[test]
    fn inverted_range_is_no_data() {
        let source = FakeSource {
            years: HashMap::new(),
        };
        let req = AggregateRequest {
            start_year: 2025,
            end_year: 2024,
            ..request()
        };
        assert!(matches!(
            extract_cot(&source, &req),
            Err(CotError::NoData { .. })
        ));
    }
}
