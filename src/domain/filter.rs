//! Instrument filter: narrows a yearly report to one commodity's rows.

use crate::domain::report::RawReportRow;

/// Token marking the smaller contract variants listed alongside the main one.
pub const DEFAULT_EXCLUDE_TOKEN: &str = "MINI";

/// Rows whose market name contains `commodity` and not `exclude`, both
/// compared case-insensitively. An empty `exclude` disables the exclusion.
pub fn filter_commodity(
    rows: &[RawReportRow],
    commodity: &str,
    exclude: &str,
) -> Vec<RawReportRow> {
    let wanted = commodity.to_uppercase();
    let unwanted = exclude.to_uppercase();

    rows.iter()
        .filter(|row| {
            let name = row.market.to_uppercase();
            name.contains(&wanted) && (unwanted.is_empty() || !name.contains(&unwanted))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(market: &str) -> RawReportRow {
        RawReportRow {
            market: market.to_string(),
            as_of_date: "2024-01-02".to_string(),
            noncomm_long: Some(1.0),
            noncomm_short: Some(1.0),
            change_noncomm_long: None,
            change_noncomm_short: None,
            pct_oi_long: Some(10.0),
            pct_oi_short: Some(5.0),
        }
    }

    fn sample() -> Vec<RawReportRow> {
        vec![
            row("SOYBEANS - CHICAGO BOARD OF TRADE"),
            row("MINI SOYBEANS - CHICAGO BOARD OF TRADE"),
            row("SOYBEAN OIL - CHICAGO BOARD OF TRADE"),
            row("SOYBEAN MEAL - CHICAGO BOARD OF TRADE"),
            row("WHEAT-SRW - CHICAGO BOARD OF TRADE"),
        ]
    }

    #[test]
    fn keeps_matching_rows() {
        let out = filter_commodity(&sample(), "SOYBEAN OIL", DEFAULT_EXCLUDE_TOKEN);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].market, "SOYBEAN OIL - CHICAGO BOARD OF TRADE");
    }

    #[test]
    fn excludes_mini_contracts() {
        let out = filter_commodity(&sample(), "SOYBEANS", DEFAULT_EXCLUDE_TOKEN);
        assert_eq!(out.len(), 1);
        assert!(out.iter().all(|r| !r.market.contains("MINI")));
    }

    #[test]
    fn match_is_case_insensitive() {
        let rows = vec![row("Soybean Meal - Chicago Board of Trade"), row("mini soybean meal")];
        let out = filter_commodity(&rows, "SOYBEAN MEAL", "mini");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].market, "Soybean Meal - Chicago Board of Trade");
    }

    #[test]
    fn no_match_returns_empty() {
        let out = filter_commodity(&sample(), "CORN", DEFAULT_EXCLUDE_TOKEN);
        assert!(out.is_empty());
    }

    #[test]
    fn empty_exclude_token_keeps_everything_matching() {
        let out = filter_commodity(&sample(), "SOYBEANS", "");
        assert_eq!(out.len(), 2);
    }
}
