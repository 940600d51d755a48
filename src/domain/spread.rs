//! Board crush spread and oil share from soybean-complex closes.

use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Bushel-equivalent multiplier applied to soybean oil (cents/lb).
pub const OIL_YIELD: f64 = 0.11;
/// Bushel-equivalent multiplier applied to soybean meal ($/short ton).
pub const MEAL_YIELD: f64 = 0.022;
/// Soybeans quote in cents/bushel.
pub const BEAN_DIVISOR: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SpreadPoint {
    pub date: NaiveDate,
    pub soybeans: f64,
    pub oil: f64,
    pub meal: f64,
    pub crush_spread: f64,
    pub oil_share: Option<f64>,
}

pub fn crush_spread(soybeans: f64, oil: f64, meal: f64) -> f64 {
    oil * OIL_YIELD + meal * MEAL_YIELD - soybeans / BEAN_DIVISOR
}

/// Share of the product value contributed by oil; `None` when the product
/// value is zero.
pub fn oil_share(oil: f64, meal: f64) -> Option<f64> {
    let oil_value = oil * OIL_YIELD;
    let product = oil_value + meal * MEAL_YIELD;
    if product == 0.0 {
        None
    } else {
        Some(oil_value / product)
    }
}

/// Inner-join the three close series on date and derive the spread fields.
/// Output follows the soybean bars' date order.
pub fn compute_spreads(
    soybeans: &[OhlcvBar],
    oil: &[OhlcvBar],
    meal: &[OhlcvBar],
) -> Vec<SpreadPoint> {
    let oil_by_date: HashMap<NaiveDate, f64> = oil.iter().map(|b| (b.date, b.close)).collect();
    let meal_by_date: HashMap<NaiveDate, f64> = meal.iter().map(|b| (b.date, b.close)).collect();

    soybeans
        .iter()
        .filter_map(|zs| {
            let zl = *oil_by_date.get(&zs.date)?;
            let zm = *meal_by_date.get(&zs.date)?;
            Some(SpreadPoint {
                date: zs.date,
                soybeans: zs.close,
                oil: zl,
                meal: zm,
                crush_spread: crush_spread(zs.close, zl, zm),
                oil_share: oil_share(zl, zm),
            })
        })
        .collect()
}
