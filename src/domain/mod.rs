//! Core domain types and logic.

pub mod aggregate;
pub mod bars;
pub mod config_validation;
pub mod error;
pub mod filter;
pub mod instrument;
pub mod metric;
pub mod ohlcv;
pub mod reconcile;
pub mod report;
pub mod settings;
pub mod spread;
pub mod table;
