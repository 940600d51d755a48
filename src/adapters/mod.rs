//! Concrete adapter implementations for ports.

#[cfg(feature = "http")]
pub mod cftc_http_adapter;
pub mod csv_bar_adapter;
pub mod csv_report_adapter;
pub mod csv_store_adapter;
pub mod file_config_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_store_adapter;
