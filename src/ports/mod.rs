//! Port traits the domain depends on; adapters implement them.

pub mod bar_port;
pub mod config_port;
pub mod report_port;
pub mod store_port;
