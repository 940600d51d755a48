//! Domain error types.

/// Top-level error type for soycot.
#[derive(Debug, thiserror::Error)]
pub enum CotError {
    #[error("report for {year} unavailable: {reason}")]
    SourceUnavailable { year: i32, reason: String },

    #[error("no COT data found for {start_year}..={end_year}")]
    NoData { start_year: i32, end_year: i32 },

    #[error("store {path}: {reason}")]
    Persistence { path: String, reason: String },

    #[error("store {path} is locked by another update")]
    StoreLocked { path: String },

    #[error("bar feed error for {symbol}: {reason}")]
    BarFeed { symbol: String, reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CotError {
    pub fn persistence(path: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        CotError::Persistence {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Process exit status for this error class.
    pub fn exit_status(&self) -> u8 {
        match self {
            CotError::Io(_) => 1,
            CotError::ConfigParse { .. }
            | CotError::ConfigMissing { .. }
            | CotError::ConfigInvalid { .. } => 2,
            CotError::Persistence { .. }
            | CotError::StoreLocked { .. }
            | CotError::Database { .. } => 3,
            CotError::SourceUnavailable { .. } | CotError::BarFeed { .. } => 4,
            CotError::NoData { .. } => 5,
        }
    }
}

impl From<&CotError> for std::process::ExitCode {
    fn from(err: &CotError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
