//! Yearly COT reports read from a local directory.

use crate::domain::error::CotError;
use crate::domain::report::{parse_report, RawReportRow, ReportType};
use crate::ports::report_port::ReportSource;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::PathBuf;
use tracing::debug;

/// Reads `<dir>/<prefix><year>.txt`, the text file shipped inside the CFTC
/// yearly archives, e.g. `deacot2024.txt`.
pub struct CsvReportAdapter {
    base_path: PathBuf,
    report_type: ReportType,
}

impl CsvReportAdapter {
    pub fn new(base_path: PathBuf, report_type: ReportType) -> Self {
        Self {
            base_path,
            report_type,
        }
    }

    pub fn report_path(&self, year: i32) -> PathBuf {
        self.base_path
            .join(format!("{}{}.txt", self.report_type.file_prefix(), year))
    }
}

impl ReportSource for CsvReportAdapter {
    fn fetch_yearly_report(&self, year: i32) -> Result<Vec<RawReportRow>, CotError> {
        let path = self.report_path(year);
        let file = File::open(&path).map_err(|e| CotError::SourceUnavailable {
            year,
            reason: match e.kind() {
                ErrorKind::NotFound => format!("no report at {}", path.display()),
                _ => format!("failed to read {}: {}", path.display(), e),
            },
        })?;
        let rows = parse_report(year, BufReader::new(file))?;
        debug!(year, path = %path.display(), rows = rows.len(), "read yearly report");
        Ok(rows)
    }
}
