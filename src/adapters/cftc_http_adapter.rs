//! CFTC historical-archive report source over HTTP.
//!
//! The CFTC publishes each year's legacy report as a zip archive holding a
//! single comma-separated text file. The current year's archive is
//! republished weekly under the same name.

use crate::domain::error::CotError;
use crate::domain::report::{parse_report, RawReportRow, ReportType};
use crate::ports::report_port::ReportSource;
use std::io::{Cursor, Read};
use std::time::Duration;
use tracing::{debug, info};

pub struct CftcHttpAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    report_type: ReportType,
}

impl CftcHttpAdapter {
    pub fn new(
        base_url: &str,
        report_type: ReportType,
        timeout: Duration,
    ) -> Result<Self, CotError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("soycot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CotError::ConfigInvalid {
                section: "source".into(),
                key: "base_url".into(),
                reason: format!("cannot build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            report_type,
        })
    }

    pub fn archive_url(&self, year: i32) -> String {
        format!(
            "{}/{}{}.zip",
            self.base_url,
            self.report_type.file_prefix(),
            year
        )
    }

    fn download(&self, year: i32) -> Result<Vec<u8>, CotError> {
        let url = self.archive_url(year);
        let unavailable = |reason: String| CotError::SourceUnavailable { year, reason };

        info!(year, %url, "downloading COT archive");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| unavailable(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("{} returned HTTP {}", url, status)));
        }

        let bytes = response
            .bytes()
            .map_err(|e| unavailable(format!("reading body of {} failed: {}", url, e)))?;
        debug!(year, size = bytes.len(), "archive downloaded");
        Ok(bytes.to_vec())
    }
}

/// Text of the first file inside a yearly archive.
pub fn extract_report_text(year: i32, archive: &[u8]) -> Result<String, CotError> {
    let unavailable = |reason: String| CotError::SourceUnavailable { year, reason };

    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| unavailable(format!("invalid archive: {}", e)))?;
    if zip.is_empty() {
        return Err(unavailable("archive is empty".to_string()));
    }

    let mut entry = zip
        .by_index(0)
        .map_err(|e| unavailable(format!("unreadable archive entry: {}", e)))?;
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| unavailable(format!("failed to inflate {}: {}", entry.name(), e)))?;

    // Older archives are Latin-1; keep going on stray bytes.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl ReportSource for CftcHttpAdapter {
    fn fetch_yearly_report(&self, year: i32) -> Result<Vec<RawReportRow>, CotError> {
        let archive = self.download(year)?;
        let text = extract_report_text(year, &archive)?;
        parse_report(year, text.as_bytes())
    }
}
