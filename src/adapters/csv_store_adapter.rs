//! CSV file table store.
//!
//! Layout: a header `datetime,<column>...`, then one line per row with the
//! date as `YYYY-MM-DD` and empty cells for missing values. Values are
//! written in shortest round-trip form, so loading and saving an unchanged
//! table reproduces the file byte for byte.

use crate::domain::error::CotError;
use crate::domain::table::{CotTable, TableRow, INDEX_COLUMN};
use crate::ports::store_port::{lock_path_for, StoreLock, TableStore};
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvStoreAdapter {
    path: PathBuf,
}

impl CsvStoreAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn err(&self, reason: impl std::fmt::Display) -> CotError {
        CotError::persistence(self.path.display(), reason)
    }
}

/// Parse a table from CSV text.
pub fn read_table(content: &str) -> Result<CotTable, String> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| format!("CSV header error: {}", e))?
        .clone();
    let mut header_iter = headers.iter();
    match header_iter.next() {
        Some(h) if h == INDEX_COLUMN => {}
        other => {
            return Err(format!(
                "first column must be {}, found {:?}",
                INDEX_COLUMN, other
            ));
        }
    }
    let columns: Vec<String> = header_iter.map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| format!("CSV parse error: {}", e))?;
        if record.len() != columns.len() + 1 {
            return Err(format!(
                "row {} has {} cells, expected {}",
                line + 1,
                record.len(),
                columns.len() + 1
            ));
        }

        let date_str = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT)
            .map_err(|e| format!("row {}: invalid date {:?}: {}", line + 1, date_str, e))?;

        let mut values = Vec::with_capacity(columns.len());
        for (col, cell) in columns.iter().zip(record.iter().skip(1)) {
            let cell = cell.trim();
            if cell.is_empty() {
                values.push(None);
                continue;
            }
            let v: f64 = cell
                .parse()
                .map_err(|e| format!("row {}: invalid {} value {:?}: {}", line + 1, col, cell, e))?;
            values.push(Some(v));
        }
        rows.push(TableRow { date, values });
    }

    Ok(CotTable { columns, rows })
}

/// Serialise a table to CSV text.
pub fn write_table(table: &CotTable) -> Result<Vec<u8>, String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut header = vec![INDEX_COLUMN.to_string()];
    header.extend(table.columns.iter().cloned());
    wtr.write_record(&header).map_err(|e| e.to_string())?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.date.format(DATE_FORMAT).to_string());
        record.extend(row.values.iter().map(|v| match v {
            Some(x) if !x.is_nan() => x.to_string(),
            _ => String::new(),
        }));
        wtr.write_record(&record).map_err(|e| e.to_string())?;
    }

    wtr.into_inner().map_err(|e| e.to_string())
}

impl TableStore for CsvStoreAdapter {
    fn load(&self) -> Result<Option<CotTable>, CotError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.err(format!("failed to read: {}", e))),
        };
        let table = read_table(&content).map_err(|e| self.err(e))?;
        debug!(path = %self.path.display(), rows = table.len(), "loaded store");
        Ok(Some(table))
    }

    fn save(&self, table: &CotTable) -> Result<(), CotError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.err(e))?;
        }

        let bytes = write_table(table).map_err(|e| self.err(e))?;
        let tmp = self.temp_path();
        fs::write(&tmp, bytes).map_err(|e| self.err(format!("failed to write {}: {}", tmp.display(), e)))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(self.err(format!("failed to replace store: {}", e)));
        }
        debug!(path = %self.path.display(), rows = table.len(), "saved store");
        Ok(())
    }

    fn lock(&self) -> Result<StoreLock, CotError> {
        StoreLock::exclusive(&lock_path_for(&self.path))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> CotTable {
        CotTable {
            columns: vec!["ZL_COT_%".into(), "ZM_COT_%".into(), "ZS_COT_%".into()],
            rows: vec![
                TableRow {
                    date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    values: vec![Some(17.5), None, Some(-3.25)],
                },
                TableRow {
                    date: NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
                    values: vec![Some(0.1), Some(22.0), None],
                },
            ],
        }
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = CsvStoreAdapter::new(dir.path().join("cot.csv"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_writes_expected_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("cot.csv");
        let store = CsvStoreAdapter::new(path.clone());

        store.save(&sample()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "datetime,ZL_COT_%,ZM_COT_%,ZS_COT_%\n\
             2024-01-02,17.5,,-3.25\n\
             2024-01-09,0.1,22,\n"
        );
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn saved_table_loads_identically() {
        let dir = TempDir::new().unwrap();
        let store = CsvStoreAdapter::new(dir.path().join("cot.csv"));

        store.save(&sample()).unwrap();
        let first = fs::read(store.path()).unwrap();
        let loaded = store.load().unwrap().unwrap();
        store.save(&loaded).unwrap();

        assert_eq!(loaded, sample());
        assert_eq!(fs::read(store.path()).unwrap(), first);
    }

    #[test]
    fn corrupt_store_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cot.csv");
        fs::write(&path, "datetime,ZS_COT_%\nnot-a-date,1.0\n").unwrap();

        let err = CsvStoreAdapter::new(path).load().unwrap_err();
        assert!(matches!(err, CotError::Persistence { .. }));
    }

    #[test]
    fn wrong_index_column_is_rejected() {
        assert!(read_table("date,ZS_COT_%\n2024-01-02,1\n").is_err());
    }

    #[test]
    fn header_only_is_empty_table() {
        let table = read_table("datetime,ZS_COT_%\n").unwrap();
        assert_eq!(table.columns, vec!["ZS_COT_%"]);
        assert!(table.is_empty());
    }

    #[test]
    fn unwritable_location_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let store = CsvStoreAdapter::new(blocker.join("cot.csv"));

        assert!(matches!(
            store.save(&sample()),
            Err(CotError::Persistence { .. })
        ));
    }
}
