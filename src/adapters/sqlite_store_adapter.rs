//! SQLite table store.
//!
//! The wide table is kept in three narrow tables: column names by position,
//! rows by insertion order, and the non-missing cells. A save replaces all
//! three inside one transaction.

use crate::domain::error::CotError;
use crate::domain::table::{CotTable, TableRow};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::{lock_path_for, StoreLock, TableStore};
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::collections::HashMap;
use std::path::PathBuf;

pub struct SqliteStoreAdapter {
    pool: Pool<SqliteConnectionManager>,
    location: String,
    lock_path: Option<PathBuf>,
}

fn db_err(e: rusqlite::Error) -> CotError {
    CotError::Database {
        reason: e.to_string(),
    }
}

impl SqliteStoreAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, CotError> {
        let db_path = config
            .get_string("store", "path")
            .ok_or_else(|| CotError::ConfigMissing {
                section: "store".into(),
                key: "path".into(),
            })?;
        Self::open(PathBuf::from(db_path))
    }

    pub fn open(db_path: PathBuf) -> Result<Self, CotError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| CotError::persistence(db_path.display(), e))?;
        }
        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| CotError::Database {
                reason: e.to_string(),
            })?;

        let adapter = Self {
            pool,
            location: db_path.display().to_string(),
            lock_path: Some(lock_path_for(&db_path)),
        };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, CotError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| CotError::Database {
                reason: e.to_string(),
            })?;

        let adapter = Self {
            pool,
            location: ":memory:".to_string(),
            lock_path: None,
        };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, CotError> {
        self.pool.get().map_err(|e: r2d2::Error| CotError::Database {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), CotError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cot_columns (
                position INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS cot_rows (
                row_id INTEGER PRIMARY KEY,
                datetime TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS cot_values (
                row_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                value REAL NOT NULL,
                PRIMARY KEY (row_id, position)
            );
            CREATE INDEX IF NOT EXISTS idx_cot_rows_datetime ON cot_rows(datetime);",
        )
        .map_err(db_err)?;
        Ok(())
    }
}

impl TableStore for SqliteStoreAdapter {
    fn load(&self) -> Result<Option<CotTable>, CotError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare("SELECT name FROM cot_columns ORDER BY position ASC")
            .map_err(db_err)?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        let mut stmt = conn
            .prepare("SELECT row_id, datetime FROM cot_rows ORDER BY row_id ASC")
            .map_err(db_err)?;
        let raw_rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        if columns.is_empty() && raw_rows.is_empty() {
            return Ok(None);
        }

        let mut cells: HashMap<(i64, usize), f64> = HashMap::new();
        let mut stmt = conn
            .prepare("SELECT row_id, position, value FROM cot_values")
            .map_err(db_err)?;
        let values = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })
            .map_err(db_err)?;
        for value in values {
            let (row_id, position, v) = value.map_err(db_err)?;
            cells.insert((row_id, position as usize), v);
        }

        let mut rows = Vec::with_capacity(raw_rows.len());
        for (row_id, date_str) in raw_rows {
            let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                CotError::persistence(&self.location, format!("invalid date {:?}: {}", date_str, e))
            })?;
            let values = (0..columns.len())
                .map(|pos| cells.get(&(row_id, pos)).copied())
                .collect();
            rows.push(TableRow { date, values });
        }

        Ok(Some(CotTable { columns, rows }))
    }

    fn save(&self, table: &CotTable) -> Result<(), CotError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        tx.execute_batch("DELETE FROM cot_values; DELETE FROM cot_rows; DELETE FROM cot_columns;")
            .map_err(db_err)?;

        for (position, name) in table.columns.iter().enumerate() {
            tx.execute(
                "INSERT INTO cot_columns (position, name) VALUES (?1, ?2)",
                params![position as i64, name],
            )
            .map_err(db_err)?;
        }

        for (row_id, row) in table.rows.iter().enumerate() {
            tx.execute(
                "INSERT INTO cot_rows (row_id, datetime) VALUES (?1, ?2)",
                params![row_id as i64, row.date.format("%Y-%m-%d").to_string()],
            )
            .map_err(db_err)?;
            for (position, value) in row.values.iter().enumerate() {
                if let Some(v) = value.filter(|v| !v.is_nan()) {
                    tx.execute(
                        "INSERT INTO cot_values (row_id, position, value) VALUES (?1, ?2, ?3)",
                        params![row_id as i64, position as i64, v],
                    )
                    .map_err(db_err)?;
                }
            }
        }

        tx.commit().map_err(db_err)?;
        Ok(())
    }

    fn lock(&self) -> Result<StoreLock, CotError> {
        match &self.lock_path {
            Some(path) => StoreLock::exclusive(path),
            None => Ok(StoreLock::unguarded()),
        }
    }

    fn describe(&self) -> String {
        self.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
    }

    fn sample() -> CotTable {
        CotTable {
            columns: vec!["ZL_COT_%".into(), "ZS_COT_%".into()],
            rows: vec![
                TableRow {
                    date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    values: vec![Some(4.5), None],
                },
                TableRow {
                    date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    values: vec![Some(4.75), None],
                },
                TableRow {
                    date: NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
                    values: vec![None, Some(-17.5)],
                },
            ],
        }
    }

    #[test]
    fn from_config_missing_path() {
        match SqliteStoreAdapter::from_config(&EmptyConfig) {
            Err(CotError::ConfigMissing { section, key }) => {
                assert_eq!(section, "store");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn fresh_database_loads_as_none() {
        let store = SqliteStoreAdapter::in_memory().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_then_load_preserves_rows_and_gaps() {
        let store = SqliteStoreAdapter::in_memory().unwrap();
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
    }

    #[test]
    fn save_replaces_previous_contents() {
        let store = SqliteStoreAdapter::in_memory().unwrap();
        store.save(&sample()).unwrap();

        let smaller = CotTable {
            columns: vec!["ZM_COT_%".into()],
            rows: vec![TableRow {
                date: NaiveDate::from_ymd_opt(2024, 2, 6).unwrap(),
                values: vec![Some(1.0)],
            }],
        };
        store.save(&smaller).unwrap();

        assert_eq!(store.load().unwrap(), Some(smaller));
    }

    #[test]
    fn file_database_persists_across_handles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cot.db");

        SqliteStoreAdapter::open(path.clone())
            .unwrap()
            .save(&sample())
            .unwrap();
        let reopened = SqliteStoreAdapter::open(path).unwrap();

        assert_eq!(reopened.load().unwrap(), Some(sample()));
        assert!(reopened.lock().unwrap().is_held());
    }
}
