//! Persisted table store port.

use crate::domain::error::CotError;
use crate::domain::table::CotTable;
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

/// Whole-table storage: the table is always loaded and saved as one unit.
pub trait TableStore {
    /// The stored table, or `None` when the store does not exist yet.
    fn load(&self) -> Result<Option<CotTable>, CotError>;

    /// Replace the stored table. Readers never observe a partial write.
    fn save(&self, table: &CotTable) -> Result<(), CotError>;

    /// Exclusive access for one load-combine-save cycle.
    fn lock(&self) -> Result<StoreLock, CotError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Scoped single-writer guard. Released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: Option<File>,
    path: Option<PathBuf>,
}

impl StoreLock {
    /// Guard for stores with no shared backing file (in-memory).
    pub fn unguarded() -> Self {
        Self {
            file: None,
            path: None,
        }
    }

    /// Take an advisory OS lock on `lock_path`, failing fast if another
    /// process holds it.
    pub fn exclusive(lock_path: &Path) -> Result<Self, CotError> {
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| CotError::persistence(lock_path.display(), e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path)
            .map_err(|e| CotError::persistence(lock_path.display(), e))?;

        match file.try_lock() {
            Ok(()) => Ok(Self {
                file: Some(file),
                path: Some(lock_path.to_path_buf()),
            }),
            Err(TryLockError::WouldBlock) => Err(CotError::StoreLocked {
                path: lock_path.display().to_string(),
            }),
            Err(TryLockError::Error(e)) => Err(CotError::persistence(lock_path.display(), e)),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

/// Sidecar lock file next to a store file: `cot.csv` -> `cot.csv.lock`.
pub fn lock_path_for(store_path: &Path) -> PathBuf {
    let mut name = store_path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}
