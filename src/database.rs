use std::{path::Path, sync::Mutex};

use log::info;

use crate::{
    error::SmallError, storage::pager::Pager, types::SmallResult, wal::Wal,
};

/// One open database: the pager over the data file, the write-ahead log,
/// and the operation locks shared by every transaction thread.
pub struct Database {
    pager: Pager,
    wal: Wal,

    /// Serializes the critical section of a leaf insert.
    row_insert_lock: Mutex<()>,

    /// Serializes the MVCC update critical section (chain append, cell
    /// repoint, free-block update).
    row_update_lock: Mutex<()>,
}

impl Database {
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        db_path: P,
        wal_path: Q,
    ) -> Result<Self, SmallError> {
        let pager = Pager::open(db_path)?;
        let wal = Wal::open(wal_path)?;
        info!("database opened");

        Ok(Self {
            pager,
            wal,
            row_insert_lock: Mutex::new(()),
            row_update_lock: Mutex::new(()),
        })
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn wal(&self) -> &Wal {
        &self.wal
    }

    pub(crate) fn row_insert_lock(&self) -> &Mutex<()> {
        &self.row_insert_lock
    }

    pub(crate) fn row_update_lock(&self) -> &Mutex<()> {
        &self.row_update_lock
    }

    /// Flush every cached page and close both files.
    pub fn close(&self) -> SmallResult {
        self.pager.close()?;
        self.wal.close()
    }
}
