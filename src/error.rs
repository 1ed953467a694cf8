use std::{error::Error, fmt};

use backtrace::Backtrace;
use log::error;

/// All failures the storage engine can surface to callers.
///
/// I/O errors carry the underlying message, the rest are engine-level
/// conditions with the context needed to act on them.
#[derive(Debug, Clone, PartialEq)]
pub enum SmallError {
    /// An open/seek/read/write/close on the database or WAL file failed.
    Io(String),

    /// A WAL operation was requested after the log file was closed.
    WalNotInitialized,

    /// An MVCC update found the row owned by a newer transaction
    /// (`row_xmin > tx_id`) and refused to touch the chain.
    UpdateBlocked {
        key: u32,
        row_xmin: u32,
        tx_id: u32,
    },

    /// The key is not present in the tree.
    KeyNotFound(u32),

    /// The pager ran out of cache slots for the requested page number.
    PagerFull(u32),

    /// A page whose contents do not form a valid node.
    InvalidPage(String),
}

impl SmallError {
    pub fn io<E: fmt::Display>(e: E) -> Self {
        SmallError::Io(e.to_string())
    }

    pub fn show_backtrace(&self) {
        let bt = Backtrace::new();
        error!("{}\n{:?}", self, bt);
    }
}

impl fmt::Display for SmallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SmallError::Io(msg) => write!(f, "io error: {}", msg),
            SmallError::WalNotInitialized => {
                write!(f, "wal file not initialized")
            }
            SmallError::UpdateBlocked {
                key,
                row_xmin,
                tx_id,
            } => write!(
                f,
                "update blocked, key: {}, row xmin: {}, tx id: {}",
                key, row_xmin, tx_id
            ),
            SmallError::KeyNotFound(key) => {
                write!(f, "key not found: {}", key)
            }
            SmallError::PagerFull(page_num) => {
                write!(f, "no pager slot for page {}", page_num)
            }
            SmallError::InvalidPage(msg) => {
                write!(f, "invalid page: {}", msg)
            }
        }
    }
}

impl Error for SmallError {}
