use core::fmt;

use log::debug;

use crate::{
    btree, database::Database, error::SmallError, wal::TransactionType,
};

/// Description of one transaction: a single INSERT or DELETE against the
/// tree. The transaction id is assigned when the transaction starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub tx_type: TransactionType,
    pub key: u32,
    pub value: u32,
}

impl Transaction {
    pub fn insert(key: u32, value: u32) -> Self {
        Self {
            tx_type: TransactionType::Insert,
            key,
            value,
        }
    }

    pub fn delete(key: u32) -> Self {
        Self {
            tx_type: TransactionType::Delete,
            key,
            value: 0,
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.tx_type {
            TransactionType::Insert => {
                write!(f, "insert({}, {})", self.key, self.value)
            }
            TransactionType::Delete => write!(f, "delete({})", self.key),
        }
    }
}

/// Run one transaction end-to-end: mint a transaction id from the WAL,
/// log the mutation, then apply the tree operator. Returns the id the
/// transaction ran under.
///
/// A failure partway through returns early; there is no rollback.
pub fn start_transaction(
    db: &Database,
    tx: &Transaction,
) -> Result<u32, SmallError> {
    let tx_id = db.wal().next_xid()?;
    debug!("tx_{} start: {}", tx_id, tx);

    match tx.tx_type {
        TransactionType::Insert => {
            // the insert operator logs to the WAL itself, after the
            // duplicate-key probe decides between insert and update
            btree::insert(db, tx.key, tx.value, tx_id)?;
        }
        TransactionType::Delete => {
            db.wal().append(TransactionType::Delete, tx_id, tx.key)?;
            btree::delete(db, tx.key, tx_id)?;
        }
    }

    debug!("tx_{} done", tx_id);
    Ok(tx_id)
}
