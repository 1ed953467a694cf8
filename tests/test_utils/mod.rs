use std::sync::Once;

use small_kv::{
    transaction::{start_transaction, Transaction},
    utils, Database,
};
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Set up log configurations once per test binary.
pub fn setup() {
    INIT.call_once(utils::init_log);
}

/// Open a database over fresh files in a private temp directory. Keep the
/// returned guard alive for the lifetime of the database, the directory is
/// removed when it drops.
pub fn new_empty_db() -> (Database, TempDir) {
    setup();

    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(
        dir.path().join("small.db"),
        dir.path().join("wal.txt"),
    )
    .unwrap();
    (db, dir)
}

/// Run one INSERT transaction and return its transaction id.
pub fn insert(db: &Database, key: u32, value: u32) -> u32 {
    start_transaction(db, &Transaction::insert(key, value)).unwrap()
}

/// Run one DELETE transaction and return its transaction id.
pub fn delete(db: &Database, key: u32) -> u32 {
    start_transaction(db, &Transaction::delete(key)).unwrap()
}

/// The keys currently visible to a fresh reader, in scan order.
pub fn visible_keys(db: &Database) -> Vec<u32> {
    let tx_id = db.wal().next_xid().unwrap();
    small_kv::btree::select_all(db, tx_id)
        .unwrap()
        .iter()
        .map(|row| row.key)
        .collect()
}
