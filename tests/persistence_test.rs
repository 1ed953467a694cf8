mod test_utils;

use small_kv::{btree::select_all, storage::page::NODE_ORDER, Database};

use crate::test_utils::{insert, new_empty_db, setup, visible_keys};

#[test]
fn test_reopen_keeps_single_leaf() {
    let (db, dir) = new_empty_db();

    insert(&db, 7, 7);
    db.close().unwrap();
    drop(db);

    let db = Database::open(
        dir.path().join("small.db"),
        dir.path().join("wal.txt"),
    )
    .unwrap();

    let tx_id = db.wal().next_xid().unwrap();
    let rows = select_all(&db, tx_id).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!((rows[0].key, rows[0].data), (7, 7));
}

#[test]
fn test_reopen_recovers_multi_page_tree() {
    setup();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("small.db");
    let wal_path = dir.path().join("wal.txt");

    let (keys_before, root_before) = {
        let db = Database::open(&db_path, &wal_path).unwrap();
        for key in 0..(NODE_ORDER as u32 * 3) {
            insert(&db, key, key * 2);
        }
        let keys = visible_keys(&db);
        let root = db.pager().root_page_num();
        db.close().unwrap();
        (keys, root)
    };
    assert_ne!(root_before, 0);

    let db = Database::open(&db_path, &wal_path).unwrap();

    // the root page number is recovered from the is-root header flag
    assert_eq!(db.pager().root_page_num(), root_before);
    assert_eq!(visible_keys(&db), keys_before);
}

#[test]
fn test_reopen_continues_xid_sequence() {
    let (db, dir) = new_empty_db();

    let first_tx = insert(&db, 1, 1);
    db.close().unwrap();
    drop(db);

    let db = Database::open(
        dir.path().join("small.db"),
        dir.path().join("wal.txt"),
    )
    .unwrap();
    let next_tx = insert(&db, 2, 2);

    assert!(next_tx > first_tx);
}
