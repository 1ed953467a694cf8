mod test_utils;

use small_kv::{
    btree::{search, select_all},
    storage::{page::PAGE_SIZE, row::ROW_SIZE},
    utils::HandyRwLock,
};

use crate::test_utils::{delete, insert, new_empty_db, visible_keys};

#[test]
fn test_delete_then_reinsert() {
    let (db, _dir) = new_empty_db();

    insert(&db, 3, 3);
    delete(&db, 3);

    assert_eq!(search(&db, 3).unwrap(), None);
    assert_eq!(visible_keys(&db), Vec::<u32>::new());

    let reinsert_tx = insert(&db, 3, 30);

    let tx_id = db.wal().next_xid().unwrap();
    let rows = select_all(&db, tx_id).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].key, 3);
    assert_eq!(rows[0].data, 30);
    assert_eq!(rows[0].xmin, reinsert_tx);
}

#[test]
fn test_delete_missing_key_is_noop() {
    let (db, _dir) = new_empty_db();

    insert(&db, 1, 1);

    // deleting an absent key succeeds and leaves the tree alone
    delete(&db, 42);
    assert_eq!(visible_keys(&db), vec![1]);

    // the delete still went through the WAL before probing the tree
    assert_eq!(db.wal().records_count().unwrap(), 2);
}

#[test]
fn test_delete_erases_cell_and_shifts() {
    let (db, _dir) = new_empty_db();

    insert(&db, 10, 10);
    insert(&db, 20, 20);
    insert(&db, 30, 30);

    delete(&db, 20);

    let leaf_rc = db.pager().get_page(0).unwrap();
    {
        let leaf = leaf_rc.rl();
        assert_eq!(leaf.num_cells(), 2);
        assert_eq!(leaf.leaf_key(0), 10);
        assert_eq!(leaf.leaf_key(1), 30);
    }

    assert_eq!(visible_keys(&db), vec![10, 30]);
}

#[test]
fn test_freed_slot_reused_by_next_insert() {
    let (db, _dir) = new_empty_db();

    insert(&db, 1, 1);
    insert(&db, 2, 2);

    // key 1 owns the first default slot at the very end of the page
    let first_slot = (PAGE_SIZE - ROW_SIZE) as u16;
    delete(&db, 1);

    // the next insert into this leaf picks the reclaimed region back up
    insert(&db, 7, 7);

    let leaf_rc = db.pager().get_page(0).unwrap();
    let leaf = leaf_rc.rl();
    let (index, found) = (0..leaf.num_cells())
        .find(|&i| leaf.leaf_key(i) == 7)
        .map(|i| (i, true))
        .unwrap_or((0, false));
    assert!(found);
    assert_eq!(leaf.leaf_row_offset(index), first_slot);

    // no extra default slot was carved
    assert_eq!(leaf.value_slots_used(), 2);
}
