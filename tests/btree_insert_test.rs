mod test_utils;

use small_kv::{
    btree::{search, select_all},
    storage::page::{PageCategory, NODE_ORDER},
    utils::HandyRwLock,
};

use crate::test_utils::{insert, new_empty_db, visible_keys};

#[test]
fn test_insert_and_select() {
    let (db, _dir) = new_empty_db();

    insert(&db, 3, 3);
    insert(&db, 6, 6);
    insert(&db, 9, 9);

    let tx_id = db.wal().next_xid().unwrap();
    let rows = select_all(&db, tx_id).unwrap();
    assert_eq!(
        rows.iter().map(|r| (r.key, r.data)).collect::<Vec<_>>(),
        vec![(3, 3), (6, 6), (9, 9)]
    );
}

#[test]
fn test_search_after_insert() {
    let (db, _dir) = new_empty_db();

    insert(&db, 42, 420);

    let pos = search(&db, 42).unwrap();
    assert!(pos.is_some());
    assert_eq!(search(&db, 43).unwrap(), None);
}

#[test]
fn test_leaf_split_on_overflow() {
    let (db, _dir) = new_empty_db();

    // fill exactly one leaf
    for i in 0..NODE_ORDER as u32 {
        insert(&db, i * 10, i);
    }
    assert_eq!(db.pager().num_pages(), 1);
    assert_eq!(db.pager().root_page_num(), 0);

    // one more insert splits the leaf and promotes a new internal root
    insert(&db, 1000, 100);

    // 3 pages now: old leaf, new root, sibling leaf
    assert_eq!(db.pager().num_pages(), 3);
    assert_eq!(db.pager().root_page_num(), 1);

    let root_rc = db.pager().get_page(1).unwrap();
    {
        let root = root_rc.rl();
        assert_eq!(root.category().unwrap(), PageCategory::Internal);
        assert!(root.is_root());
        assert_eq!(root.num_keys(), 1);

        // the single routing key equals the sibling's first key
        let sibling_rc = db.pager().get_page(2).unwrap();
        let sibling = sibling_rc.rl();
        assert_eq!(root.internal_key(0), sibling.leaf_key(0));

        // both halves hold their share of the cells
        let left_rc = db.pager().get_page(0).unwrap();
        let left = left_rc.rl();
        assert_eq!(
            left.num_cells() + sibling.num_cells(),
            NODE_ORDER + 1
        );
        assert!(!left.is_root());
    }

    // every key is still reachable in order
    let expected: Vec<u32> =
        (0..NODE_ORDER as u32).map(|i| i * 10).chain(Some(1000)).collect();
    assert_eq!(visible_keys(&db), expected);
}

#[test]
fn test_split_keeps_small_key_in_left_leaf() {
    let (db, _dir) = new_empty_db();

    for i in 1..=NODE_ORDER as u32 {
        insert(&db, i * 10, i);
    }

    // a key below every existing one lands in the left half
    insert(&db, 5, 5);

    let left_rc = db.pager().get_page(0).unwrap();
    let left = left_rc.rl();
    assert_eq!(left.leaf_key(0), 5);
    assert_eq!(left.parent(), Some(db.pager().root_page_num()));

    let mut expected = vec![5];
    expected.extend((1..=NODE_ORDER as u32).map(|i| i * 10));
    assert_eq!(visible_keys(&db), expected);
}

#[test]
fn test_multi_level_tree() {
    let (db, _dir) = new_empty_db();

    // enough keys to split internal nodes as well
    for key in 0..200 {
        insert(&db, key, key + 1);
    }

    let keys = visible_keys(&db);
    assert_eq!(keys, (0..200).collect::<Vec<u32>>());

    // the root moved away from page 0 and is an internal node
    let root_num = db.pager().root_page_num();
    assert_ne!(root_num, 0);
    let root_rc = db.pager().get_page(root_num).unwrap();
    assert_eq!(
        root_rc.rl().category().unwrap(),
        PageCategory::Internal
    );

    // spot-check point lookups across the whole range
    for key in (0..200).step_by(17) {
        assert!(search(&db, key).unwrap().is_some());
    }
    assert_eq!(search(&db, 200).unwrap(), None);
}

#[test]
fn test_descending_inserts() {
    let (db, _dir) = new_empty_db();

    for key in (0..50).rev() {
        insert(&db, key, key);
    }

    assert_eq!(visible_keys(&db), (0..50).collect::<Vec<u32>>());
}
