use log::debug;

use crate::{
    btree::{
        search::{find_leaf, internal_route, leaf_search},
        update,
    },
    database::Database,
    error::SmallError,
    storage::{
        free_space,
        page::{Page, NODE_ORDER},
        pager::Pager,
        row::{Row, ROW_SIZE},
    },
    types::SmallResult,
    utils::HandyRwLock,
    wal::TransactionType,
};

/// Insert a key/value pair into the tree. A key that is already present
/// is promoted to an MVCC update of its row.
pub fn insert(db: &Database, key: u32, value: u32, tx_id: u32) -> SmallResult {
    let pager = db.pager();

    let pos = {
        let _guard = db.row_insert_lock().lock().unwrap();

        // the first insert into an empty tree initializes the root leaf
        {
            let root_num = pager.root_page_num();
            let root_rc = pager.get_page(root_num)?;
            let mut root = root_rc.wl();
            if !root.is_initialized() {
                debug!("initializing page {} as the root leaf", root_num);
                root.init_leaf();
                root.set_root(true);
            }
        }

        let pos = find_leaf(pager, key)?;
        if !pos.found {
            // log the mutation before touching the tree
            db.wal().append(TransactionType::Insert, tx_id, value)?;
            return insert_into_leaf(pager, pos.page_num, key, value, tx_id);
        }
        pos
    };

    update::update(db, pos.page_num, pos.cell_index, key, value, tx_id)
}

fn insert_into_leaf(
    pager: &Pager,
    page_num: u32,
    key: u32,
    value: u32,
    tx_id: u32,
) -> SmallResult {
    let leaf_rc = pager.get_page(page_num)?;
    {
        let mut leaf = leaf_rc.wl();
        if leaf.num_cells() < NODE_ORDER {
            insert_leaf_cell(&mut leaf, key, value, tx_id);
            return Ok(());
        }
    }

    split_leaf(pager, page_num, key, value, tx_id)
}

/// Write one (key, row) cell into a leaf that has room.
fn insert_leaf_cell(leaf: &mut Page, key: u32, value: u32, tx_id: u32) {
    let (index, _) = leaf_search(leaf, key);
    let num_cells = leaf.num_cells();

    leaf.shift_leaf_cells_right(index);
    leaf.set_leaf_key(index, key);

    let slot = free_space::allocate_slot(leaf);
    let row = Row::fresh(tx_id, value);
    row.write_to(leaf, slot);
    leaf.set_leaf_row_offset(index, slot);

    leaf.set_num_cells(num_cells + 1);
    debug!(
        "leaf cell written, key: {}, slot: {}, tx_id: {}",
        key, slot, tx_id
    );
}

/// Split a full leaf: the upper half of the cells moves to a fresh
/// sibling, the pending key lands in whichever half covers it, and the
/// sibling's first key is promoted into the parent.
fn split_leaf(
    pager: &Pager,
    page_num: u32,
    key: u32,
    value: u32,
    tx_id: u32,
) -> SmallResult {
    debug!("splitting leaf {}", page_num);

    let parent_num = ensure_parent(pager, page_num)?;
    let (sibling_num, sibling_rc) = pager.allocate_page()?;
    let leaf_rc = pager.get_page(page_num)?;

    let promoted_key;
    {
        let mut leaf = leaf_rc.wl();
        let mut sibling = sibling_rc.wl();
        sibling.init_leaf();

        let num_cells = leaf.num_cells();
        let split_from = num_cells / 2;

        // Head rows travel with their cells; their prev links keep
        // pointing at older versions left behind in the source page. The
        // vacated head regions go to the source's free list.
        let mut vacated = Vec::new();
        for i in split_from..num_cells {
            let moved_key = leaf.leaf_key(i);
            let old_offset = leaf.leaf_row_offset(i);
            let row = Row::read_from(&leaf, old_offset);

            let slot = free_space::allocate_slot(&mut sibling);
            row.write_to(&mut sibling, slot);
            let cell = i - split_from;
            sibling.set_leaf_key(cell, moved_key);
            sibling.set_leaf_row_offset(cell, slot);
            vacated.push(old_offset);
        }
        sibling.set_num_cells(num_cells - split_from);

        leaf.set_num_cells(split_from);
        for old_offset in vacated {
            free_space::reclaim(&mut leaf, old_offset, ROW_SIZE as u16);
        }

        sibling.set_right_sibling(leaf.right_sibling());
        leaf.set_right_sibling(Some(sibling_num));
        sibling.set_parent(Some(parent_num));
        leaf.set_parent(Some(parent_num));

        promoted_key = sibling.leaf_key(0);

        if key < promoted_key {
            insert_leaf_cell(&mut leaf, key, value, tx_id);
        } else {
            insert_leaf_cell(&mut sibling, key, value, tx_id);
        }
    }

    insert_into_internal(pager, parent_num, promoted_key, page_num, sibling_num)
}

/// Page number of an initialized parent for `page_num`, allocating and
/// installing a fresh internal root when the node has none.
fn ensure_parent(pager: &Pager, page_num: u32) -> Result<u32, SmallError> {
    let node_rc = pager.get_page(page_num)?;

    let existing = node_rc.rl().parent();
    if let Some(parent_num) = existing {
        let parent_rc = pager.get_page(parent_num)?;
        if parent_rc.rl().is_initialized() {
            return Ok(parent_num);
        }
    }

    let (root_num, root_rc) = pager.allocate_page()?;
    debug!("installing new root, page: {}", root_num);
    {
        let mut root = root_rc.wl();
        root.init_internal();
        root.set_root(true);
    }
    {
        let mut node = node_rc.wl();
        node.set_root(false);
        node.set_parent(Some(root_num));
    }
    pager.set_root_page(root_num);

    Ok(root_num)
}

fn insert_into_internal(
    pager: &Pager,
    page_num: u32,
    key: u32,
    left_child: u32,
    right_child: u32,
) -> SmallResult {
    let node_rc = pager.get_page(page_num)?;
    {
        let mut node = node_rc.wl();
        if node.num_keys() < NODE_ORDER - 1 {
            insert_internal_entry(&mut node, key, left_child, right_child);
            return Ok(());
        }
    }

    split_internal(pager, page_num, key, left_child, right_child)
}

/// Install a promoted key into an internal node that has room. The new
/// cell carries the left half of the split pair; the child slot that used
/// to cover the split node is repointed at the right half. Exactly one
/// slot changes.
fn insert_internal_entry(
    node: &mut Page,
    key: u32,
    left_child: u32,
    right_child: u32,
) {
    let index = internal_route(node, key);
    let num_keys = node.num_keys();

    node.shift_internal_cells_right(index);
    node.set_internal_child(index, left_child);
    node.set_internal_key(index, key);
    node.set_num_keys(num_keys + 1);
    node.set_child_at(index + 1, right_child);

    debug!(
        "internal entry written, key: {}, left: {}, right: {}",
        key, left_child, right_child
    );
}

/// Split a full internal node: the upper-half cells and the right child
/// move to a fresh sibling, the middle cell's left child becomes the
/// source's right child, and the middle key is promoted.
fn split_internal(
    pager: &Pager,
    page_num: u32,
    key: u32,
    left_child: u32,
    right_child: u32,
) -> SmallResult {
    debug!("splitting internal {}", page_num);

    let parent_num = ensure_parent(pager, page_num)?;
    let (sibling_num, sibling_rc) = pager.allocate_page()?;
    let node_rc = pager.get_page(page_num)?;

    let promoted_key;
    let route_right;
    let mut moved_children = Vec::new();
    {
        let mut node = node_rc.wl();
        let mut sibling = sibling_rc.wl();
        sibling.init_internal();

        let num_keys = node.num_keys();
        let mid = num_keys / 2;
        promoted_key = node.internal_key(mid);

        for i in (mid + 1)..num_keys {
            let cell = i - mid - 1;
            sibling.set_internal_child(cell, node.internal_child(i));
            sibling.set_internal_key(cell, node.internal_key(i));
            moved_children.push(node.internal_child(i));
        }
        sibling.set_num_keys(num_keys - mid - 1);
        sibling.set_right_child(node.right_child());
        if let Some(old_right) = node.right_child() {
            moved_children.push(old_right);
        }

        // the middle cell's left child becomes the source's right child
        let mid_child = node.internal_child(mid);
        node.set_right_child(Some(mid_child));
        node.set_num_keys(mid);

        sibling.set_parent(Some(parent_num));
        node.set_parent(Some(parent_num));

        route_right = key > promoted_key;
        if route_right {
            insert_internal_entry(&mut sibling, key, left_child, right_child);
        } else {
            insert_internal_entry(&mut node, key, left_child, right_child);
        }
    }

    for child_num in moved_children {
        let child_rc = pager.get_page(child_num)?;
        child_rc.wl().set_parent(Some(sibling_num));
    }
    if route_right {
        let child_rc = pager.get_page(right_child)?;
        child_rc.wl().set_parent(Some(sibling_num));
    }

    insert_into_internal(pager, parent_num, promoted_key, page_num, sibling_num)
}
