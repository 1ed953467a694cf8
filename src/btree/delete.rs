use log::debug;

use crate::{
    btree::search::find_leaf,
    database::Database,
    error::SmallError,
    storage::{free_space, row::ROW_SIZE},
    types::SmallResult,
    utils::HandyRwLock,
};

/// Remove a key from the tree: erase its leaf cell and reclaim the head
/// row's region. Older versions in the chain become unreachable; internal
/// routing keys are left alone (the tree does not rebalance on delete).
///
/// A missing key is not an error.
pub fn delete(db: &Database, key: u32, tx_id: u32) -> SmallResult {
    let pager = db.pager();
    let _guard = db.row_insert_lock().lock().unwrap();

    let pos = match probe(db, key) {
        Ok(pos) => pos,
        Err(SmallError::KeyNotFound(_)) => {
            debug!("delete: key {} not found, tx_id: {}", key, tx_id);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let leaf_rc = pager.get_page(pos.0)?;
    let mut leaf = leaf_rc.wl();

    let offset = leaf.leaf_row_offset(pos.1);
    let num_cells = leaf.num_cells();

    leaf.shift_leaf_cells_left(pos.1);
    leaf.set_num_cells(num_cells - 1);

    leaf.zero_region(offset, ROW_SIZE as u16);
    free_space::reclaim(&mut leaf, offset, ROW_SIZE as u16);

    debug!("key {} deleted, tx_id: {}", key, tx_id);
    Ok(())
}

fn probe(db: &Database, key: u32) -> Result<(u32, usize), SmallError> {
    let pos = find_leaf(db.pager(), key)?;
    if !pos.found {
        return Err(SmallError::KeyNotFound(key));
    }
    Ok((pos.page_num, pos.cell_index))
}
