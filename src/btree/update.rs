use log::{debug, warn};

use crate::{
    database::Database,
    error::SmallError,
    storage::{
        free_space,
        row::{Row, RowPtr, MAX_TRANSACTION_ID},
    },
    types::SmallResult,
    utils::HandyRwLock,
    wal::TransactionType,
};

/// MVCC update of an existing row: append a new version at the head of
/// the chain and tombstone the old head. The row id survives across
/// versions; only the visibility interval and the payload change.
///
/// The superseded head stays allocated: the new version references it as
/// `prev`, so its region must not re-enter the free-block list while the
/// chain lives. Regions are reclaimed on delete, when the whole chain is
/// dropped.
///
/// A row whose head was created by a newer transaction refuses the
/// update. The check runs before the WAL append, so a refused update
/// leaves no trace anywhere.
pub(crate) fn update(
    db: &Database,
    page_num: u32,
    cell_index: usize,
    key: u32,
    value: u32,
    tx_id: u32,
) -> SmallResult {
    let leaf_rc = db.pager().get_page(page_num)?;

    {
        let leaf = leaf_rc.rl();
        let offset = leaf.leaf_row_offset(cell_index);
        let head = Row::read_from(&leaf, offset);
        if head.xmin > tx_id {
            let err = SmallError::UpdateBlocked {
                key,
                row_xmin: head.xmin,
                tx_id,
            };
            warn!("{}", err);
            return Err(err);
        }
    }

    db.wal().append(TransactionType::Insert, tx_id, value)?;

    let _guard = db.row_update_lock().lock().unwrap();
    let mut leaf = leaf_rc.wl();

    // re-read under the lock, a concurrent update may have won the race
    let old_offset = leaf.leaf_row_offset(cell_index);
    let mut head = Row::read_from(&leaf, old_offset);
    if head.xmin > tx_id {
        let err = SmallError::UpdateBlocked {
            key,
            row_xmin: head.xmin,
            tx_id,
        };
        warn!("{}", err);
        return Err(err);
    }

    let new_offset = free_space::allocate_slot(&mut leaf);
    let new_row = Row {
        id: head.id,
        is_deleted: false,
        xmin: tx_id,
        xmax: MAX_TRANSACTION_ID,
        data: value,
        prev: Some(RowPtr {
            page_num,
            offset: old_offset,
        }),
    };
    new_row.write_to(&mut leaf, new_offset);
    leaf.set_leaf_row_offset(cell_index, new_offset);

    head.is_deleted = true;
    head.xmax = tx_id;
    head.write_to(&mut leaf, old_offset);

    debug!(
        "row updated, key: {}, value: {}, tx_id: {}, chain head: {} -> {}",
        key, value, tx_id, old_offset, new_offset
    );
    Ok(())
}
