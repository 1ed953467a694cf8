use log::debug;

use crate::{
    database::Database,
    error::SmallError,
    storage::{
        page::{Page, PageCategory},
        pager::Pager,
    },
    utils::HandyRwLock,
};

/// Where a root-to-leaf descent for a key ended up.
pub(crate) struct LeafPos {
    pub page_num: u32,
    pub cell_index: usize,

    /// Whether the cell at `cell_index` holds exactly the probed key. When
    /// false, `cell_index` is the insertion point.
    pub found: bool,
}

/// Descend from the root to the leaf covering `key`.
pub(crate) fn find_leaf(pager: &Pager, key: u32) -> Result<LeafPos, SmallError> {
    let mut page_num = pager.root_page_num();

    loop {
        let page_rc = pager.get_page(page_num)?;
        let page = page_rc.rl();

        if !page.is_initialized() {
            return Ok(LeafPos {
                page_num,
                cell_index: 0,
                found: false,
            });
        }

        match page.category()? {
            PageCategory::Internal => {
                let pos = internal_route(&page, key);
                let child = page.child_at(pos).ok_or_else(|| {
                    SmallError::InvalidPage(format!(
                        "internal page {} has no child at position {}",
                        page_num, pos
                    ))
                })?;
                debug!(
                    "descend: page {} routes key {} to child {}",
                    page_num, key, child
                );
                page_num = child;
            }
            PageCategory::Leaf => {
                let (cell_index, found) = leaf_search(&page, key);
                return Ok(LeafPos {
                    page_num,
                    cell_index,
                    found,
                });
            }
        }
    }
}

/// Binary-search the routing keys of an internal node and return the child
/// position to follow. An equal key routes to the child after the matching
/// cell, so routing keys are strict upper bounds of their left subtrees.
pub(crate) fn internal_route(page: &Page, key: u32) -> usize {
    let mut min_index = 0;
    let mut one_past_max_index = page.num_keys();

    while min_index < one_past_max_index {
        let index = (min_index + one_past_max_index) / 2;
        let key_at_index = page.internal_key(index);
        if key < key_at_index {
            one_past_max_index = index;
        } else if key > key_at_index {
            min_index = index + 1;
        } else {
            return index + 1;
        }
    }

    min_index
}

/// Binary-search a leaf's cells. Returns the matching index and true, or
/// the insertion point and false.
pub(crate) fn leaf_search(page: &Page, key: u32) -> (usize, bool) {
    let mut min_index = 0;
    let mut one_past_max_index = page.num_cells();

    while min_index < one_past_max_index {
        let index = (min_index + one_past_max_index) / 2;
        let key_at_index = page.leaf_key(index);
        if key == key_at_index {
            return (index, true);
        }
        if key < key_at_index {
            one_past_max_index = index;
        } else {
            min_index = index + 1;
        }
    }

    (min_index, false)
}

/// Locate `key` in the tree. Returns the leaf page number and cell index,
/// or None when the key is absent.
pub fn search(
    db: &Database,
    key: u32,
) -> Result<Option<(u32, usize)>, SmallError> {
    let pos = find_leaf(db.pager(), key)?;
    if pos.found {
        Ok(Some((pos.page_num, pos.cell_index)))
    } else {
        Ok(None)
    }
}
