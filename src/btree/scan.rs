use std::collections::HashSet;

use log::{debug, error};

use crate::{
    database::Database,
    error::SmallError,
    storage::{
        page::PageCategory,
        pager::Pager,
        row::{Row, RowPtr},
    },
    types::SmallResult,
    utils::HandyRwLock,
};

/// One row an observer is allowed to see, with its visibility interval.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRow {
    pub key: u32,
    pub data: u32,
    pub xmin: u32,
    pub xmax: u32,
}

/// Depth-first traversal of the whole tree, yielding every row version
/// whose [xmin, xmax) interval contains `tx_id`, in key order.
pub fn select_all(
    db: &Database,
    tx_id: u32,
) -> Result<Vec<VisibleRow>, SmallError> {
    let pager = db.pager();
    let root_num = pager.root_page_num();

    {
        let root_rc = pager.get_page(root_num)?;
        if !root_rc.rl().is_initialized() {
            return Ok(Vec::new());
        }
    }

    let mut out = Vec::new();
    scan_page(pager, root_num, tx_id, &mut out)?;
    debug!("select_all: {} visible rows for tx_id {}", out.len(), tx_id);
    Ok(out)
}

fn scan_page(
    pager: &Pager,
    page_num: u32,
    tx_id: u32,
    out: &mut Vec<VisibleRow>,
) -> SmallResult {
    let page_rc = pager.get_page(page_num)?;

    let category = page_rc.rl().category()?;
    match category {
        PageCategory::Internal => {
            let children = {
                let page = page_rc.rl();
                let mut children: Vec<u32> = (0..page.num_keys())
                    .map(|i| page.internal_child(i))
                    .collect();
                if let Some(right) = page.right_child() {
                    children.push(right);
                }
                children
            };

            for child in children {
                scan_page(pager, child, tx_id, out)?;
            }
        }
        PageCategory::Leaf => {
            let heads: Vec<(u32, RowPtr)> = {
                let page = page_rc.rl();
                (0..page.num_cells())
                    .map(|i| {
                        (
                            page.leaf_key(i),
                            RowPtr {
                                page_num,
                                offset: page.leaf_row_offset(i),
                            },
                        )
                    })
                    .collect()
            };

            for (key, head) in heads {
                walk_chain(pager, key, head, tx_id, out)?;
            }
        }
    }

    Ok(())
}

/// Walk one version chain from its head, newest first. A chain that
/// loops back on itself is corrupt; the walk stops at the first revisit
/// instead of hanging.
fn walk_chain(
    pager: &Pager,
    key: u32,
    head: RowPtr,
    tx_id: u32,
    out: &mut Vec<VisibleRow>,
) -> SmallResult {
    let mut visited: HashSet<(u32, u16)> = HashSet::new();

    let mut cursor = Some(head);
    while let Some(ptr) = cursor {
        if !visited.insert((ptr.page_num, ptr.offset)) {
            error!(
                "cycle in version chain, key: {}, page: {}, offset: {}",
                key, ptr.page_num, ptr.offset
            );
            break;
        }

        let page_rc = pager.get_page(ptr.page_num)?;
        let page = page_rc.rl();
        let row = Row::read_from(&page, ptr.offset);

        if row.is_visible_to(tx_id) {
            out.push(VisibleRow {
                key,
                data: row.data,
                xmin: row.xmin,
                xmax: row.xmax,
            });
        }
        cursor = row.prev;
    }
    Ok(())
}
