use rand::Rng;

use crate::storage::page::{Page, EMPTY_PAGE_ID};

/// Every transaction id is below this; a live row's `xmax` holds it.
pub const MAX_TRANSACTION_ID: u32 = u32::MAX;

/*
 * Row record layout
 *
 * The free-block words of a reclaimed slot (next-offset and size, 2
 * bytes each) land exactly on the `id` field. Only rows no chain
 * references are ever reclaimed, so nothing reads them back.
 */
const ROW_ID_OFFSET: usize = 0;
const ROW_IS_DELETED_OFFSET: usize = 4;
const ROW_XMIN_OFFSET: usize = 5;
const ROW_XMAX_OFFSET: usize = 9;
const ROW_DATA_OFFSET: usize = 13;
const ROW_PREV_PAGE_OFFSET: usize = 17;
const ROW_PREV_OFFSET_OFFSET: usize = 21;
pub const ROW_SIZE: usize = 23;

/// Location of a row record: page number plus page-base offset. Stored on
/// disk instead of a pointer so the link survives persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPtr {
    pub page_num: u32,
    pub offset: u16,
}

/// One physical row version. A leaf cell points at the head of a chain of
/// these; `prev` walks toward older versions.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: u32,
    pub is_deleted: bool,
    pub xmin: u32,
    pub xmax: u32,
    pub data: u32,
    pub prev: Option<RowPtr>,
}

impl Row {
    /// A brand-new head-of-chain row created by an insert.
    pub fn fresh(xmin: u32, data: u32) -> Self {
        let id = rand::thread_rng().gen::<u32>();
        Self {
            id,
            is_deleted: false,
            xmin,
            xmax: MAX_TRANSACTION_ID,
            data,
            prev: None,
        }
    }

    pub fn read_from(page: &Page, offset: u16) -> Self {
        let base = offset as usize;
        let prev_page = page.read_u32(base + ROW_PREV_PAGE_OFFSET);
        let prev = if prev_page == EMPTY_PAGE_ID {
            None
        } else {
            Some(RowPtr {
                page_num: prev_page,
                offset: page.read_u16(base + ROW_PREV_OFFSET_OFFSET),
            })
        };

        Self {
            id: page.read_u32(base + ROW_ID_OFFSET),
            is_deleted: page.bytes()[base + ROW_IS_DELETED_OFFSET] == 1,
            xmin: page.read_u32(base + ROW_XMIN_OFFSET),
            xmax: page.read_u32(base + ROW_XMAX_OFFSET),
            data: page.read_u32(base + ROW_DATA_OFFSET),
            prev,
        }
    }

    pub fn write_to(&self, page: &mut Page, offset: u16) {
        let base = offset as usize;
        page.write_u32(base + ROW_ID_OFFSET, self.id);
        page.bytes_mut()[base + ROW_IS_DELETED_OFFSET] = self.is_deleted as u8;
        page.write_u32(base + ROW_XMIN_OFFSET, self.xmin);
        page.write_u32(base + ROW_XMAX_OFFSET, self.xmax);
        page.write_u32(base + ROW_DATA_OFFSET, self.data);
        match self.prev {
            Some(ptr) => {
                page.write_u32(base + ROW_PREV_PAGE_OFFSET, ptr.page_num);
                page.write_u16(base + ROW_PREV_OFFSET_OFFSET, ptr.offset);
            }
            None => {
                page.write_u32(base + ROW_PREV_PAGE_OFFSET, EMPTY_PAGE_ID);
                page.write_u16(base + ROW_PREV_OFFSET_OFFSET, 0);
            }
        }
    }

    /// The MVCC visibility predicate: a reader sees the row when its id
    /// falls inside the row's [xmin, xmax) interval. The upper bound is
    /// exclusive, a superseded version vanishes for readers at the
    /// superseding transaction's id; live rows hold `MAX_TRANSACTION_ID`
    /// there, which no real id reaches.
    pub fn is_visible_to(&self, tx_id: u32) -> bool {
        self.xmin <= tx_id && tx_id < self.xmax
    }
}
