//! The per-leaf free-block list: reclaimed value-slot regions linked
//! through the page, sorted by page offset. The list head lives in the
//! common header; each region stores a 16-bit next-offset (0 terminates)
//! and a 16-bit size at its base.
//!
//! Only regions that no live version chain can reach may enter the list
//! (deleted heads and the slots vacated by a leaf split). A superseded
//! version stays allocated as long as a newer version links to it as
//! `prev`; handing its region back out would splice a cycle into the
//! chain.

use log::debug;

use crate::storage::{
    page::{Page, PAGE_SIZE},
    row::ROW_SIZE,
};

fn next_of(page: &Page, offset: u16) -> u16 {
    page.read_u16(offset as usize)
}

fn set_next_of(page: &mut Page, offset: u16, next: u16) {
    page.write_u16(offset as usize, next);
}

fn set_size_of(page: &mut Page, offset: u16, size: u16) {
    page.write_u16(offset as usize + 2, size);
}

/// Link a reclaimed region into the page's free-block list, keeping the
/// list sorted by ascending page offset. The region must be unreachable
/// from every live version chain.
pub fn reclaim(page: &mut Page, offset: u16, size: u16) {
    debug!("reclaim region, offset: {}, size: {}", offset, size);

    let head = page.free_block_head();
    if head == 0 {
        page.set_free_block_head(offset);
        set_next_of(page, offset, 0);
        set_size_of(page, offset, size);
        return;
    }

    if offset < head {
        // the new region becomes the head
        set_next_of(page, offset, head);
        set_size_of(page, offset, size);
        page.set_free_block_head(offset);
        return;
    }

    // walk to the first region past the new one, splice in between
    let mut prev = head;
    let mut next = next_of(page, prev);
    while next != 0 && next < offset {
        prev = next;
        next = next_of(page, next);
    }

    set_next_of(page, offset, next);
    set_size_of(page, offset, size);
    set_next_of(page, prev, offset);
}

/// Hand out a value slot for one row record. Reclaimed regions are reused
/// from the tail of the free-block list first; otherwise the next default
/// slot is carved from the downward-growing area at the end of the page.
pub fn allocate_slot(page: &mut Page) -> u16 {
    let head = page.free_block_head();
    if head != 0 {
        if next_of(page, head) == 0 {
            page.set_free_block_head(0);
            debug!("reuse reclaimed slot, offset: {}", head);
            return head;
        }

        let mut prev = head;
        let mut tail = next_of(page, head);
        while next_of(page, tail) != 0 {
            prev = tail;
            tail = next_of(page, tail);
        }
        set_next_of(page, prev, 0);
        debug!("reuse reclaimed slot, offset: {}", tail);
        return tail;
    }

    let used = page.value_slots_used();
    let offset = (PAGE_SIZE - (used + 1) * ROW_SIZE) as u16;
    page.set_value_slots_used(used + 1);
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_leaf() -> Page {
        let mut page = Page::new();
        page.init_leaf();
        page
    }

    #[test]
    fn test_default_slots_grow_downward() {
        let mut page = empty_leaf();

        let first = allocate_slot(&mut page);
        let second = allocate_slot(&mut page);

        assert_eq!(first as usize, PAGE_SIZE - ROW_SIZE);
        assert_eq!(second as usize, PAGE_SIZE - 2 * ROW_SIZE);
        assert_eq!(page.value_slots_used(), 2);
    }

    #[test]
    fn test_reclaimed_slot_is_reused() {
        let mut page = empty_leaf();

        let first = allocate_slot(&mut page);
        let _second = allocate_slot(&mut page);

        reclaim(&mut page, first, ROW_SIZE as u16);
        assert_eq!(allocate_slot(&mut page), first);
        assert_eq!(page.free_block_head(), 0);
    }

    #[test]
    fn test_list_stays_sorted_by_offset() {
        let mut page = empty_leaf();

        let slots: Vec<u16> =
            (0..4).map(|_| allocate_slot(&mut page)).collect();

        // reclaim out of order: slots[2] < slots[0] in page offset
        reclaim(&mut page, slots[0], ROW_SIZE as u16);
        reclaim(&mut page, slots[2], ROW_SIZE as u16);
        reclaim(&mut page, slots[1], ROW_SIZE as u16);

        // walk the list, offsets must ascend strictly
        let mut cursor = page.free_block_head();
        let mut seen = Vec::new();
        while cursor != 0 {
            seen.push(cursor);
            cursor = next_of(&page, cursor);
        }
        assert_eq!(seen, vec![slots[2], slots[1], slots[0]]);

        // the tail (highest offset) is detached first
        assert_eq!(allocate_slot(&mut page), slots[0]);
        assert_eq!(allocate_slot(&mut page), slots[1]);
        assert_eq!(allocate_slot(&mut page), slots[2]);
        assert_eq!(page.free_block_head(), 0);
    }
}
