use std::{
    path::Path,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex, RwLock,
    },
};

use log::{debug, info};

use crate::{
    error::SmallError,
    io::SmallFile,
    storage::page::{Page, PAGE_SIZE},
    types::{Pod, SmallResult},
    utils::HandyRwLock,
};

pub const MAX_NUM_OF_PAGES: usize = 100;

const IS_ROOT_OFFSET: u64 = 2;

/// The lazy cache between page numbers and page buffers, backed by a
/// single database file. Pages are read in on first access and written
/// back when the database closes.
pub struct Pager {
    file: SmallFile,

    /// One slot per possible page number, filled lazily. The mutex guards
    /// slot allocation; the per-page RwLock guards page contents.
    slots: Mutex<Vec<Option<Pod<Page>>>>,

    /// Count of pages this pager knows about (cached or on disk).
    num_pages: AtomicU32,

    /// How many full pages the file held when it was opened; reads beyond
    /// this range get zeroed buffers.
    pages_on_disk: u32,

    root_page_num: AtomicU32,
}

impl Pager {
    /// Open the database file (read-write-create, never truncating) and
    /// recover the root page number from the is-root header flag.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SmallError> {
        let file = SmallFile::open(path)?;
        let file_length = file.size()?;
        let pages_on_disk = (file_length / PAGE_SIZE as u64) as u32;

        let mut root_page_num = 0;
        for page_num in 0..pages_on_disk {
            let flag: u8 = file
                .read_at(page_num as u64 * PAGE_SIZE as u64 + IS_ROOT_OFFSET)?;
            if flag == 1 {
                root_page_num = page_num;
                break;
            }
        }

        info!(
            "database file opened, pages on disk: {}, root: {}",
            pages_on_disk, root_page_num
        );

        let mut slots = Vec::with_capacity(MAX_NUM_OF_PAGES);
        slots.resize_with(MAX_NUM_OF_PAGES, || None);

        Ok(Self {
            file,
            slots: Mutex::new(slots),
            num_pages: AtomicU32::new(pages_on_disk),
            pages_on_disk,
            root_page_num: AtomicU32::new(root_page_num),
        })
    }

    /// Fetch the page with the given number, reading it from disk on a
    /// cache miss. A page number beyond the on-disk range extends the
    /// database logically and yields a zeroed buffer.
    pub fn get_page(&self, page_num: u32) -> Result<Pod<Page>, SmallError> {
        if page_num as usize >= MAX_NUM_OF_PAGES {
            return Err(SmallError::PagerFull(page_num));
        }

        let mut slots = self.slots.lock().unwrap();
        let slot = &mut slots[page_num as usize];
        if slot.is_none() {
            let mut page = Page::new();
            if page_num < self.pages_on_disk {
                debug!("read page {} from disk", page_num);
                self.file.read_exact_at(
                    page_num as u64 * PAGE_SIZE as u64,
                    page.bytes_mut(),
                )?;
            } else {
                debug!("allocate fresh page {}", page_num);
            }
            *slot = Some(Arc::new(RwLock::new(page)));

            if page_num >= self.num_pages.load(Ordering::SeqCst) {
                self.num_pages.store(page_num + 1, Ordering::SeqCst);
            }
        }

        Ok(Arc::clone(slot.as_ref().unwrap()))
    }

    /// Fetch the next unused page number along with its fresh buffer.
    pub fn allocate_page(&self) -> Result<(u32, Pod<Page>), SmallError> {
        let page_num = self.num_pages.load(Ordering::SeqCst);
        let page = self.get_page(page_num)?;
        Ok((page_num, page))
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages.load(Ordering::SeqCst)
    }

    pub fn root_page_num(&self) -> u32 {
        self.root_page_num.load(Ordering::SeqCst)
    }

    pub fn set_root_page(&self, page_num: u32) {
        debug!("root page moved to {}", page_num);
        self.root_page_num.store(page_num, Ordering::SeqCst);
    }

    /// Write one cached page back to the file.
    pub fn flush_page(&self, page_num: u32) -> SmallResult {
        let slots = self.slots.lock().unwrap();
        match &slots[page_num as usize] {
            Some(page_rc) => {
                let page = page_rc.rl();
                self.file.write_exact_at(
                    page_num as u64 * PAGE_SIZE as u64,
                    page.bytes(),
                )
            }
            None => Err(SmallError::Io(format!(
                "tried to flush page {} which is not cached",
                page_num
            ))),
        }
    }

    /// Flush every cached page and drop the cache. The file handle itself
    /// closes when the pager is dropped.
    pub fn close(&self) -> SmallResult {
        let mut slots = self.slots.lock().unwrap();
        for (page_num, slot) in slots.iter_mut().enumerate() {
            if let Some(page_rc) = slot.take() {
                let page = page_rc.rl();
                self.file.write_exact_at(
                    page_num as u64 * PAGE_SIZE as u64,
                    page.bytes(),
                )?;
            }
        }
        self.file.flush()?;
        info!("database file closed");
        Ok(())
    }
}
