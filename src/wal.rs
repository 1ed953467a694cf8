use std::{mem::size_of, path::Path, sync::Mutex};

use log::{debug, info};

use crate::{
    error::SmallError,
    io::{Decodeable, Encodeable, SmallFile, SmallWriter},
    types::SmallResult,
};

pub const WAL_HEADER_SIZE: usize = 4;
pub const WAL_RECORD_SIZE: usize = 16;

/// The kind of mutation a WAL record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Insert,
    Delete,
}

impl TransactionType {
    fn to_u32(self) -> u32 {
        match self {
            TransactionType::Insert => 0,
            TransactionType::Delete => 1,
        }
    }

    fn from_u32(v: u32) -> Result<Self, SmallError> {
        match v {
            0 => Ok(TransactionType::Insert),
            1 => Ok(TransactionType::Delete),
            _ => Err(SmallError::Io(format!(
                "unknown wal transaction type: {}",
                v
            ))),
        }
    }
}

/// One packed 16-byte log record. `size` is the byte size of the logged
/// value.
#[derive(Debug, Clone, PartialEq)]
pub struct WalRecord {
    pub size: u32,
    pub tx_type: TransactionType,
    pub tx_id: u32,
    pub value: u32,
}

impl WalRecord {
    fn new(tx_type: TransactionType, tx_id: u32, value: u32) -> Self {
        Self {
            size: size_of::<u32>() as u32,
            tx_type,
            tx_id,
            value,
        }
    }
}

impl Encodeable for WalRecord {
    fn encode(&self) -> Vec<u8> {
        let mut writer = SmallWriter::new();
        writer.write(&self.size);
        writer.write(&self.tx_type.to_u32());
        writer.write(&self.tx_id);
        writer.write(&self.value);
        writer.to_bytes()
    }
}

impl Decodeable for WalRecord {
    fn decode_from<R: std::io::Read>(reader: &mut R) -> Self {
        let size = u32::decode_from(reader);
        let tx_type = TransactionType::from_u32(u32::decode_from(reader))
            .expect("corrupted wal record");
        let tx_id = u32::decode_from(reader);
        let value = u32::decode_from(reader);
        Self {
            size,
            tx_type,
            tx_id,
            value,
        }
    }
}

struct WalInner {
    file: Option<SmallFile>,

    /// The highest transaction id handed out so far, seeded lazily from
    /// the last on-disk record.
    last_xid: Option<u32>,
}

/// The write-ahead log: a header holding the record count, followed by
/// packed records. One mutex covers both id allocation and appends, so
/// transaction ids are totally ordered with the log contents.
pub struct Wal {
    inner: Mutex<WalInner>,
}

impl Wal {
    /// Open the log file read-write-create. Existing records are kept, so
    /// transaction ids keep increasing across process lifetimes.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SmallError> {
        let file = SmallFile::open(path)?;
        info!("wal opened, existing size: {} bytes", file.size()?);
        Ok(Self {
            inner: Mutex::new(WalInner {
                file: Some(file),
                last_xid: None,
            }),
        })
    }

    /// Mint the next transaction id. The counter is seeded from the last
    /// record in the file on first use, then incremented in memory.
    pub fn next_xid(&self) -> Result<u32, SmallError> {
        let mut inner = self.inner.lock().unwrap();
        let file = inner.file.as_ref().ok_or(SmallError::WalNotInitialized)?;

        if inner.last_xid.is_none() {
            let size = file.size()?;
            let seed = if size < (WAL_HEADER_SIZE + WAL_RECORD_SIZE) as u64 {
                0
            } else {
                let num_of_records: u32 = file.read_at(0)?;
                if num_of_records == 0 {
                    0
                } else {
                    let offset = WAL_HEADER_SIZE as u64
                        + (num_of_records as u64 - 1) * WAL_RECORD_SIZE as u64;
                    let mut buf = [0u8; WAL_RECORD_SIZE];
                    file.read_exact_at(offset, &mut buf)?;
                    let record = WalRecord::decode_from(&mut &buf[..]);
                    record.tx_id
                }
            };
            debug!("wal xid counter seeded with {}", seed);
            inner.last_xid = Some(seed);
        }

        let xid = inner.last_xid.unwrap() + 1;
        inner.last_xid = Some(xid);
        Ok(xid)
    }

    /// Append one record and bump the header count. Callers must append
    /// before applying the corresponding tree mutation.
    pub fn append(
        &self,
        tx_type: TransactionType,
        tx_id: u32,
        value: u32,
    ) -> SmallResult {
        let inner = self.inner.lock().unwrap();
        let file = inner.file.as_ref().ok_or(SmallError::WalNotInitialized)?;

        let num_of_records: u32 = if file.size()? < WAL_HEADER_SIZE as u64 {
            0
        } else {
            file.read_at(0)?
        };

        let record = WalRecord::new(tx_type, tx_id, value);
        let offset = WAL_HEADER_SIZE as u64
            + num_of_records as u64 * WAL_RECORD_SIZE as u64;
        file.write_at(offset, &record)?;
        file.write_at(0, &(num_of_records + 1))?;

        debug!(
            "wal append, tx_id: {}, type: {:?}, value: {}, records: {}",
            tx_id,
            tx_type,
            value,
            num_of_records + 1
        );
        Ok(())
    }

    /// Number of records currently in the log.
    pub fn records_count(&self) -> Result<u32, SmallError> {
        let inner = self.inner.lock().unwrap();
        let file = inner.file.as_ref().ok_or(SmallError::WalNotInitialized)?;
        if file.size()? < WAL_HEADER_SIZE as u64 {
            return Ok(0);
        }
        file.read_at(0)
    }

    pub fn close(&self) -> SmallResult {
        let mut inner = self.inner.lock().unwrap();
        if inner.file.is_none() {
            return Err(SmallError::WalNotInitialized);
        }
        if let Some(file) = inner.file.take() {
            file.flush()?;
        }
        info!("wal closed");
        Ok(())
    }
}
