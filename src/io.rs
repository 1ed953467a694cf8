use std::{
    convert::TryInto,
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    mem::size_of,
    path::Path,
    sync::{Mutex, MutexGuard},
};

use crate::{error::SmallError, types::SmallResult};

/// A file handle with positioned, typed access.
///
/// Both the pager and the WAL address fixed offsets inside a single file,
/// so every call seeks to an absolute position under the internal mutex.
pub struct SmallFile {
    file: Mutex<File>,
}

impl SmallFile {
    /// Open read-write, creating the file when absent. The file is never
    /// truncated, existing contents survive a reopen.
    pub fn open<P: AsRef<Path>>(file_path: P) -> Result<Self, SmallError> {
        let file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .open(file_path)
            .map_err(SmallError::io)?;

        Ok(Self {
            file: Mutex::new(file),
        })
    }

    pub fn get_file(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap()
    }

    pub fn size(&self) -> Result<u64, SmallError> {
        let file = self.get_file();
        let metadata = file.metadata().map_err(SmallError::io)?;
        Ok(metadata.len())
    }

    pub fn read_at<T: Decodeable>(&self, offset: u64) -> Result<T, SmallError> {
        let mut buf = vec![0u8; size_of::<T>()];
        self.read_exact_at(offset, &mut buf)?;
        let mut reader = &buf[..];
        Ok(T::decode_from(&mut reader))
    }

    pub fn write_at<T: Encodeable>(&self, offset: u64, obj: &T) -> SmallResult {
        self.write_exact_at(offset, &obj.encode())
    }

    pub fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> SmallResult {
        let mut file = self.get_file();
        file.seek(SeekFrom::Start(offset)).map_err(SmallError::io)?;
        file.read_exact(buf).map_err(SmallError::io)?;
        Ok(())
    }

    pub fn write_exact_at(&self, offset: u64, buf: &[u8]) -> SmallResult {
        let mut file = self.get_file();
        file.seek(SeekFrom::Start(offset)).map_err(SmallError::io)?;
        file.write_all(buf).map_err(SmallError::io)?;
        Ok(())
    }

    pub fn flush(&self) -> SmallResult {
        self.get_file().flush().map_err(SmallError::io)
    }
}

pub fn read_exact<R: Read>(reader: &mut R, bytes_count: usize) -> Vec<u8> {
    let mut buffer = vec![0u8; bytes_count];
    reader
        .read_exact(&mut buffer)
        .expect(&format!("io error, expect {}", bytes_count));
    buffer
}

/// An append-only byte buffer for assembling fixed-layout records.
pub struct SmallWriter {
    buf: Vec<u8>,
}

impl SmallWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn write<T: Encodeable>(&mut self, obj: &T) {
        self.buf.extend_from_slice(obj.encode().as_slice());
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.buf
    }
}

pub trait Encodeable {
    fn encode(&self) -> Vec<u8>;
}

pub trait Decodeable {
    fn decode_from<R: Read>(reader: &mut R) -> Self;
}

/// # Format
///
/// - 1 byte (0 for false, 1 for true)
impl Encodeable for bool {
    fn encode(&self) -> Vec<u8> {
        vec![*self as u8]
    }
}

impl Decodeable for bool {
    fn decode_from<R: Read>(reader: &mut R) -> Self {
        u8::decode_from(reader) == 1
    }
}

macro_rules! impl_serialization {
    (for $($t:ty),+) => {
        $(
            impl Encodeable for $t {
                fn encode(&self) -> Vec<u8> {
                    self.to_le_bytes().to_vec()
                }
            }

            impl Decodeable for $t {
                fn decode_from<R: Read>(reader: &mut R) -> Self {
                    let bytes = read_exact(reader, size_of::<Self>());
                    Self::from_le_bytes(bytes.try_into().unwrap())
                }
            }
        )*
    }
}

impl_serialization!(for u8, u16, u32, u64);
