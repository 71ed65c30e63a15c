//! Random-access byte sources backing a searcher.

use memmap2::Mmap;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Deref;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Error, Result};

/// Read `len` bytes at an absolute offset.
///
/// The lookup algorithm is written once against this trait and runs
/// unchanged over an open file or an in-memory buffer.
pub trait ByteSource {
    /// Read exactly `len` bytes starting at `offset`.
    fn read_at(&self, offset: u64, len: usize) -> Result<Cow<'_, [u8]>>;

    /// Total length of the source in bytes.
    fn size(&self) -> Result<u64>;

    /// Number of discrete reads issued against the backing medium.
    fn io_count(&self) -> u64 {
        0
    }
}

/// File handle source performing a seek followed by a read.
///
/// The handle is locked for the duration of each seek+read pair so the
/// source can be shared between threads. Each `read_at` counts as one I/O.
pub struct FileSource {
    file: Mutex<File>,
    io_count: AtomicU64,
}

impl FileSource {
    /// Open a file read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }

    pub fn new(file: File) -> Self {
        Self {
            file: Mutex::new(file),
            io_count: AtomicU64::new(0),
        }
    }
}

impl ByteSource for FileSource {
    fn read_at(&self, offset: u64, len: usize) -> Result<Cow<'_, [u8]>> {
        let mut buf = vec![0u8; len];
        {
            let mut file = self.file.lock();
            self.io_count.fetch_add(1, Ordering::Relaxed);
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf)?;
        }
        Ok(Cow::Owned(buf))
    }

    fn size(&self) -> Result<u64> {
        Ok(self.file.lock().metadata()?.len())
    }

    fn io_count(&self) -> u64 {
        self.io_count.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource")
            .field("io_count", &self.io_count())
            .finish()
    }
}

/// Slice view over an in-memory copy of the file. Never performs I/O.
#[derive(Debug, Clone, Copy)]
pub struct BufferSource<'a> {
    data: &'a [u8],
}

impl<'a> BufferSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl ByteSource for BufferSource<'_> {
    fn read_at(&self, offset: u64, len: usize) -> Result<Cow<'_, [u8]>> {
        let start = usize::try_from(offset).ok();
        let range = start.and_then(|s| Some(s..s.checked_add(len)?));
        match range {
            Some(r) if r.end <= self.data.len() => Ok(Cow::Borrowed(&self.data[r])),
            _ => Err(Error::Corruption(format!(
                "read of {} bytes at offset {} exceeds buffer of {} bytes",
                len,
                offset,
                self.data.len()
            ))),
        }
    }

    fn size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }
}

/// Entire xdb file contents, either read into memory or memory-mapped.
pub enum Content {
    /// Heap copy of the file.
    Owned(Vec<u8>),
    /// Read-only memory map of the file.
    Mapped(Mmap),
}

impl Content {
    /// Memory-map a file.
    pub fn map(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // Safety: the mapping is read-only; xdb files are not rewritten in place.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Content::Mapped(mmap))
    }

    pub fn source(&self) -> BufferSource<'_> {
        BufferSource::new(self)
    }
}

impl Deref for Content {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Content::Owned(data) => data.as_slice(),
            Content::Mapped(mmap) => &mmap[..],
        }
    }
}

impl From<Vec<u8>> for Content {
    fn from(data: Vec<u8>) -> Self {
        Content::Owned(data)
    }
}

impl std::fmt::Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Content::Owned(_) => "owned",
            Content::Mapped(_) => "mapped",
        };
        f.debug_struct("Content")
            .field("kind", &kind)
            .field("len", &self.len())
            .finish()
    }
}
