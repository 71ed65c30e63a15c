//! xdb format constants and fixed-size record accessors.
//!
//! Every integer in the file is little-endian. Offsets in this module are
//! absolute file positions; the searcher only sees logical entry indices.

use std::cmp::Ordering;
use std::fmt;

use crate::ip::{ip_compare, IPV4_BYTES, IPV6_BYTES};
use crate::{Error, Result};

/// Header size in bytes.
pub const HEADER_INFO_LENGTH: usize = 256;

/// Vector index rows (first address byte).
pub const VECTOR_INDEX_ROWS: usize = 256;

/// Vector index columns (second address byte).
pub const VECTOR_INDEX_COLS: usize = 256;

/// Size of one vector index entry: start ptr (u32) + end ptr (u32).
pub const VECTOR_INDEX_SIZE: usize = 8;

/// Total size of the vector index table.
pub const VECTOR_INDEX_LENGTH: usize = VECTOR_INDEX_ROWS * VECTOR_INDEX_COLS * VECTOR_INDEX_SIZE;

/// Legacy structure, IPv4 only.
pub const STRUCTURE_20: u16 = 2;

/// Current structure with the IP version recorded in the header.
pub const STRUCTURE_30: u16 = 3;

/// Header ip version tag for IPv4 databases.
pub const IPV4_VERSION_NO: u16 = 4;

/// Header ip version tag for IPv6 databases.
pub const IPV6_VERSION_NO: u16 = 6;

/// Pointer width used by structure 2 files.
pub const DEFAULT_RUNTIME_PTR_BYTES: u16 = 4;

/// Index policy tag written by builders using the vector index.
pub const INDEX_POLICY_VECTOR: u16 = 1;

fn le_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn le_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Address family of an xdb file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    /// 4-byte addresses, 14-byte segment entries
    V4,
    /// 16-byte addresses, 38-byte segment entries
    V6,
}

impl IpVersion {
    /// Map a header ip version tag.
    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            IPV4_VERSION_NO => Some(IpVersion::V4),
            IPV6_VERSION_NO => Some(IpVersion::V6),
            _ => None,
        }
    }

    /// Header ip version tag.
    pub fn id(self) -> u16 {
        match self {
            IpVersion::V4 => IPV4_VERSION_NO,
            IpVersion::V6 => IPV6_VERSION_NO,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IpVersion::V4 => "IPv4",
            IpVersion::V6 => "IPv6",
        }
    }

    /// Address width in bytes.
    pub fn bytes(self) -> usize {
        match self {
            IpVersion::V4 => IPV4_BYTES,
            IpVersion::V6 => IPV6_BYTES,
        }
    }

    /// Segment entry size: start ip + end ip + data len (u16) + data ptr (u32).
    pub fn segment_index_size(self) -> usize {
        self.bytes() * 2 + 2 + 4
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// xdb file header (256 bytes on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Structure version (2 or 3)
    pub version: u16,
    /// Index policy tag
    pub index_policy: u16,
    /// Unix timestamp when the file was built
    pub created_at: u32,
    /// Offset of the first segment entry
    pub start_index_ptr: u32,
    /// Offset of the last segment entry (inclusive)
    pub end_index_ptr: u32,
    /// IP version tag (structure 3 only)
    pub ip_version: u16,
    /// Width of file pointers in bytes (structure 3 only)
    pub runtime_ptr_bytes: u16,
}

impl Header {
    /// Decode a header from the start of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_INFO_LENGTH {
            return Err(Error::InvalidHeaderSize {
                expected: HEADER_INFO_LENGTH,
                actual: buf.len(),
            });
        }

        Ok(Self {
            version: le_u16(buf, 0),
            index_policy: le_u16(buf, 2),
            created_at: le_u32(buf, 4),
            start_index_ptr: le_u32(buf, 8),
            end_index_ptr: le_u32(buf, 12),
            ip_version: le_u16(buf, 16),
            runtime_ptr_bytes: le_u16(buf, 18),
        })
    }

    /// Pointer width in bytes for this structure version.
    pub fn ptr_bytes(&self) -> Result<u16> {
        match self.version {
            STRUCTURE_20 => Ok(DEFAULT_RUNTIME_PTR_BYTES),
            STRUCTURE_30 => Ok(self.runtime_ptr_bytes),
            other => Err(Error::UnsupportedVersion(other)),
        }
    }

    /// Segment entries described by the header.
    pub fn segments(&self, version: IpVersion) -> Result<SegmentSlice> {
        SegmentSlice::new(self.start_index_ptr, self.end_index_ptr, version)
    }
}

/// Absolute offset of the vector index entry for the bucket `(b0, b1)`.
pub fn vector_entry_offset(b0: u8, b1: u8) -> u64 {
    let idx = b0 as usize * VECTOR_INDEX_COLS + b1 as usize;
    (HEADER_INFO_LENGTH + idx * VECTOR_INDEX_SIZE) as u64
}

/// One vector index entry: the inclusive segment entry range of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorEntry {
    pub start_ptr: u32,
    pub end_ptr: u32,
}

impl VectorEntry {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < VECTOR_INDEX_SIZE {
            return Err(Error::Corruption(format!(
                "short vector index entry: {} bytes",
                buf.len()
            )));
        }
        Ok(Self {
            start_ptr: le_u32(buf, 0),
            end_ptr: le_u32(buf, 4),
        })
    }

    pub fn segments(&self, version: IpVersion) -> Result<SegmentSlice> {
        SegmentSlice::new(self.start_ptr, self.end_ptr, version)
    }
}

/// The whole vector index table held in memory.
pub struct VectorIndex {
    data: Box<[u8]>,
}

impl VectorIndex {
    /// Wrap a raw vector index table.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() != VECTOR_INDEX_LENGTH {
            return Err(Error::Corruption(format!(
                "vector index must be {} bytes, got {}",
                VECTOR_INDEX_LENGTH,
                data.len()
            )));
        }
        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    /// Entry for the bucket `(b0, b1)`.
    pub fn entry(&self, b0: u8, b1: u8) -> VectorEntry {
        let offset = (b0 as usize * VECTOR_INDEX_COLS + b1 as usize) * VECTOR_INDEX_SIZE;
        VectorEntry {
            start_ptr: le_u32(&self.data, offset),
            end_ptr: le_u32(&self.data, offset + 4),
        }
    }
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("len", &self.data.len())
            .finish()
    }
}

/// A contiguous run of fixed-size segment entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentSlice {
    first_ptr: u64,
    count: usize,
    entry_size: usize,
}

impl SegmentSlice {
    /// Build from inclusive first/last entry pointers.
    pub fn new(first_ptr: u32, last_ptr: u32, version: IpVersion) -> Result<Self> {
        let entry_size = version.segment_index_size();
        if last_ptr < first_ptr {
            return Err(Error::Corruption(format!(
                "segment range end {} before start {}",
                last_ptr, first_ptr
            )));
        }
        let span = (last_ptr - first_ptr) as usize;
        if span % entry_size != 0 {
            return Err(Error::Corruption(format!(
                "segment range length {} is not a multiple of {}",
                span, entry_size
            )));
        }
        Ok(Self {
            first_ptr: first_ptr as u64,
            count: span / entry_size + 1,
            entry_size,
        })
    }

    /// Number of entries in the slice, never zero.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn entry_size(&self) -> usize {
        self.entry_size
    }

    /// Absolute offset of the `idx`-th entry.
    pub fn entry_offset(&self, idx: usize) -> u64 {
        self.first_ptr + (idx * self.entry_size) as u64
    }

    /// Absolute offset one past the last entry.
    pub fn end_offset(&self) -> u64 {
        self.entry_offset(self.count)
    }

    /// Whether `inner` is an entry-aligned sub-range of this slice.
    pub fn covers(&self, inner: &SegmentSlice) -> bool {
        inner.entry_size == self.entry_size
            && inner.first_ptr >= self.first_ptr
            && inner.end_offset() <= self.end_offset()
            && (inner.first_ptr - self.first_ptr) % self.entry_size as u64 == 0
    }
}

/// A stored address normalised to big-endian bytes.
#[derive(Clone, Copy)]
pub struct StoredIp {
    buf: [u8; IPV6_BYTES],
    len: usize,
}

impl StoredIp {
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl fmt::Debug for StoredIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::ip::ip_to_string(self.as_slice()))
    }
}

/// A borrowed segment index entry.
#[derive(Debug, Clone, Copy)]
pub struct SegmentEntry<'a> {
    version: IpVersion,
    raw: &'a [u8],
}

impl<'a> SegmentEntry<'a> {
    pub fn parse(version: IpVersion, raw: &'a [u8]) -> Result<Self> {
        if raw.len() < version.segment_index_size() {
            return Err(Error::Corruption(format!(
                "short segment entry: {} bytes, expected {}",
                raw.len(),
                version.segment_index_size()
            )));
        }
        Ok(Self { version, raw })
    }

    fn ip_at(&self, offset: usize) -> StoredIp {
        let width = self.version.bytes();
        let mut buf = [0u8; IPV6_BYTES];
        buf[..width].copy_from_slice(&self.raw[offset..offset + width]);
        // IPv4 addresses are stored as little-endian u32
        if self.version == IpVersion::V4 {
            buf[..width].reverse();
        }
        StoredIp { buf, len: width }
    }

    /// First address covered (inclusive).
    pub fn start_ip(&self) -> StoredIp {
        self.ip_at(0)
    }

    /// Last address covered (inclusive).
    pub fn end_ip(&self) -> StoredIp {
        self.ip_at(self.version.bytes())
    }

    pub fn data_len(&self) -> u16 {
        le_u16(self.raw, self.version.bytes() * 2)
    }

    pub fn data_ptr(&self) -> u32 {
        le_u32(self.raw, self.version.bytes() * 2 + 2)
    }

    /// Position of `ip` relative to this segment: `Less` below it,
    /// `Greater` above it, `Equal` when covered.
    pub fn locate(&self, ip: &[u8]) -> Ordering {
        if ip_compare(ip, self.start_ip().as_slice()) == Ordering::Less {
            Ordering::Less
        } else if ip_compare(ip, self.end_ip().as_slice()) == Ordering::Greater {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}
