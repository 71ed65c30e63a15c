//! Header loading, structural verification and cache pre-loading.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use super::format::*;
use super::source::{ByteSource, Content, FileSource};
use crate::ip::ip_compare;
use crate::{Error, Result};

/// Maximum number of adjacent entry pairs inspected by [`verify`].
const VERIFY_SAMPLE_PAIRS: usize = 1024;

/// Read and decode the fixed header.
pub fn load_header<S: ByteSource + ?Sized>(source: &S) -> Result<Header> {
    let size = source.size()?;
    if size < HEADER_INFO_LENGTH as u64 {
        return Err(Error::InvalidHeaderSize {
            expected: HEADER_INFO_LENGTH,
            actual: size as usize,
        });
    }
    let buf = source.read_at(0, HEADER_INFO_LENGTH)?;
    Header::parse(&buf)
}

/// Read the header of the file at `path`.
pub fn load_header_from_file(path: &Path) -> Result<Header> {
    load_header(&FileSource::open(path)?)
}

/// Detect the address family recorded in a header.
pub fn version_from_header(header: &Header) -> Result<IpVersion> {
    match header.version {
        // legacy structure only ever held IPv4
        STRUCTURE_20 => Ok(IpVersion::V4),
        STRUCTURE_30 => IpVersion::from_id(header.ip_version)
            .ok_or(Error::UnsupportedIpVersion(header.ip_version)),
        other => Err(Error::UnsupportedVersion(other)),
    }
}

fn verify_error(msg: String) -> Error {
    log::warn!("xdb verify rejected file: {}", msg);
    Error::Verify(msg)
}

/// Structural soundness pass over an xdb source.
///
/// Checks that the segment index range fits the source, that its length is a
/// whole number of entries, samples entries for ordering, coverage and
/// payload bounds, and checks every vector index bucket against the segment
/// index. This reads a fair amount of the file: run it once per
/// opened file, not per query or per searcher.
pub fn verify<S: ByteSource + ?Sized>(source: &S) -> Result<()> {
    let header = match load_header(source) {
        Ok(h) => h,
        Err(Error::InvalidHeaderSize { expected, actual }) => {
            return Err(verify_error(format!(
                "source of {} bytes is shorter than the {} byte header",
                actual, expected
            )))
        }
        Err(e) => return Err(e),
    };

    let ptr_bytes = match header.ptr_bytes() {
        Ok(b) => b,
        Err(_) => return Err(verify_error(format!("invalid version {}", header.version))),
    };
    let version = version_from_header(&header)?;
    let size = source.size()?;

    if ptr_bytes < 8 {
        let max_file_ptr = (1u64 << (ptr_bytes as u32 * 8)) - 1;
        if size > max_file_ptr {
            return Err(verify_error(format!(
                "xdb file exceeds the maximum supported bytes: {}",
                max_file_ptr
            )));
        }
    }

    let index_floor = (HEADER_INFO_LENGTH + VECTOR_INDEX_LENGTH) as u64;
    if size < index_floor {
        return Err(verify_error(format!(
            "source of {} bytes cannot hold the vector index ending at {}",
            size, index_floor
        )));
    }

    let start = header.start_index_ptr as u64;
    let end = header.end_index_ptr as u64;
    let entry_size = version.segment_index_size() as u64;
    if start > end {
        return Err(verify_error(format!(
            "segment index start {} is after end {}",
            start, end
        )));
    }
    if start < index_floor {
        return Err(verify_error(format!(
            "segment index start {} overlaps the vector index",
            start
        )));
    }
    if end + entry_size > size {
        return Err(verify_error(format!(
            "segment index ends at {} beyond source length {}",
            end + entry_size,
            size
        )));
    }
    if (end - start) % entry_size != 0 {
        return Err(verify_error(format!(
            "segment index length {} is not a multiple of entry size {}",
            end - start,
            entry_size
        )));
    }

    let segments = header.segments(version)?;
    verify_entries(source, version, &segments, size)?;
    verify_vector_index(source, version, &segments)?;

    log::debug!(
        "verified {} xdb: {} segments, {} bytes",
        version,
        segments.count(),
        size
    );
    Ok(())
}

fn verify_entries<S: ByteSource + ?Sized>(
    source: &S,
    version: IpVersion,
    segments: &SegmentSlice,
    size: u64,
) -> Result<()> {
    let count = segments.count();
    let entry_size = segments.entry_size();
    let width = version.bytes();

    let check_entry = |idx: usize, raw: &[u8]| -> Result<()> {
        let entry = SegmentEntry::parse(version, raw)?;
        if ip_compare(entry.start_ip().as_slice(), entry.end_ip().as_slice()) == Ordering::Greater
        {
            return Err(verify_error(format!(
                "segment {} starts at {:?} after its end {:?}",
                idx,
                entry.start_ip(),
                entry.end_ip()
            )));
        }
        let data_end = entry.data_ptr() as u64 + entry.data_len() as u64;
        if data_end > size {
            return Err(verify_error(format!(
                "segment {} region payload ends at {} beyond source length {}",
                idx, data_end, size
            )));
        }
        Ok(())
    };

    // coverage starts at the all-zero address and ends at the all-ones address
    let first = source.read_at(segments.entry_offset(0), entry_size)?;
    check_entry(0, &first[..])?;
    if SegmentEntry::parse(version, &first)?.start_ip().as_slice() != vec![0u8; width].as_slice() {
        return Err(verify_error("first segment does not start at the zero address".into()));
    }

    let last = source.read_at(segments.entry_offset(count - 1), entry_size)?;
    check_entry(count - 1, &last[..])?;
    if SegmentEntry::parse(version, &last)?.end_ip().as_slice() != vec![0xffu8; width].as_slice()
    {
        return Err(verify_error("last segment does not end at the maximum address".into()));
    }

    if count < 2 {
        return Ok(());
    }

    let pairs = count - 1;
    let step = pairs.div_ceil(VERIFY_SAMPLE_PAIRS).max(1);
    let mut idx = 0;
    while idx < pairs {
        let raw = source.read_at(segments.entry_offset(idx), entry_size * 2)?;
        let (cur_raw, next_raw) = raw.split_at(entry_size);
        check_entry(idx, cur_raw)?;
        check_entry(idx + 1, next_raw)?;

        let cur = SegmentEntry::parse(version, cur_raw)?;
        let next = SegmentEntry::parse(version, next_raw)?;
        if ip_compare(cur.end_ip().as_slice(), next.start_ip().as_slice()) != Ordering::Less {
            return Err(verify_error(format!(
                "segments {} and {} overlap or are out of order ({:?} >= {:?})",
                idx,
                idx + 1,
                cur.end_ip(),
                next.start_ip()
            )));
        }
        idx += step;
    }

    Ok(())
}

/// Every bucket must name a non-empty, entry-aligned sub-range of the segment
/// index, otherwise lookups landing in it cannot succeed.
fn verify_vector_index<S: ByteSource + ?Sized>(
    source: &S,
    version: IpVersion,
    segments: &SegmentSlice,
) -> Result<()> {
    let index = load_vector_index(source)?;
    for b0 in 0..=u8::MAX {
        for b1 in 0..=u8::MAX {
            let bucket = index.entry(b0, b1);
            if bucket.start_ptr == 0 {
                return Err(verify_error(format!(
                    "vector index bucket ({}, {}) is empty",
                    b0, b1
                )));
            }
            let slice = bucket.segments(version).map_err(|e| {
                verify_error(format!("vector index bucket ({}, {}): {}", b0, b1, e))
            })?;
            if !segments.covers(&slice) {
                return Err(verify_error(format!(
                    "vector index bucket ({}, {}) range {}..={} is outside the segment index",
                    b0, b1, bucket.start_ptr, bucket.end_ptr
                )));
            }
        }
    }
    Ok(())
}

/// Read the vector index table from a source.
pub fn load_vector_index<S: ByteSource + ?Sized>(source: &S) -> Result<VectorIndex> {
    let buf = source.read_at(HEADER_INFO_LENGTH as u64, VECTOR_INDEX_LENGTH)?;
    VectorIndex::from_bytes(buf.into_owned())
}

/// Read the vector index table from the file at `path`.
pub fn load_vector_index_from_file(path: &Path) -> Result<VectorIndex> {
    let index = load_vector_index(&FileSource::open(path)?)?;
    log::debug!("loaded vector index from {:?}", path);
    Ok(index)
}

/// Read an entire source into memory.
pub fn load_content<S: ByteSource + ?Sized>(source: &S) -> Result<Content> {
    let size = source.size()?;
    let len = usize::try_from(size)
        .map_err(|_| Error::Corruption(format!("source of {} bytes does not fit in memory", size)))?;
    let buf = source.read_at(0, len)?;
    Ok(Content::Owned(buf.into_owned()))
}

/// Read the whole file at `path` into memory.
pub fn load_content_from_file(path: &Path) -> Result<Content> {
    let data = fs::read(path)?;
    log::debug!("loaded {} bytes of xdb content from {:?}", data.len(), path);
    Ok(Content::Owned(data))
}

/// Memory-map the file at `path` instead of copying it.
pub fn load_content_mapped(path: &Path) -> Result<Content> {
    let content = Content::map(path)?;
    log::debug!("mapped {} bytes of xdb content from {:?}", content.len(), path);
    Ok(content)
}
