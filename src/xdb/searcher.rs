//! The xdb searcher: two-level lookup over a cache-policy specific backing.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use super::format::*;
use super::loader::{
    load_content_from_file, load_content_mapped, load_header, load_vector_index,
    version_from_header, verify,
};
use super::policy::{CachePolicy, SearcherConfig};
use super::source::{ByteSource, Content, FileSource};
use crate::ip::{ip_to_string, parse_ip};
use crate::{Error, Result};

/// Backing store of a searcher, one variant per cache policy.
enum Backing {
    File(FileSource),
    VectorIndex {
        source: FileSource,
        index: VectorIndex,
    },
    Content(Arc<Content>),
}

/// IP to region searcher over one xdb file.
///
/// Lookups take `&self` and a searcher is `Send + Sync` under every policy:
/// the file handle is locked around each seek+read, and the in-memory
/// caches are never mutated after construction. A file-backed searcher
/// shared between threads serializes its reads on that lock, so one
/// searcher per thread scales better.
///
/// # Example
///
/// ```ignore
/// use ipregion::{CachePolicy, Searcher, SearcherConfig};
/// use std::path::Path;
///
/// let config = SearcherConfig::with_policy(CachePolicy::VectorIndex);
/// let searcher = Searcher::open(Path::new("ip2region_v4.xdb"), &config)?;
///
/// let region = searcher.search_by_str("1.2.3.4")?;
/// println!("{} ({} reads)", region, searcher.io_count());
///
/// searcher.close();
/// ```
pub struct Searcher {
    version: IpVersion,
    backing: Backing,
}

impl Searcher {
    /// Searcher reading everything through a file handle.
    pub fn new_with_file_only(version: IpVersion, path: &Path) -> Result<Self> {
        Ok(Self {
            version,
            backing: Backing::File(FileSource::open(path)?),
        })
    }

    /// Searcher with the vector index cached in memory.
    pub fn new_with_vector_index(
        version: IpVersion,
        path: &Path,
        index: VectorIndex,
    ) -> Result<Self> {
        Ok(Self {
            version,
            backing: Backing::VectorIndex {
                source: FileSource::open(path)?,
                index,
            },
        })
    }

    /// Searcher over the whole file held in memory.
    pub fn new_with_buffer(version: IpVersion, content: impl Into<Arc<Content>>) -> Result<Self> {
        let content = content.into();
        let floor = HEADER_INFO_LENGTH + VECTOR_INDEX_LENGTH;
        if content.len() < floor {
            return Err(Error::InvalidHeaderSize {
                expected: floor,
                actual: content.len(),
            });
        }
        Ok(Self {
            version,
            backing: Backing::Content(content),
        })
    }

    /// Verify the file, detect its IP version and build a searcher with the
    /// configured cache policy.
    pub fn open(path: &Path, config: &SearcherConfig) -> Result<Self> {
        let source = FileSource::open(path)?;
        verify(&source)?;
        let header = load_header(&source)?;
        let version = version_from_header(&header)?;

        let searcher = match config.cache_policy {
            CachePolicy::File => Self::new_with_file_only(version, path)?,
            CachePolicy::VectorIndex => {
                let index = load_vector_index(&source)?;
                Self::new_with_vector_index(version, path, index)?
            }
            CachePolicy::Content => {
                let content = if config.mmap_content {
                    load_content_mapped(path)?
                } else {
                    load_content_from_file(path)?
                };
                Self::new_with_buffer(version, content)?
            }
        };

        log::info!(
            "opened {} xdb {:?} with cache policy {}",
            version,
            path,
            config.cache_policy
        );
        Ok(searcher)
    }

    /// Verify an in-memory xdb image and build a fully-buffered searcher.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let content = Content::from(data);
        let source = content.source();
        verify(&source)?;
        let version = version_from_header(&load_header(&source)?)?;
        Self::new_with_buffer(version, content)
    }

    /// Look up the region of a big-endian address of the searcher's width.
    pub fn search(&self, ip: &[u8]) -> Result<String> {
        if ip.len() != self.version.bytes() {
            return Err(Error::IpWidthMismatch {
                version: self.version.name(),
                expected: self.version.bytes(),
                actual: ip.len(),
            });
        }

        match &self.backing {
            Backing::File(source) => lookup(self.version, source, None, ip),
            Backing::VectorIndex { source, index } => {
                lookup(self.version, source, Some(index), ip)
            }
            Backing::Content(content) => lookup(self.version, &content.source(), None, ip),
        }
    }

    /// Parse a textual address and look up its region.
    pub fn search_by_str(&self, ip: &str) -> Result<String> {
        self.search(&parse_ip(ip)?)
    }

    /// Discrete reads issued against the file since construction.
    ///
    /// Always zero for a content-backed searcher.
    pub fn io_count(&self) -> u64 {
        match &self.backing {
            Backing::File(source) | Backing::VectorIndex { source, .. } => source.io_count(),
            Backing::Content(_) => 0,
        }
    }

    pub fn ip_version(&self) -> IpVersion {
        self.version
    }

    pub fn cache_policy(&self) -> CachePolicy {
        match self.backing {
            Backing::File(_) => CachePolicy::File,
            Backing::VectorIndex { .. } => CachePolicy::VectorIndex,
            Backing::Content(_) => CachePolicy::Content,
        }
    }

    /// Release the file handle or buffer.
    pub fn close(self) {
        log::debug!(
            "closing {} searcher ({}, {} reads)",
            self.version,
            self.cache_policy(),
            self.io_count()
        );
    }
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher")
            .field("version", &self.version)
            .field("cache_policy", &self.cache_policy())
            .field("io_count", &self.io_count())
            .finish()
    }
}

/// Bucket lookup followed by a binary search of the bucket's segments.
fn lookup<S: ByteSource + ?Sized>(
    version: IpVersion,
    source: &S,
    index: Option<&VectorIndex>,
    ip: &[u8],
) -> Result<String> {
    let (b0, b1) = (ip[0], ip[1]);
    let bucket = match index {
        Some(index) => index.entry(b0, b1),
        None => {
            let raw = source.read_at(vector_entry_offset(b0, b1), VECTOR_INDEX_SIZE)?;
            VectorEntry::parse(&raw)?
        }
    };
    if bucket.start_ptr == 0 {
        return Err(Error::Corruption(format!(
            "empty vector index bucket ({}, {}) for {}",
            b0,
            b1,
            ip_to_string(ip)
        )));
    }

    let segments = bucket.segments(version)?;
    let (mut lo, mut hi) = (0, segments.count());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let raw = source.read_at(segments.entry_offset(mid), segments.entry_size())?;
        let entry = SegmentEntry::parse(version, &raw)?;
        match entry.locate(ip) {
            Ordering::Less => hi = mid,
            Ordering::Greater => lo = mid + 1,
            Ordering::Equal => return read_region(source, entry.data_ptr(), entry.data_len()),
        }
    }

    Err(Error::Corruption(format!("no segment covers {}", ip_to_string(ip))))
}

fn read_region<S: ByteSource + ?Sized>(source: &S, ptr: u32, len: u16) -> Result<String> {
    if len == 0 {
        return Ok(String::new());
    }
    let raw = source.read_at(ptr as u64, len as usize)?;
    String::from_utf8(raw.into_owned())
        .map_err(|e| Error::Corruption(format!("region at {} is not utf-8: {}", ptr, e)))
}
