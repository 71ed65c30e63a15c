//! xdb binary index format and searcher.
//!
//! The file is a fixed header, a fixed-size vector index keyed by the first
//! two address bytes, the region payloads, and a sorted segment index.
//!
//! # File Structure
//!
//! ```text
//! +------------------+
//! |     HEADER       |  256 bytes (fixed)
//! +------------------+
//! |   VECTOR INDEX   |  256 * 256 * 8 bytes (fixed)
//! +------------------+
//! |  REGION PAYLOAD  |  variable
//! +------------------+
//! |  SEGMENT INDEX   |  variable, 14 (IPv4) or 38 (IPv6) bytes per entry
//! +------------------+
//! ```
//!
//! A lookup reads the vector entry for the address bucket, binary searches
//! the bucket's segment entries, then reads the matching region payload.

mod format;
mod loader;
mod policy;
mod searcher;
mod source;

pub use format::*;
pub use loader::{
    load_content, load_content_from_file, load_content_mapped, load_header,
    load_header_from_file, load_vector_index, load_vector_index_from_file, verify,
    version_from_header,
};
pub use policy::{CachePolicy, SearcherConfig};
pub use searcher::Searcher;
pub use source::{BufferSource, ByteSource, Content, FileSource};
