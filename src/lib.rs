//! ipregion - offline IP to region lookup over the xdb binary index format.
//!
//! This crate answers "which region does this IP belong to" from a compact,
//! pre-built xdb file without any network round trip. It is read-only: xdb
//! files are produced by an external builder.
//!
//! # Features
//!
//! - **IPv4 and IPv6**: one search algorithm over 4- and 16-byte addresses
//! - **Two-level index**: a fixed vector index narrows a binary search of the
//!   sorted segment index
//! - **Cache policies**: file-only, vector-index cached, or fully buffered
//!   (optionally memory-mapped)
//! - **Thread-safe**: searchers are `Send + Sync` under every policy
//! - **I/O accounting**: each searcher counts the reads it issues
//!
//! # Quick Start
//!
//! ```ignore
//! use ipregion::{CachePolicy, Searcher, SearcherConfig};
//! use std::path::Path;
//!
//! // Verify the file, detect IPv4/IPv6 and cache the vector index
//! let config = SearcherConfig::with_policy(CachePolicy::VectorIndex);
//! let searcher = Searcher::open(Path::new("ip2region_v4.xdb"), &config)?;
//!
//! let region = searcher.search_by_str("1.2.3.4")?;
//! println!("{} ({} reads)", region, searcher.io_count());
//! ```
//!
//! # Cache Policies
//!
//! - **file**: nothing cached, typically 3+ reads per lookup
//! - **vectorIndex**: the 512 KiB vector index is cached, one read fewer
//! - **content**: the whole file is in memory, zero reads per lookup

mod error;

pub mod bench;
pub mod ip;
pub mod xdb;

// Re-export core types
pub use error::{Error, Result};
pub use ip::{ip_compare, ip_to_string, parse_ip};

// Re-export searcher types
pub use xdb::{
    load_header, verify, version_from_header, CachePolicy, Content, IpVersion, Searcher,
    SearcherConfig,
};
