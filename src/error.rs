//! Error types for ipregion.

use thiserror::Error;

/// Error type for ipregion operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed textual IP address
    #[error("invalid IP address: {0}")]
    InvalidIp(String),

    /// Address width does not match the searcher's IP version
    #[error("invalid ip address width: {version} expects {expected} bytes, got {actual}")]
    IpWidthMismatch {
        version: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Source is shorter than the fixed header
    #[error("invalid header size: expected {expected}, got {actual}")]
    InvalidHeaderSize { expected: usize, actual: usize },

    /// Unknown xdb structure version
    #[error("unsupported xdb structure version: {0}")]
    UnsupportedVersion(u16),

    /// Unknown IP version tag in a structure 3 header
    #[error("unsupported ip version: {0}")]
    UnsupportedIpVersion(u16),

    /// Structural invariant violation found by verify
    #[error("xdb verify failed: {0}")]
    Verify(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file contents contradict the format invariants
    #[error("corrupted xdb: {0}")]
    Corruption(String),

    /// Unknown cache policy name
    #[error("invalid cache policy `{0}`, options: file/vectorIndex/content")]
    InvalidCachePolicy(String),

    /// Malformed ground-truth line
    #[error("invalid ip segment line `{0}`")]
    InvalidSegment(String),

    /// Lookup result differs from the ground truth
    #[error("failed search({ip}) with ({actual} != {expected})")]
    RegionMismatch {
        ip: String,
        expected: String,
        actual: String,
    },
}

/// Result type alias for ipregion operations.
pub type Result<T> = std::result::Result<T, Error>;
