//! Cache policy selection for searchers.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// How much of the xdb file a searcher keeps in memory.
///
/// Fixed for the lifetime of a searcher; there is no eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CachePolicy {
    /// Nothing cached: vector entry, segment entries and region all read from disk
    File,
    /// Vector index table cached; segment entries and region read from disk
    #[default]
    VectorIndex,
    /// Whole file in memory; no disk reads after construction
    Content,
}

impl CachePolicy {
    /// Get the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CachePolicy::File => "file",
            CachePolicy::VectorIndex => "vectorIndex",
            CachePolicy::Content => "content",
        }
    }
}

impl FromStr for CachePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "file" | "nil" => Ok(CachePolicy::File),
            "vectorIndex" | "vector-index" | "vector_index" => Ok(CachePolicy::VectorIndex),
            "content" => Ok(CachePolicy::Content),
            other => Err(Error::InvalidCachePolicy(other.to_string())),
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for [`Searcher::open`](super::Searcher::open).
#[derive(Debug, Clone, Default)]
pub struct SearcherConfig {
    /// Cache policy for the searcher.
    pub cache_policy: CachePolicy,
    /// Memory-map the file instead of reading it when the policy is `Content`.
    pub mmap_content: bool,
}

impl SearcherConfig {
    /// Create a configuration with the specified cache policy.
    pub fn with_policy(cache_policy: CachePolicy) -> Self {
        Self {
            cache_policy,
            mmap_content: false,
        }
    }

    /// Memory-map content instead of copying it onto the heap.
    pub fn mmap(mut self) -> Self {
        self.mmap_content = true;
        self
    }
}
