//! Ground-truth validation of a searcher.
//!
//! The source text holds one segment per line: `start_ip|end_ip|region`.
//! Both boundary addresses of every line are looked up and the result must
//! equal the expected region byte for byte.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::io::BufRead;
use std::time::{Duration, Instant};

use crate::ip::{ip_compare, ip_to_string, parse_ip};
use crate::{Error, Result, Searcher};

/// One parsed ground-truth line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLine {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
    pub region: String,
}

/// Parse a `start|end|region` line. The region may itself contain `|`.
pub fn parse_line(line: &str) -> Result<SegmentLine> {
    let line = line.trim();
    let parts: Vec<&str> = line.splitn(3, '|').collect();
    if parts.len() != 3 {
        return Err(Error::InvalidSegment(line.to_string()));
    }

    let start = parse_ip(parts[0])?;
    let end = parse_ip(parts[1])?;
    if start.len() != end.len() || ip_compare(&start, &end) == Ordering::Greater {
        return Err(Error::InvalidSegment(format!(
            "start ip({}) should not be greater than end ip({})",
            parts[0], parts[1]
        )));
    }

    Ok(SegmentLine {
        start,
        end,
        region: parts[2].to_string(),
    })
}

/// Summary of a bench run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    /// Cache policy of the searcher under test
    pub cache_policy: String,
    /// Number of lookups performed
    pub total: u64,
    /// Wall time of the whole run, including parsing
    pub took: Duration,
    /// Time spent inside lookups
    pub search_time: Duration,
    /// Reads issued against the file during the run
    pub io_count: u64,
}

impl BenchReport {
    /// Mean lookup cost in microseconds.
    pub fn cost_us_per_op(&self) -> u64 {
        if self.total == 0 {
            return 0;
        }
        (self.search_time.as_nanos() / self.total as u128 / 1000) as u64
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bench finished, {{cachePolicy: {}, total: {}, took: {:?}, ioCount: {}, cost: {} μs/op}}",
            self.cache_policy,
            self.total,
            self.took,
            self.io_count,
            self.cost_us_per_op()
        )
    }
}

/// Check every line of `reader` against `searcher`, stopping at the first
/// malformed line or mismatching region.
pub fn run<R: BufRead>(searcher: &Searcher, reader: R) -> Result<BenchReport> {
    let started = Instant::now();
    let io_before = searcher.io_count();
    let mut total = 0u64;
    let mut search_time = Duration::ZERO;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let segment = parse_line(&line)?;
        for ip in [&segment.start, &segment.end] {
            let t = Instant::now();
            let region = searcher.search(ip)?;
            search_time += t.elapsed();

            if region != segment.region {
                return Err(Error::RegionMismatch {
                    ip: ip_to_string(ip),
                    expected: segment.region,
                    actual: region,
                });
            }
            total += 1;
        }
    }

    let report = BenchReport {
        cache_policy: searcher.cache_policy().to_string(),
        total,
        took: started.elapsed(),
        search_time,
        io_count: searcher.io_count() - io_before,
    };
    log::debug!("{}", report);
    Ok(report)
}
