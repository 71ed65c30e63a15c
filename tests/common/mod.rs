//! Test-only xdb writer and fixtures.
//!
//! The crate itself never writes xdb files; this reference writer produces
//! small databases with the same layout a real builder emits.

#![allow(dead_code)]

use ipregion::ip::parse_ip;
use ipregion::xdb::{
    IpVersion, HEADER_INFO_LENGTH, INDEX_POLICY_VECTOR, STRUCTURE_20, STRUCTURE_30,
    VECTOR_INDEX_COLS, VECTOR_INDEX_LENGTH, VECTOR_INDEX_ROWS, VECTOR_INDEX_SIZE,
};
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

/// One `[start, end] -> region` segment in big-endian address bytes.
#[derive(Debug, Clone)]
pub struct Segment {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
    pub region: String,
}

/// Builds xdb images from a sorted, gap-free list of segments.
#[derive(Debug, Clone)]
pub struct XdbBuilder {
    version: IpVersion,
    structure: u16,
    segments: Vec<Segment>,
}

impl XdbBuilder {
    pub fn new(version: IpVersion) -> Self {
        Self {
            version,
            structure: STRUCTURE_30,
            segments: Vec::new(),
        }
    }

    /// Write the legacy structure 2 header (IPv4 only).
    pub fn legacy(mut self) -> Self {
        self.structure = STRUCTURE_20;
        self
    }

    pub fn segment(mut self, start: &str, end: &str, region: &str) -> Self {
        self.segments.push(Segment {
            start: parse_ip(start).unwrap(),
            end: parse_ip(end).unwrap(),
            region: region.to_string(),
        });
        self
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn version(&self) -> IpVersion {
        self.version
    }

    fn encode_ip(&self, ip: &[u8], out: &mut Vec<u8>) {
        match self.version {
            IpVersion::V4 => {
                let v = u32::from_be_bytes([ip[0], ip[1], ip[2], ip[3]]);
                out.extend_from_slice(&v.to_le_bytes());
            }
            IpVersion::V6 => out.extend_from_slice(ip),
        }
    }

    /// Serialize header, vector index, region payloads and segment index.
    pub fn build(&self) -> Vec<u8> {
        assert!(!self.segments.is_empty(), "an xdb needs at least one segment");

        let mut data = vec![0u8; HEADER_INFO_LENGTH + VECTOR_INDEX_LENGTH];

        // region payloads, deduplicated
        let mut region_ptrs: Vec<(u32, u16)> = Vec::with_capacity(self.segments.len());
        let mut seen: HashMap<&str, (u32, u16)> = HashMap::new();
        for seg in &self.segments {
            let loc = match seen.get(seg.region.as_str()) {
                Some(loc) => *loc,
                None => {
                    let loc = (data.len() as u32, seg.region.len() as u16);
                    data.extend_from_slice(seg.region.as_bytes());
                    seen.insert(&seg.region, loc);
                    loc
                }
            };
            region_ptrs.push(loc);
        }

        // segment index
        let entry_size = self.version.segment_index_size();
        let start_ptr = data.len() as u32;
        for (seg, (ptr, len)) in self.segments.iter().zip(&region_ptrs) {
            self.encode_ip(&seg.start, &mut data);
            self.encode_ip(&seg.end, &mut data);
            data.extend_from_slice(&len.to_le_bytes());
            data.extend_from_slice(&ptr.to_le_bytes());
        }
        let end_ptr = start_ptr + ((self.segments.len() - 1) * entry_size) as u32;

        // vector index: every segment overlapping the bucket's address range
        let width = self.version.bytes();
        for b0 in 0..VECTOR_INDEX_ROWS {
            for b1 in 0..VECTOR_INDEX_COLS {
                let mut lo = vec![0u8; width];
                lo[0] = b0 as u8;
                lo[1] = b1 as u8;
                let mut hi = vec![0xffu8; width];
                hi[0] = b0 as u8;
                hi[1] = b1 as u8;

                let first = self.segments.partition_point(|s| s.end < lo);
                let last = self.segments.partition_point(|s| s.start <= hi) - 1;

                let s_ptr = start_ptr + (first * entry_size) as u32;
                let e_ptr = start_ptr + (last * entry_size) as u32;
                let offset = HEADER_INFO_LENGTH + (b0 * VECTOR_INDEX_COLS + b1) * VECTOR_INDEX_SIZE;
                data[offset..offset + 4].copy_from_slice(&s_ptr.to_le_bytes());
                data[offset + 4..offset + 8].copy_from_slice(&e_ptr.to_le_bytes());
            }
        }

        // header
        data[0..2].copy_from_slice(&self.structure.to_le_bytes());
        data[2..4].copy_from_slice(&INDEX_POLICY_VECTOR.to_le_bytes());
        data[4..8].copy_from_slice(&1_700_000_000u32.to_le_bytes());
        data[8..12].copy_from_slice(&start_ptr.to_le_bytes());
        data[12..16].copy_from_slice(&end_ptr.to_le_bytes());
        if self.structure == STRUCTURE_30 {
            data[16..18].copy_from_slice(&self.version.id().to_le_bytes());
            data[18..20].copy_from_slice(&4u16.to_le_bytes());
        }

        data
    }

    /// Write the image to a temp file kept alive by the returned handle.
    pub fn write_temp(&self) -> NamedTempFile {
        write_temp(&self.build())
    }

    /// Ground-truth text in `start|end|region` form.
    pub fn ground_truth(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            out.push_str(&format!(
                "{}|{}|{}\n",
                ipregion::ip_to_string(&seg.start),
                ipregion::ip_to_string(&seg.end),
                seg.region
            ));
        }
        out
    }
}

pub fn write_temp(data: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(data).unwrap();
    file.flush().unwrap();
    file
}

/// `0.0.0.0-0.0.0.255 -> A`, `0.0.1.0-255.255.255.255 -> B`.
pub fn two_segment_v4() -> XdbBuilder {
    XdbBuilder::new(IpVersion::V4)
        .segment("0.0.0.0", "0.0.0.255", "A")
        .segment("0.0.1.0", "255.255.255.255", "B")
}

pub fn to_u128(ip: &[u8]) -> u128 {
    ip.iter().fold(0u128, |acc, b| (acc << 8) | *b as u128)
}

pub fn from_u128(value: u128, width: usize) -> Vec<u8> {
    value.to_be_bytes()[16 - width..].to_vec()
}

/// Midpoint of an inclusive address range.
pub fn midpoint(start: &[u8], end: &[u8]) -> Vec<u8> {
    let (s, e) = (to_u128(start), to_u128(end));
    from_u128(s + (e - s) / 2, start.len())
}

/// Deterministic database with `count` segments covering the whole space.
///
/// Cut points are spread pseudo-randomly so segments vary from a handful of
/// addresses to spans crossing many vector index buckets.
pub fn synthetic(version: IpVersion, count: usize, seed: u64) -> XdbBuilder {
    let width = version.bytes();
    let max = if width == 16 {
        u128::MAX
    } else {
        (1u128 << (width * 8)) - 1
    };

    let mut state = seed;
    let mut next = || {
        // splitmix64
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    };

    let mut cuts: Vec<u128> = (1..count)
        .map(|i| {
            let r = ((next() as u128) << 64) | next() as u128;
            // every fourth cut falls in the lowest 1/1024th of the space,
            // which packs short segments into the first buckets
            if i % 4 == 0 {
                r % (max / 1024)
            } else {
                r % max
            }
        })
        .filter(|c| *c > 0)
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut builder = XdbBuilder::new(version);
    let region = |i: usize| format!("国家{}|省份{}|城市{}|ISP{}", i % 17, i % 7, i, i % 3);
    let mut start = 0u128;
    for (i, cut) in cuts.iter().enumerate() {
        builder.push(Segment {
            start: from_u128(start, width),
            end: from_u128(cut - 1, width),
            region: region(i),
        });
        start = *cut;
    }
    builder.push(Segment {
        start: from_u128(start, width),
        end: from_u128(max, width),
        region: region(cuts.len()),
    });
    builder
}
