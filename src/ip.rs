//! Textual and binary IP address handling.
//!
//! Addresses travel through the searcher as fixed-width big-endian byte
//! sequences: 4 bytes for IPv4 and 16 bytes for IPv6. [`ip_compare`] is the
//! one ordering used for segment lookups, verification and bench validation.

use std::cmp::Ordering;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::{Error, Result};

/// Byte width of an IPv4 address.
pub const IPV4_BYTES: usize = 4;

/// Byte width of an IPv6 address.
pub const IPV6_BYTES: usize = 16;

/// Parse a dotted-decimal IPv4 or colon-hex IPv6 address into big-endian bytes.
///
/// IPv4-mapped IPv6 text (`::ffff:1.2.3.4`) keeps its 16-byte IPv6 form.
///
/// # Examples
/// ```
/// use ipregion::ip::parse_ip;
///
/// assert_eq!(parse_ip("1.2.3.4").unwrap(), vec![1, 2, 3, 4]);
/// assert_eq!(parse_ip("::1").unwrap().len(), 16);
/// assert!(parse_ip("1.2.3").is_err());
/// ```
pub fn parse_ip(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    match text.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => Ok(v4.octets().to_vec()),
        Ok(IpAddr::V6(v6)) => Ok(v6.octets().to_vec()),
        Err(_) => Err(Error::InvalidIp(text.to_string())),
    }
}

/// Format a 4- or 16-byte address back to text.
///
/// Any other width is rendered as `invalid-ip(..)` so callers can log it.
pub fn ip_to_string(ip: &[u8]) -> String {
    if let Ok(v4) = <[u8; IPV4_BYTES]>::try_from(ip) {
        return Ipv4Addr::from(v4).to_string();
    }
    if let Ok(v6) = <[u8; IPV6_BYTES]>::try_from(ip) {
        return Ipv6Addr::from(v6).to_string();
    }
    format!("invalid-ip({:?})", ip)
}

/// Compare two addresses as unsigned big-endian numbers.
///
/// Both sides are expected to have the same width; a shorter address that is
/// a prefix of the longer one orders first.
pub fn ip_compare(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4() {
        assert_eq!(parse_ip("192.168.1.102").unwrap(), vec![192, 168, 1, 102]);
        assert_eq!(parse_ip(" 0.0.0.0 ").unwrap(), vec![0, 0, 0, 0]);
        assert_eq!(parse_ip("255.255.255.255").unwrap(), vec![255; 4]);
    }

    #[test]
    fn test_parse_ipv6() {
        let ip = parse_ip("2001:2:0:ffff:ffff:ffff:ffff:ffff").unwrap();
        assert_eq!(ip.len(), IPV6_BYTES);
        assert_eq!(&ip[..4], &[0x20, 0x01, 0x00, 0x02]);

        assert_eq!(parse_ip("::").unwrap(), vec![0; 16]);
        assert_eq!(parse_ip("3000::").unwrap()[0], 0x30);

        // Mapped addresses stay in the IPv6 family
        let mapped = parse_ip("::ffff:114.114.114.114").unwrap();
        assert_eq!(mapped.len(), IPV6_BYTES);
        assert_eq!(&mapped[10..], &[0xff, 0xff, 114, 114, 114, 114]);
    }

    #[test]
    fn test_parse_invalid() {
        for bad in ["", "1.2.3", "1.2.3.4.5", "256.0.0.1", "1.2.3.x", "2001:::1", "abc"] {
            assert!(
                matches!(parse_ip(bad), Err(Error::InvalidIp(_))),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_ip_to_string() {
        assert_eq!(ip_to_string(&[1, 0, 0, 255]), "1.0.0.255");
        assert_eq!(ip_to_string(&parse_ip("2001:4:112::").unwrap()), "2001:4:112::");
        assert!(ip_to_string(&[1, 2, 3]).starts_with("invalid-ip"));
    }

    #[test]
    fn test_round_trip() {
        let samples: Vec<Vec<u8>> = vec![
            vec![0, 0, 0, 0],
            vec![255, 255, 255, 255],
            vec![1, 1, 0, 0],
            vec![28, 201, 224, 0],
            vec![0; 16],
            vec![0xff; 16],
            parse_ip("fec0::").unwrap(),
            parse_ip("2001:4:112:ffff:ffff:ffff:ffff:ffff").unwrap(),
            (0u8..16).collect(),
        ];

        for bytes in samples {
            assert_eq!(parse_ip(&ip_to_string(&bytes)).unwrap(), bytes);
        }
    }

    #[test]
    fn test_ip_compare() {
        let pairs = [
            ("1.0.0.0", "1.0.0.1", Ordering::Less),
            ("192.168.1.101", "192.168.1.90", Ordering::Greater),
            ("219.133.111.87", "114.114.114.114", Ordering::Greater),
            ("2000::", "2000:ffff:ffff:ffff:ffff:ffff:ffff:ffff", Ordering::Less),
            ("2001:4:112::", "2001:4:112:ffff:ffff:ffff:ffff:ffff", Ordering::Less),
            ("ffff::", "2001:4:ffff:ffff:ffff:ffff:ffff:ffff", Ordering::Greater),
            ("10.0.0.1", "10.0.0.1", Ordering::Equal),
        ];

        for (a, b, expected) in pairs {
            let a = parse_ip(a).unwrap();
            let b = parse_ip(b).unwrap();
            assert_eq!(ip_compare(&a, &b), expected);
            assert_eq!(ip_compare(&b, &a), expected.reverse());
        }
    }
}
