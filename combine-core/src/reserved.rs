//! Non-routable and reserved IPv4 space
//!
//! An address is reserved if it falls in one of the fixed special-purpose
//! blocks below or carries one of the address's own private/reserved flags.

use ipnet::Ipv4Net;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

/// Special-purpose blocks not covered by the standard address flags
pub const RESERVED_CIDRS: [&str; 8] = [
    "0.0.0.0/8",
    "100.64.0.0/10",
    "127.0.0.0/8",
    "192.88.99.0/24",
    "198.18.0.0/15",
    "198.51.100.0/24",
    "203.0.113.0/24",
    "233.252.0.0/24",
];

static RESERVED_BLOCKS: LazyLock<Vec<Ipv4Net>> = LazyLock::new(|| {
    RESERVED_CIDRS
        .iter()
        .map(|cidr| cidr.parse().unwrap())
        .collect()
});

// IETF protocol assignments and the former class E space
static INTRINSIC_BLOCKS: LazyLock<[Ipv4Net; 2]> =
    LazyLock::new(|| ["192.0.0.0/24".parse().unwrap(), "240.0.0.0/4".parse().unwrap()]);

/// True if `addr` lies in one of the fixed reserved blocks
pub fn in_reserved_blocks(addr: Ipv4Addr) -> bool {
    RESERVED_BLOCKS.iter().any(|net| net.contains(&addr))
}

/// True if the address is private or reserved by its own nature
pub fn is_private_or_reserved(addr: Ipv4Addr) -> bool {
    addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_unspecified()
        || addr.is_broadcast()
        || addr.is_documentation()
        || addr.is_multicast()
        || INTRINSIC_BLOCKS.iter().any(|net| net.contains(&addr))
}

/// True if `addr` must never be published or enriched
pub fn is_reserved(addr: Ipv4Addr) -> bool {
    in_reserved_blocks(addr) || is_private_or_reserved(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_fixed_blocks() {
        assert!(is_reserved(ip("127.5.5.5")));
        assert!(is_reserved(ip("100.64.1.1")));
        assert!(is_reserved(ip("198.19.255.255")));
        assert!(is_reserved(ip("233.252.0.9")));
        assert!(in_reserved_blocks(ip("0.1.2.3")));
    }

    #[test]
    fn test_intrinsic_flags() {
        assert!(is_reserved(ip("10.1.2.3")));
        assert!(is_reserved(ip("172.16.0.1")));
        assert!(is_reserved(ip("192.168.1.1")));
        assert!(is_reserved(ip("169.254.0.1")));
        assert!(is_reserved(ip("224.0.0.1")));
        assert!(is_reserved(ip("250.1.1.1")));
        assert!(is_reserved(ip("255.255.255.255")));
        assert!(!in_reserved_blocks(ip("10.1.2.3")));
    }

    #[test]
    fn test_public_addresses() {
        assert!(!is_reserved(ip("8.8.8.8")));
        assert!(!is_reserved(ip("1.1.1.1")));
        assert!(!is_reserved(ip("100.128.0.1")));
        assert!(!is_reserved(ip("198.20.0.1")));
    }
}
