//! Interval value type
//!
//! This module provides the closed 32-bit interval that the partition trie
//! classifies points into.

pub mod range;

pub use range::Interval;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_ipv4;

    #[test]
    fn test_interval_from_addresses() {
        let start = parse_ipv4("127.0.0.0").unwrap();
        let end = parse_ipv4("127.255.255.255").unwrap();
        let loopback = Interval::new("loopback", start, end).unwrap();

        assert!(loopback.contains(parse_ipv4("127.0.0.1").unwrap()));
        assert!(!loopback.contains(parse_ipv4("128.0.0.0").unwrap()));
        assert_eq!(loopback.len(), 1 << 24);
    }
}
