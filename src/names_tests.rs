// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `names.rs`

#[cfg(test)]
mod tests {
    use crate::names::*;
    use std::net::IpAddr;

    #[test]
    fn test_fqdn_appends_separator() {
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
        assert_eq!(fqdn(""), ".");
    }

    #[test]
    fn test_fqdn_is_idempotent() {
        for name in ["example.com", "host1.example.com.", "  padded.org ", "."] {
            let once = fqdn(name);
            assert_eq!(fqdn(&once), once);
        }
    }

    #[test]
    fn test_owner_name_relative() {
        assert_eq!(owner_name("host1", "example.com."), "host1.example.com.");
        assert_eq!(owner_name("host1", "example.com"), "host1.example.com.");
    }

    #[test]
    fn test_owner_name_apex_and_absolute() {
        assert_eq!(owner_name("@", "example.com"), "example.com.");
        assert_eq!(owner_name("", "example.com"), "example.com.");
        assert_eq!(
            owner_name("other.example.net.", "example.com"),
            "other.example.net."
        );
    }

    #[test]
    fn test_is_in_zone() {
        assert!(is_in_zone("host1.example.com.", "example.com"));
        assert!(is_in_zone("example.com", "example.com."));
        assert!(is_in_zone("HOST.Example.COM", "example.com."));
        assert!(!is_in_zone("host1.example.net.", "example.com."));
        // Label boundary, not string suffix
        assert!(!is_in_zone("badexample.com.", "example.com."));
    }

    #[test]
    fn test_is_reverse_zone() {
        assert!(is_reverse_zone("1.1.10.in-addr.arpa"));
        assert!(is_reverse_zone("8.b.d.0.1.0.0.2.ip6.arpa."));
        assert!(!is_reverse_zone("example.com."));
    }

    #[test]
    fn test_reverse_mapping_ipv4_default() {
        let ip: IpAddr = "10.1.1.5".parse().unwrap();
        let mapping = ReversePolicy::default().mapping(ip);

        assert_eq!(mapping.ptr_name, "5.1.1.10.in-addr.arpa.");
        assert_eq!(mapping.zone, "1.1.10.in-addr.arpa.");
    }

    #[test]
    fn test_reverse_mapping_ipv4_classful_b() {
        let policy = ReversePolicy {
            ipv4_zone_octets: 2,
            ..ReversePolicy::default()
        };
        let mapping = policy.mapping("172.16.4.20".parse().unwrap());

        assert_eq!(mapping.ptr_name, "20.4.16.172.in-addr.arpa.");
        assert_eq!(mapping.zone, "16.172.in-addr.arpa.");
    }

    #[test]
    fn test_reverse_mapping_ipv6_default() {
        let mapping = ReversePolicy::default().mapping("2001:db8::1".parse().unwrap());

        assert_eq!(
            mapping.ptr_name,
            "1.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa."
        );
        assert_eq!(mapping.zone, "0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa.");
    }

    #[test]
    fn test_reverse_mapping_clamps_policy() {
        let policy = ReversePolicy {
            ipv4_zone_octets: 9,
            ipv6_zone_nibbles: 0,
        };
        let v4 = policy.mapping("10.1.1.5".parse().unwrap());
        assert_eq!(v4.zone, "1.1.10.in-addr.arpa.");

        let v6 = policy.mapping("2001:db8::1".parse().unwrap());
        assert_eq!(v6.zone, "2.ip6.arpa.");
    }
}
