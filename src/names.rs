// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Domain name helpers.
//!
//! Every name handed to the wire protocol is fully qualified. Callers may pass
//! relative record names, bare zone names or names that already carry the
//! trailing dot; the helpers here turn all of them into canonical FQDNs.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::constants::{IPV4_REVERSE_SUFFIX, IPV6_REVERSE_SUFFIX, ZONE_APEX};

/// Append the trailing label separator if it is missing.
///
/// Idempotent: `fqdn(&fqdn(x)) == fqdn(x)`. The root name stays `"."`.
#[must_use]
pub fn fqdn(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return ".".to_string();
    }
    if trimmed.ends_with('.') {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

/// Build the owner name of a record within a zone.
///
/// `""` and `"@"` denote the apex, names ending in `.` are taken as absolute,
/// anything else is relative to `zone`.
#[must_use]
pub fn owner_name(record_name: &str, zone: &str) -> String {
    let record_name = record_name.trim();
    let zone = fqdn(zone);
    if record_name.is_empty() || record_name == ZONE_APEX {
        zone
    } else if record_name.ends_with('.') {
        record_name.to_string()
    } else if zone == "." {
        format!("{record_name}.")
    } else {
        format!("{record_name}.{zone}")
    }
}

/// Whether `name` is `zone` itself or lies beneath it (case-insensitive).
#[must_use]
pub fn is_in_zone(name: &str, zone: &str) -> bool {
    let name = fqdn(name).to_ascii_lowercase();
    let zone = fqdn(zone).to_ascii_lowercase();
    if zone == "." || name == zone {
        return true;
    }
    name.ends_with(&format!(".{zone}"))
}

/// Whether the zone maps addresses back to names.
#[must_use]
pub fn is_reverse_zone(zone: &str) -> bool {
    let zone = fqdn(zone).to_ascii_lowercase();
    zone.ends_with(IPV4_REVERSE_SUFFIX) || zone.ends_with(IPV6_REVERSE_SUFFIX)
}

/// Reverse zone cut used to place PTR records.
///
/// IPv4 zones are cut on octet boundaries, IPv6 zones on nibble boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ReversePolicy {
    /// Leading octets forming the IPv4 reverse zone (1..=3)
    pub ipv4_zone_octets: u8,
    /// Leading nibbles forming the IPv6 reverse zone (1..=31)
    pub ipv6_zone_nibbles: u8,
}

impl Default for ReversePolicy {
    fn default() -> Self {
        Self {
            ipv4_zone_octets: crate::constants::DEFAULT_IPV4_ZONE_OCTETS,
            ipv6_zone_nibbles: crate::constants::DEFAULT_IPV6_ZONE_NIBBLES,
        }
    }
}

/// PTR placement derived from an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseMapping {
    /// Fully-qualified PTR owner name, e.g. `5.1.1.10.in-addr.arpa.`
    pub ptr_name: String,
    /// Fully-qualified reverse zone, e.g. `1.1.10.in-addr.arpa.`
    pub zone: String,
}

impl ReversePolicy {
    /// Derive the PTR owner name and its enclosing reverse zone.
    #[must_use]
    pub fn mapping(&self, address: IpAddr) -> ReverseMapping {
        match address {
            IpAddr::V4(v4) => self.mapping_v4(v4),
            IpAddr::V6(v6) => self.mapping_v6(v6),
        }
    }

    fn mapping_v4(&self, address: Ipv4Addr) -> ReverseMapping {
        let octets = address.octets();
        let keep = usize::from(self.ipv4_zone_octets.clamp(1, 3));

        let labels: Vec<String> = octets.iter().rev().map(ToString::to_string).collect();
        let zone_labels = &labels[labels.len() - keep..];

        ReverseMapping {
            ptr_name: format!("{}.{IPV4_REVERSE_SUFFIX}", labels.join(".")),
            zone: format!("{}.{IPV4_REVERSE_SUFFIX}", zone_labels.join(".")),
        }
    }

    fn mapping_v6(&self, address: Ipv6Addr) -> ReverseMapping {
        let keep = usize::from(self.ipv6_zone_nibbles.clamp(1, 31));

        let nibbles: Vec<String> = address
            .octets()
            .iter()
            .flat_map(|byte| [byte >> 4, byte & 0x0f])
            .rev()
            .map(|nibble| format!("{nibble:x}"))
            .collect();
        let zone_labels = &nibbles[nibbles.len() - keep..];

        ReverseMapping {
            ptr_name: format!("{}.{IPV6_REVERSE_SUFFIX}", nibbles.join(".")),
            zone: format!("{}.{IPV6_REVERSE_SUFFIX}", zone_labels.join(".")),
        }
    }
}

#[cfg(test)]
#[path = "names_tests.rs"]
mod names_tests;
