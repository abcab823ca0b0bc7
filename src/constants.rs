// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Binder zone management engine.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Standard DNS port for dynamic updates and zone transfers
pub const DNS_PORT: u16 = 53;

/// Default BIND9 statistics channel port
pub const STATISTICS_PORT: u16 = 8053;

/// Default TTL for DNS records (1 day, the most common choice in the UI)
pub const DEFAULT_DNS_RECORD_TTL_SECS: u32 = 86400;

/// TSIG fudge time in seconds (allows for clock skew)
pub const TSIG_FUDGE_TIME_SECS: u16 = 300;

/// Upper bound on messages read for a single AXFR before giving up
pub const MAX_AXFR_MESSAGES: usize = 100_000;

// ============================================================================
// Name Constants
// ============================================================================

/// Zone apex marker accepted in place of a record name
pub const ZONE_APEX: &str = "@";

/// Reverse mapping suffix for IPv4 addresses
pub const IPV4_REVERSE_SUFFIX: &str = "in-addr.arpa.";

/// Reverse mapping suffix for IPv6 addresses
pub const IPV6_REVERSE_SUFFIX: &str = "ip6.arpa.";

/// Zone shown for a reverse record whose address could not be parsed
pub const UNKNOWN_REVERSE_ZONE: &str = "<unknown reverse zone>";

/// Default number of IPv4 octets forming a reverse zone (/24)
pub const DEFAULT_IPV4_ZONE_OCTETS: u8 = 3;

/// Default number of IPv6 nibbles forming a reverse zone (/64)
pub const DEFAULT_IPV6_ZONE_NIBBLES: u8 = 16;

/// Separator used by the bulk delete `name||data||type` encoding
pub const TRIPLE_SEPARATOR: &str = "||";

// ============================================================================
// Timeout Constants
// ============================================================================

/// Default TCP connect timeout for DNS and statistics endpoints
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default read timeout for a single DNS response or HTTP body
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 10_000;

/// Default deadline for a whole zone transfer, first query to closing SOA
pub const DEFAULT_TRANSFER_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// Statistics Channel Constants
// ============================================================================

/// Path of the JSON zone listing on the BIND9 statistics channel
pub const STATISTICS_ZONES_PATH: &str = "/json/v1/zones";

/// Internal BIND9 view holding builtin zones (`version.bind`, ...)
pub const STATISTICS_BUILTIN_VIEW: &str = "_bind";

// ============================================================================
// Configuration Constants
// ============================================================================

/// Environment variable naming the inventory file
pub const CONFIG_PATH_ENV: &str = "BINDER_CONFIG";

/// Inventory file used when neither `--config` nor `BINDER_CONFIG` is set
pub const DEFAULT_CONFIG_PATH: &str = "/etc/binder/binder.yaml";

/// Default BIND9 query log location
pub const DEFAULT_QUERY_LOG_PATH: &str = "/var/log/named/query.log";

/// Default number of trailing query log lines summarized
pub const DEFAULT_QUERY_LOG_WINDOW: usize = 10_000;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 2;
