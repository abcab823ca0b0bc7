// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Inventory of known DNS servers and TSIG keys.
//!
//! The inventory is a read-only snapshot handed to the engine at construction.
//! It is loaded from YAML by the binary, or built directly in tests:
//!
//! ```yaml
//! servers:
//!   - hostname: ns1.example.com
//!     dns_port: 53
//!     transfer_port: 53
//!     statistics_port: 8053
//!     default_transfer_key: transfer-key
//! keys:
//!   - name: update-key
//!     algorithm: hmac-sha256
//!     secret: "c2VjcmV0c2VjcmV0c2VjcmV0c2VjcmV0"
//! key_files:
//!   - /etc/bind/rndc.key
//! timeouts:
//!   connect_timeout_ms: 5000
//!   read_timeout_ms: 10000
//!   transfer_timeout_ms: 60000
//! reverse:
//!   ipv4_zone_octets: 3
//!   ipv6_zone_nibbles: 16
//! ```
//!
//! Relative `key_files` entries are read from the inventory file's directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::bind9::keyring::{lookup_key, parse_key_file};
use crate::constants::{
    CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_TRANSFER_TIMEOUT_MS, DNS_PORT, STATISTICS_PORT,
};
use crate::names::ReversePolicy;

/// HMAC algorithm of a TSIG key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TsigAlgorithm {
    #[serde(rename = "hmac-md5")]
    HmacMd5,
    #[serde(rename = "hmac-sha1")]
    HmacSha1,
    #[serde(rename = "hmac-sha224")]
    HmacSha224,
    #[serde(rename = "hmac-sha256")]
    HmacSha256,
    #[serde(rename = "hmac-sha384")]
    HmacSha384,
    #[serde(rename = "hmac-sha512")]
    HmacSha512,
}

impl TsigAlgorithm {
    /// BIND9 spelling of the algorithm.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HmacMd5 => "hmac-md5",
            Self::HmacSha1 => "hmac-sha1",
            Self::HmacSha224 => "hmac-sha224",
            Self::HmacSha256 => "hmac-sha256",
            Self::HmacSha384 => "hmac-sha384",
            Self::HmacSha512 => "hmac-sha512",
        }
    }
}

impl std::str::FromStr for TsigAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        // BIND also accepts the RFC 8945 long form for md5
        match s.to_ascii_lowercase().as_str() {
            "hmac-md5" | "hmac-md5.sig-alg.reg.int" => Ok(Self::HmacMd5),
            "hmac-sha1" => Ok(Self::HmacSha1),
            "hmac-sha224" => Ok(Self::HmacSha224),
            "hmac-sha256" => Ok(Self::HmacSha256),
            "hmac-sha384" => Ok(Self::HmacSha384),
            "hmac-sha512" => Ok(Self::HmacSha512),
            _ => anyhow::bail!("Unsupported TSIG algorithm '{s}'. Supported algorithms: hmac-md5, hmac-sha1, hmac-sha224, hmac-sha256, hmac-sha384, hmac-sha512"),
        }
    }
}

/// TSIG key definition.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Key name, unique across the inventory
    pub name: String,
    /// HMAC algorithm
    pub algorithm: TsigAlgorithm,
    /// Base64-encoded secret
    pub secret: String,
}

impl std::fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyConfig")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// An authoritative DNS server and its three independent endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Hostname or IP address
    pub hostname: String,
    /// Port accepting dynamic updates
    #[serde(default = "default_dns_port")]
    pub dns_port: u16,
    /// Port serving zone transfers
    #[serde(default = "default_dns_port")]
    pub transfer_port: u16,
    /// BIND9 statistics channel port
    #[serde(default = "default_statistics_port")]
    pub statistics_port: u16,
    /// Key used for AXFR when the caller does not name one
    #[serde(default)]
    pub default_transfer_key: Option<String>,
}

fn default_dns_port() -> u16 {
    DNS_PORT
}

fn default_statistics_port() -> u16 {
    STATISTICS_PORT
}

impl Server {
    /// Server with standard ports and no default key.
    #[must_use]
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            dns_port: DNS_PORT,
            transfer_port: DNS_PORT,
            statistics_port: STATISTICS_PORT,
            default_transfer_key: None,
        }
    }

    /// `host:port` of the dynamic update endpoint.
    #[must_use]
    pub fn update_endpoint(&self) -> String {
        endpoint(&self.hostname, self.dns_port)
    }

    /// `host:port` of the zone transfer endpoint.
    #[must_use]
    pub fn transfer_endpoint(&self) -> String {
        endpoint(&self.hostname, self.transfer_port)
    }
}

/// Format `host:port`, bracketing bare IPv6 literals.
pub(crate) fn endpoint(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Network deadlines applied to every DNS and statistics call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// TCP connect deadline in milliseconds
    pub connect_timeout_ms: u64,
    /// Deadline for an update response in milliseconds
    pub read_timeout_ms: u64,
    /// Deadline for a whole zone transfer in milliseconds
    pub transfer_timeout_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            transfer_timeout_ms: DEFAULT_TRANSFER_TIMEOUT_MS,
        }
    }
}

impl Timeouts {
    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn read(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    #[must_use]
    pub fn transfer(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }
}

/// Read-only snapshot of servers, keys and engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    pub servers: Vec<Server>,
    pub keys: Vec<KeyConfig>,
    /// BIND9 key files to merge into `keys`
    pub key_files: Vec<PathBuf>,
    pub timeouts: Timeouts,
    pub reverse: ReversePolicy,
}

impl Inventory {
    /// Look up a server by hostname (case-insensitive).
    #[must_use]
    pub fn server(&self, hostname: &str) -> Option<&Server> {
        self.servers
            .iter()
            .find(|s| s.hostname.eq_ignore_ascii_case(hostname))
    }

    /// Servers ordered by hostname.
    #[must_use]
    pub fn servers_sorted(&self) -> Vec<&Server> {
        let mut servers: Vec<&Server> = self.servers.iter().collect();
        servers.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        servers
    }

    /// Parse an inventory document.
    ///
    /// Relative `key_files` are resolved against the current directory and
    /// merged. [`Inventory::load`] resolves them against the inventory file's
    /// directory instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid, a key file cannot be read or
    /// parsed, or two keys share a name.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Self::from_yaml_in(content, None)
    }

    fn from_yaml_in(content: &str, base_dir: Option<&Path>) -> Result<Self> {
        let mut inventory: Self =
            serde_yaml::from_str(content).context("Failed to parse inventory YAML")?;

        for listed in inventory.key_files.clone() {
            let path = match base_dir {
                Some(dir) if listed.is_relative() => dir.join(&listed),
                _ => listed,
            };
            let key_content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read key file {}", path.display()))?;
            let key = parse_key_file(&key_content)
                .with_context(|| format!("Failed to parse key file {}", path.display()))?;
            debug!(key = %key.name, path = %path.display(), "Loaded TSIG key from key file");
            inventory.keys.push(key);
        }

        inventory.validate()?;
        Ok(inventory)
    }

    /// Load the inventory from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read inventory file {}", path.display()))?;
        let inventory = Self::from_yaml_in(&content, path.parent())?;
        info!(
            path = %path.display(),
            servers = inventory.servers.len(),
            keys = inventory.keys.len(),
            "Loaded inventory"
        );
        Ok(inventory)
    }

    /// Resolve the inventory path: explicit path, then `BINDER_CONFIG`, then the default.
    #[must_use]
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit.map_or_else(
            || {
                std::env::var(CONFIG_PATH_ENV)
                    .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
            },
            Path::to_path_buf,
        )
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for key in &self.keys {
            if !seen.insert(lookup_key(&key.name)) {
                anyhow::bail!("Duplicate TSIG key name '{}' in inventory", key.name);
            }
        }

        let mut hosts = HashSet::new();
        for server in &self.servers {
            if server.hostname.trim().is_empty() {
                anyhow::bail!("Server entry with empty hostname in inventory");
            }
            if !hosts.insert(server.hostname.to_ascii_lowercase()) {
                anyhow::bail!("Duplicate server '{}' in inventory", server.hostname);
            }
        }

        if !(1..=3).contains(&self.reverse.ipv4_zone_octets) {
            anyhow::bail!("reverse.ipv4_zone_octets must be between 1 and 3");
        }
        if !(1..=31).contains(&self.reverse.ipv6_zone_nibbles) {
            anyhow::bail!("reverse.ipv6_zone_nibbles must be between 1 and 31");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
