// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! TSIG keyring and key file parsing.
//!
//! The keyring is built once from the inventory and never mutated. Lookups
//! ignore case and a trailing dot, matching how BIND9 compares key names.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hickory_client::rr::rdata::tsig::TsigAlgorithm as WireAlgorithm;
use hickory_client::rr::Name;
use hickory_proto::rr::dnssec::tsig::TSigner;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::config::{KeyConfig, TsigAlgorithm};
use crate::constants::TSIG_FUDGE_TIME_SECS;
use crate::dns_errors::KeyringError;
use crate::names::fqdn;

/// Named TSIG keys usable to sign protocol messages.
#[derive(Clone, Default)]
pub struct Keyring {
    keys: BTreeMap<String, KeyConfig>,
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring")
            .field("keys", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Key names compare case-insensitively and without a trailing dot.
pub(crate) fn lookup_key(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

impl Keyring {
    /// Build a keyring from key definitions. Later duplicates replace earlier ones.
    #[must_use]
    pub fn new(keys: &[KeyConfig]) -> Self {
        Self {
            keys: keys
                .iter()
                .map(|key| (lookup_key(&key.name), key.clone()))
                .collect(),
        }
    }

    /// Return the key material for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyringError::KeyNotFound`] if no key has that name.
    pub fn get(&self, name: &str) -> Result<&KeyConfig, KeyringError> {
        self.keys
            .get(&lookup_key(name))
            .ok_or_else(|| KeyringError::KeyNotFound {
                name: name.to_string(),
            })
    }

    /// Build a TSIG signer for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyringError::KeyNotFound`] for unknown names and
    /// [`KeyringError::InvalidKey`] when the secret or name is unusable.
    pub fn signer(&self, name: &str) -> Result<TSigner, KeyringError> {
        create_tsig_signer(self.get(name)?)
    }

    /// Names of all keys, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.keys.values().map(|key| key.name.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Create a TSIG signer from key data.
///
/// # Errors
///
/// Returns [`KeyringError::InvalidKey`] if the secret is not valid base64 or
/// the key name is not a valid domain name. The error never contains the secret.
pub fn create_tsig_signer(key: &KeyConfig) -> Result<TSigner, KeyringError> {
    let algorithm = match key.algorithm {
        TsigAlgorithm::HmacMd5 => WireAlgorithm::HmacMd5,
        TsigAlgorithm::HmacSha1 => WireAlgorithm::HmacSha1,
        TsigAlgorithm::HmacSha224 => WireAlgorithm::HmacSha224,
        TsigAlgorithm::HmacSha256 => WireAlgorithm::HmacSha256,
        TsigAlgorithm::HmacSha384 => WireAlgorithm::HmacSha384,
        TsigAlgorithm::HmacSha512 => WireAlgorithm::HmacSha512,
    };

    let invalid = |reason: String| KeyringError::InvalidKey {
        name: key.name.clone(),
        reason,
    };

    let key_bytes = BASE64
        .decode(key.secret.trim())
        .map_err(|_| invalid("secret is not valid base64".to_string()))?;
    if key_bytes.is_empty() {
        return Err(invalid("secret is empty".to_string()));
    }

    let signer_name =
        Name::from_str(&fqdn(&key.name)).map_err(|e| invalid(format!("invalid key name: {e}")))?;

    TSigner::new(key_bytes, algorithm, signer_name, TSIG_FUDGE_TIME_SECS)
        .map_err(|e| invalid(format!("failed to create TSIG signer: {e}")))
}

/// Parse a BIND9 key file to extract key metadata.
///
/// Expected format:
/// ```text
/// key "key-name" {
///     algorithm hmac-sha256;
///     secret "base64secret==";
/// };
/// ```
///
/// # Errors
///
/// Returns an error if the file format is invalid or required fields are missing.
pub fn parse_key_file(content: &str) -> Result<KeyConfig> {
    let name = content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("key"))
        .and_then(|line| line.split('"').nth(1))
        .filter(|name| !name.is_empty())
        .context("Failed to parse key name from key file")?
        .to_string();

    let algorithm_str = content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("algorithm"))
        .and_then(|line| {
            line.split_whitespace()
                .nth(1) // After "algorithm"
                .map(|s| s.trim_end_matches(';').trim_matches('"'))
        })
        .context("Failed to parse algorithm from key file")?;
    let algorithm = TsigAlgorithm::from_str(algorithm_str)?;

    let secret = content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("secret"))
        .and_then(|line| line.split('"').nth(1))
        .context("Failed to parse secret from key file")?
        .to_string();

    Ok(KeyConfig {
        name,
        algorithm,
        secret,
    })
}

#[cfg(test)]
#[path = "keyring_tests.rs"]
mod keyring_tests;
