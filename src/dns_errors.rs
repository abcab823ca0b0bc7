// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS operation error types for Binder.
//!
//! This module provides specialized error types for:
//! - TSIG keyring lookups (raised before any network I/O)
//! - Dynamic update rejections reported by the authoritative server
//! - Network failures talking to the update or transfer endpoints
//! - Zone transfer (AXFR) failures
//! - Zone directory listings over the BIND9 statistics channel
//!
//! The split lets a presentation layer tell "the server said no" apart from
//! "we couldn't reach the server" and from "you forgot a key".

use thiserror::Error;

/// Hint attached to transfer refusals.
pub const MISSING_TRANSFER_KEY_HINT: &str =
    "Unable to perform AXFR to list zone records. Did you forget to specify a default transfer key?";

/// Errors raised while resolving TSIG keys.
///
/// These are always detected before a message is sent. Only the key name is
/// ever carried, never the secret.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyringError {
    /// A key name was referenced that the keyring does not hold
    #[error("TSIG key '{name}' not found in keyring")]
    KeyNotFound {
        /// The referenced key name
        name: String,
    },

    /// The key exists but its material cannot be used for signing
    ///
    /// Returned for malformed base64 secrets or invalid key names.
    #[error("TSIG key '{name}' is invalid: {reason}")]
    InvalidKey {
        /// The key name
        name: String,
        /// Explanation of what is invalid
        reason: String,
    },
}

/// Errors related to record content in a dynamic update.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The server answered the UPDATE with a non-NOERROR response code
    ///
    /// `NOTAUTH` typically means a missing or incorrect TSIG key, `FORMERR`
    /// malformed record data, `REFUSED` an `allow-update` policy rejection.
    #[error("Server {server} rejected update of '{name}' in zone '{zone}': {rcode}")]
    UpdateRejected {
        /// Owner name of the record
        name: String,
        /// The zone the update targeted
        zone: String,
        /// The update endpoint (host:port)
        server: String,
        /// Response code name, e.g. `REFUSED`
        rcode: String,
    },

    /// Record data could not be turned into wire format
    #[error("Invalid record data for '{name}': {reason}")]
    InvalidRecordData {
        /// Owner name of the record
        name: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// A record in the transaction does not belong to the transaction's zone
    #[error("Record '{name}' is not in zone '{zone}'")]
    NotInZone {
        /// Owner name of the offending record
        name: String,
        /// The transaction's zone
        zone: String,
    },

    /// The transaction itself is structurally invalid (empty zone or record set)
    #[error("Invalid update transaction for zone '{zone}': {reason}")]
    InvalidTransaction {
        /// The transaction's zone
        zone: String,
        /// Explanation of what is invalid
        reason: String,
    },
}

/// Network-level failures reaching a DNS endpoint.
///
/// Never converted into a DNS-level failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established (refused, unreachable, DNS lookup failed)
    #[error("Connection to {endpoint} failed: {reason}")]
    ConnectionFailed {
        /// The endpoint (host:port)
        endpoint: String,
        /// Reason for the connection failure
        reason: String,
    },

    /// Connect, write or read exceeded its deadline
    #[error("Request to {endpoint} timed out after {timeout_ms}ms")]
    Timeout {
        /// The endpoint (host:port)
        endpoint: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// The peer answered with something that is not a matching DNS response
    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse {
        /// The endpoint (host:port)
        endpoint: String,
        /// What was wrong with the response
        reason: String,
    },

    /// A response to a signed request carried no valid TSIG signature
    ///
    /// The response code it claimed is not trusted. Servers answer a bad or
    /// unknown key unsigned, so this also covers key mismatches.
    #[error("Response from {endpoint} failed TSIG verification: {reason}")]
    UnverifiedResponse {
        /// The endpoint (host:port)
        endpoint: String,
        /// Why verification failed
        reason: String,
    },

    /// The message could not be encoded or the connection dropped mid-exchange
    #[error("I/O error talking to {endpoint}: {reason}")]
    Io {
        /// The endpoint (host:port)
        endpoint: String,
        /// The underlying error text
        reason: String,
    },
}

/// Errors related to zone transfers (AXFR).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The server refused the transfer, typically because a TSIG key is required
    #[error("{hint} (zone '{zone}' on {server}: {rcode})", hint = MISSING_TRANSFER_KEY_HINT)]
    AuthenticationRequired {
        /// The zone being transferred
        zone: String,
        /// The transfer endpoint (host:port)
        server: String,
        /// Response code name, e.g. `REFUSED` or `NOTAUTH`
        rcode: String,
    },

    /// The transfer endpoint could not be reached
    #[error("Unable to reach {server} to transfer zone '{zone}': {source}")]
    Unreachable {
        /// The zone being transferred
        zone: String,
        /// The transfer endpoint (host:port)
        server: String,
        /// Underlying network failure
        source: TransportError,
    },

    /// Any other transfer failure (unexpected rcode, truncated stream)
    #[error("Zone transfer of '{zone}' from {server} failed: {reason}")]
    TransferFailed {
        /// The zone being transferred
        zone: String,
        /// The transfer endpoint (host:port)
        server: String,
        /// Reason for the failure
        reason: String,
    },
}

/// Errors listing zones on a server's statistics channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// The statistics channel could not be queried; `reason` is the
    /// underlying error text, verbatim
    #[error("{reason}")]
    ListingFailed {
        /// The statistics endpoint URL
        endpoint: String,
        /// The underlying error text
        reason: String,
    },

    /// The statistics channel answered but the document could not be parsed
    #[error("Unexpected zone listing from {endpoint}: {reason}")]
    MalformedListing {
        /// The statistics endpoint URL
        endpoint: String,
        /// Parse failure details
        reason: String,
    },
}

/// Composite error type that encompasses all DNS operation errors.
///
/// This is the primary error type returned by the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    /// Keyring lookup error
    #[error(transparent)]
    Keyring(#[from] KeyringError),

    /// Record content or update transaction error
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Update endpoint unreachable or misbehaving
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Zone transfer error
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Zone directory listing error
    #[error(transparent)]
    Zone(#[from] ZoneError),

    /// The named server is not part of the inventory
    #[error("DNS server '{0}' is not configured")]
    UnknownServer(String),
}

impl DnsError {
    /// Returns true if this error is transient and a caller-driven retry may succeed.
    ///
    /// The engine itself never retries.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(
                TransportError::ConnectionFailed { .. }
                | TransportError::Timeout { .. }
                | TransportError::MalformedResponse { .. }
                | TransportError::Io { .. },
            )
            | Self::Transfer(TransferError::Unreachable { .. })
            | Self::Zone(ZoneError::ListingFailed { .. }) => true,

            Self::Keyring(_)
            | Self::Record(_)
            | Self::Transport(TransportError::UnverifiedResponse { .. })
            | Self::Transfer(
                TransferError::AuthenticationRequired { .. } | TransferError::TransferFailed { .. },
            )
            | Self::Zone(ZoneError::MalformedListing { .. })
            | Self::UnknownServer(_) => false,
        }
    }

    /// Returns a stable, machine-readable reason code for this error.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::Keyring(KeyringError::KeyNotFound { .. }) => "KeyNotFound",
            Self::Keyring(KeyringError::InvalidKey { .. }) => "InvalidKey",

            Self::Record(RecordError::UpdateRejected { .. }) => "UpdateRejected",
            Self::Record(RecordError::InvalidRecordData { .. }) => "InvalidRecordData",
            Self::Record(RecordError::NotInZone { .. }) => "RecordNotInZone",
            Self::Record(RecordError::InvalidTransaction { .. }) => "InvalidTransaction",

            Self::Transport(TransportError::ConnectionFailed { .. }) => "ConnectionFailed",
            Self::Transport(TransportError::Timeout { .. }) => "Timeout",
            Self::Transport(TransportError::MalformedResponse { .. }) => "MalformedResponse",
            Self::Transport(TransportError::UnverifiedResponse { .. }) => "ResponseUnverified",
            Self::Transport(TransportError::Io { .. }) => "TransportIo",

            Self::Transfer(TransferError::AuthenticationRequired { .. }) => "TransferAuthRequired",
            Self::Transfer(TransferError::Unreachable { .. }) => "TransferUnreachable",
            Self::Transfer(TransferError::TransferFailed { .. }) => "TransferFailed",

            Self::Zone(ZoneError::ListingFailed { .. }) => "ZoneListingFailed",
            Self::Zone(ZoneError::MalformedListing { .. }) => "ZoneListingMalformed",

            Self::UnknownServer(_) => "UnknownServer",
        }
    }
}

#[cfg(test)]
#[path = "dns_errors_tests.rs"]
mod dns_errors_tests;
