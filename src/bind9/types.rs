// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record types shared by the update, transfer and coordination layers.

use hickory_client::rr::{rdata, Name, RData, Record, RecordType};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::dns_errors::RecordError;
use crate::names::fqdn;

/// Record types the engine can write or delete.
///
/// Adds are limited to A, AAAA, CNAME and PTR; NS is accepted for deletes of
/// delegations that show up in zone listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordKind {
    A,
    #[allow(clippy::upper_case_acronyms)]
    AAAA,
    #[allow(clippy::upper_case_acronyms)]
    CNAME,
    #[allow(clippy::upper_case_acronyms)]
    PTR,
    NS,
}

impl RecordKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::CNAME => "CNAME",
            Self::PTR => "PTR",
            Self::NS => "NS",
        }
    }

    /// Whether the add path accepts this type.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::NS)
    }

    /// Whether the record data names another host (and so must be fully qualified).
    #[must_use]
    pub fn has_name_target(&self) -> bool {
        matches!(self, Self::CNAME | Self::PTR | Self::NS)
    }

    fn record_type(self) -> RecordType {
        match self {
            Self::A => RecordType::A,
            Self::AAAA => RecordType::AAAA,
            Self::CNAME => RecordType::CNAME,
            Self::PTR => RecordType::PTR,
            Self::NS => RecordType::NS,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::AAAA),
            "CNAME" => Ok(Self::CNAME),
            "PTR" => Ok(Self::PTR),
            "NS" => Ok(Self::NS),
            other => Err(format!("unsupported record type '{other}'")),
        }
    }
}

/// A resource record as the engine sees it.
///
/// `name` is always fully qualified once the record has passed through the
/// constructors below; name-valued `data` (CNAME, PTR, NS) is too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub name: String,
    pub kind: RecordKind,
    pub data: String,
    pub ttl: u32,
}

impl ResourceRecord {
    /// Create a record, normalizing the owner name and name-valued data.
    #[must_use]
    pub fn new(name: &str, kind: RecordKind, data: &str, ttl: u32) -> Self {
        let data = if kind.has_name_target() {
            fqdn(data)
        } else {
            data.trim().to_string()
        };
        Self {
            name: fqdn(name),
            kind,
            data,
            ttl,
        }
    }

    /// Convert to a hickory record carrying rdata.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidRecordData`] if the data cannot be
    /// expressed on the wire (bad address, bad target name).
    pub fn to_wire(&self) -> Result<Record, RecordError> {
        let invalid = |reason: String| RecordError::InvalidRecordData {
            name: self.name.clone(),
            reason,
        };

        let owner = Name::from_str(&self.name).map_err(|e| invalid(format!("invalid owner name: {e}")))?;
        let target = || {
            Name::from_str(&self.data)
                .map_err(|e| invalid(format!("invalid target '{}': {e}", self.data)))
        };

        let rdata = match self.kind {
            RecordKind::A => {
                let ip = Ipv4Addr::from_str(&self.data)
                    .map_err(|_| invalid(format!("invalid IPv4 address '{}'", self.data)))?;
                RData::A(ip.into())
            }
            RecordKind::AAAA => {
                let ip = Ipv6Addr::from_str(&self.data)
                    .map_err(|_| invalid(format!("invalid IPv6 address '{}'", self.data)))?;
                RData::AAAA(ip.into())
            }
            RecordKind::CNAME => RData::CNAME(rdata::CNAME(target()?)),
            RecordKind::PTR => RData::PTR(rdata::PTR(target()?)),
            RecordKind::NS => RData::NS(rdata::NS(target()?)),
        };

        debug_assert_eq!(rdata.record_type(), self.kind.record_type());
        Ok(Record::from_rdata(owner, self.ttl, rdata))
    }
}

/// A record as returned by a zone transfer.
///
/// Unlike [`ResourceRecord`] the type is open: listings show SOA, MX, TXT and
/// anything else the zone holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub name: String,
    pub ttl: u32,
    pub class: String,
    pub record_type: String,
    pub data: String,
}

impl From<&Record> for ZoneRecord {
    fn from(record: &Record) -> Self {
        Self {
            name: record.name().to_string(),
            ttl: record.ttl(),
            class: record.dns_class().to_string(),
            record_type: record.record_type().to_string(),
            data: record.data().map(ToString::to_string).unwrap_or_default(),
        }
    }
}

impl ZoneRecord {
    /// The `name||data||type` token a presentation layer uses to select this
    /// record for deletion.
    #[must_use]
    pub fn delete_token(&self) -> String {
        crate::triples::RecordTriple::new(&self.name, &self.record_type, &self.data).encode()
    }
}

/// Kind of change within an update transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAction {
    Add,
    Delete,
}

impl UpdateAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for UpdateAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
