// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Dynamic update (RFC 2136) transaction builder.
//!
//! A transaction targets exactly one zone and carries an ordered list of
//! additions and deletions. When a key name is supplied the key is resolved
//! at build time and travels with the message; the client signs the message
//! as a whole when it is sent, after assigning its id.
//!
//! # Example
//!
//! ```rust,no_run
//! use binder::bind9::keyring::Keyring;
//! use binder::bind9::types::{RecordKind, ResourceRecord};
//! use binder::bind9::update::UpdateBuilder;
//!
//! # fn example(keyring: &Keyring) -> Result<(), binder::dns_errors::DnsError> {
//! let message = UpdateBuilder::new("example.com")
//!     .add(ResourceRecord::new("host1.example.com", RecordKind::A, "10.1.1.5", 86400))
//!     .signed_with(Some("update-key"))
//!     .build(keyring)?;
//! assert!(message.is_signed());
//! # Ok(())
//! # }
//! ```

use hickory_client::client::Signer;
use hickory_client::op::{Message, MessageType, OpCode, Query};
use hickory_client::rr::{DNSClass, Name, RecordType};
use hickory_proto::serialize::binary::BinEncodable;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use super::keyring::Keyring;
use super::types::{ResourceRecord, UpdateAction};
use crate::dns_errors::{DnsError, RecordError};
use crate::names::{fqdn, is_in_zone};

/// Builder for one zone's update transaction.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    zone: String,
    changes: Vec<(UpdateAction, ResourceRecord)>,
    key_name: Option<String>,
}

impl UpdateBuilder {
    #[must_use]
    pub fn new(zone: &str) -> Self {
        Self {
            zone: zone.trim().to_string(),
            changes: Vec::new(),
            key_name: None,
        }
    }

    /// Queue an addition.
    #[must_use]
    pub fn add(self, record: ResourceRecord) -> Self {
        self.change(UpdateAction::Add, record)
    }

    /// Queue a deletion of exactly this record (name, type and data).
    #[must_use]
    pub fn delete(self, record: ResourceRecord) -> Self {
        self.change(UpdateAction::Delete, record)
    }

    #[must_use]
    pub fn change(mut self, action: UpdateAction, record: ResourceRecord) -> Self {
        self.changes.push((action, record));
        self
    }

    /// Sign with the named key, or leave unsigned with `None`.
    #[must_use]
    pub fn signed_with(mut self, key_name: Option<&str>) -> Self {
        self.key_name = key_name.map(str::to_string);
        self
    }

    /// Validate and encode the transaction.
    ///
    /// Only structural consistency is checked here: a non-empty zone, a
    /// non-empty change list and every record inside the zone. Record content
    /// is the caller's contract, although data that cannot be encoded at all
    /// still fails.
    ///
    /// # Errors
    ///
    /// - [`RecordError::InvalidTransaction`] for an empty zone or change list
    /// - [`RecordError::NotInZone`] for mixed-zone batches
    /// - [`KeyringError`] if the named key is missing or unusable
    /// - [`RecordError::InvalidRecordData`] if a record cannot be encoded
    pub fn build(self, keyring: &Keyring) -> Result<UpdateMessage, DnsError> {
        if self.zone.is_empty() || self.zone == "." {
            return Err(RecordError::InvalidTransaction {
                zone: self.zone,
                reason: "zone name is empty".to_string(),
            }
            .into());
        }
        let zone = fqdn(&self.zone);

        if self.changes.is_empty() {
            return Err(RecordError::InvalidTransaction {
                zone,
                reason: "no records to update".to_string(),
            }
            .into());
        }

        if let Some((_, stray)) = self
            .changes
            .iter()
            .find(|(_, record)| !is_in_zone(&record.name, &zone))
        {
            return Err(RecordError::NotInZone {
                name: stray.name.clone(),
                zone,
            }
            .into());
        }

        // Resolve the key before encoding anything
        let signer = self
            .key_name
            .as_deref()
            .map(|name| keyring.signer(name))
            .transpose()?;

        let zone_name = Name::from_str(&zone).map_err(|e| RecordError::InvalidTransaction {
            zone: zone.clone(),
            reason: format!("invalid zone name: {e}"),
        })?;

        let mut message = Message::new();
        message
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Update)
            .set_recursion_desired(false);

        // Zone section
        let mut zone_query = Query::query(zone_name, RecordType::SOA);
        zone_query.set_query_class(DNSClass::IN);
        message.add_query(zone_query);

        // Update section (shares the wire slot of the authority section)
        for (action, record) in &self.changes {
            let mut wire = record.to_wire()?;
            if *action == UpdateAction::Delete {
                // RFC 2136 2.5.4: delete an RR from an RRset
                wire.set_dns_class(DNSClass::NONE);
                wire.set_ttl(0);
            }
            message.add_name_server(wire);
        }

        // Catch unencodable data here rather than in the send task
        let encoded = message
            .to_bytes()
            .map_err(|e| RecordError::InvalidTransaction {
                zone: zone.clone(),
                reason: format!("failed to encode update: {e}"),
            })?;

        debug!(
            zone = %zone,
            changes = self.changes.len(),
            signed = signer.is_some(),
            bytes = encoded.len(),
            "Built DNS UPDATE transaction"
        );

        Ok(UpdateMessage {
            zone,
            changes: self.changes,
            key_name: self.key_name,
            message,
            signer: signer.map(|s| Arc::new(Signer::from(s))),
        })
    }
}

/// A validated update transaction, ready for transport.
#[derive(Clone)]
pub struct UpdateMessage {
    zone: String,
    changes: Vec<(UpdateAction, ResourceRecord)>,
    key_name: Option<String>,
    message: Message,
    signer: Option<Arc<Signer>>,
}

impl std::fmt::Debug for UpdateMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateMessage")
            .field("zone", &self.zone)
            .field("changes", &self.changes)
            .field("key_name", &self.key_name)
            .finish_non_exhaustive()
    }
}

impl UpdateMessage {

    /// Fully-qualified zone the transaction targets.
    #[must_use]
    pub fn zone(&self) -> &str {
        &self.zone
    }

    #[must_use]
    pub fn changes(&self) -> &[(UpdateAction, ResourceRecord)] {
        &self.changes
    }

    #[must_use]
    pub fn key_name(&self) -> Option<&str> {
        self.key_name.as_deref()
    }

    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.key_name.is_some()
    }

    /// The unsigned update message. The client sets its id at send time.
    #[must_use]
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Signer for the named key, if any.
    #[must_use]
    pub fn signer(&self) -> Option<Arc<Signer>> {
        self.signer.clone()
    }
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod update_tests;
