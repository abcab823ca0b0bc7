// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record coordination across forward and reverse zones.
//!
//! [`ZoneManager`] is the engine's entry point. It resolves the server and
//! key for a request, builds one update transaction per record, submits them
//! and reports one [`OperationResult`] per transaction in request order.
//!
//! Forward and reverse records live in different zones, so an A record with
//! its PTR is two independent transactions. Neither undoes the other when it
//! fails.
//!
//! Each submission runs as its own task. If the caller goes away mid-request
//! the transactions already sent still run to completion and their outcome
//! is logged, since the server may have applied them.
//!
//! # Example
//!
//! ```rust,no_run
//! use binder::bind9::RecordKind;
//! use binder::config::Inventory;
//! use binder::coordinator::{AddRecordRequest, ZoneManager};
//! use std::sync::Arc;
//!
//! # async fn example(inventory: Inventory) -> Result<(), binder::dns_errors::DnsError> {
//! let manager = ZoneManager::new(Arc::new(inventory));
//! let results = manager
//!     .add_record(&AddRecordRequest {
//!         server: "ns1.example.com".to_string(),
//!         zone: "example.com".to_string(),
//!         record_name: "host1".to_string(),
//!         kind: RecordKind::A,
//!         data: "10.1.1.5".to_string(),
//!         ttl: 86400,
//!         key_name: Some("update-key".to_string()),
//!         create_reverse: true,
//!     })
//!     .await?;
//! for result in &results {
//!     println!("{}", result.description());
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bind9::axfr::{AxfrClient, ZoneTransfer};
use crate::bind9::keyring::Keyring;
use crate::bind9::statistics::{StatisticsClient, ZoneListing};
use crate::bind9::transport::{TcpUpdateTransport, UpdateTransport};
use crate::bind9::types::{RecordKind, ResourceRecord, UpdateAction};
use crate::bind9::update::{UpdateBuilder, UpdateMessage};
use crate::config::{Inventory, Server};
use crate::constants::UNKNOWN_REVERSE_ZONE;
use crate::dns_errors::{DnsError, RecordError, TransferError, TransportError};
use crate::metrics;
use crate::names::{fqdn, is_reverse_zone, owner_name};
use crate::triples::RecordTriple;

/// Add an A, AAAA or PTR record, optionally with its reverse PTR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRecordRequest {
    pub server: String,
    pub zone: String,
    /// Relative label, `@`/empty for the apex, or an absolute name
    pub record_name: String,
    pub kind: RecordKind,
    pub data: String,
    pub ttl: u32,
    pub key_name: Option<String>,
    /// Also add the PTR for an A/AAAA record. Ignored in reverse zones.
    pub create_reverse: bool,
}

/// Add a CNAME binding `record_name` to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddCnameRequest {
    pub server: String,
    pub zone: String,
    pub record_name: String,
    pub target: String,
    pub ttl: u32,
    pub key_name: Option<String>,
}

/// How a single transaction ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The server answered NOERROR
    Applied { rcode: String },
    /// The transaction was not built, not delivered, or rejected
    Failed(DnsError),
}

/// The result of one transaction, attributed to the record it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub action: UpdateAction,
    pub zone: String,
    pub record: RecordTriple,
    pub outcome: Outcome,
}

impl OperationResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Applied { .. })
    }

    /// Human-readable summary, safe to display.
    #[must_use]
    pub fn description(&self) -> String {
        let record = format!(
            "{} {} {}",
            self.record.name, self.record.record_type, self.record.data
        );
        match (&self.outcome, self.action) {
            (Outcome::Applied { .. }, UpdateAction::Add) => {
                format!("Added {record} to zone {}", self.zone)
            }
            (Outcome::Applied { .. }, UpdateAction::Delete) => {
                format!("Deleted {record} from zone {}", self.zone)
            }
            (Outcome::Failed(e), UpdateAction::Add) => {
                format!("Failed to add {record} to zone {}: {e}", self.zone)
            }
            (Outcome::Failed(e), UpdateAction::Delete) => {
                format!("Failed to delete {record} from zone {}: {e}", self.zone)
            }
        }
    }

    /// The error, if the transaction failed.
    #[must_use]
    pub fn error(&self) -> Option<&DnsError> {
        match &self.outcome {
            Outcome::Applied { .. } => None,
            Outcome::Failed(e) => Some(e),
        }
    }
}

/// A transaction that has either been handed to a task or failed before sending.
struct Pending {
    action: UpdateAction,
    zone: String,
    record: RecordTriple,
    task: Result<JoinHandle<Outcome>, DnsError>,
}

impl Pending {
    async fn finish(self) -> OperationResult {
        let outcome = match self.task {
            Ok(handle) => handle.await.unwrap_or_else(|e| {
                error!(zone = %self.zone, name = %self.record.name, error = %e, "Update task failed");
                Outcome::Failed(DnsError::Transport(TransportError::Io {
                    endpoint: String::new(),
                    reason: format!("update task failed: {e}"),
                }))
            }),
            Err(e) => Outcome::Failed(e),
        };
        OperationResult {
            action: self.action,
            zone: self.zone,
            record: self.record,
            outcome,
        }
    }
}

/// The zone management engine.
///
/// Holds a read-only inventory snapshot and the protocol clients. Cheap to
/// clone and safe to share between concurrent requests.
#[derive(Clone)]
pub struct ZoneManager {
    inventory: Arc<Inventory>,
    keyring: Keyring,
    transport: Arc<dyn UpdateTransport>,
    axfr: AxfrClient,
    statistics: StatisticsClient,
}

impl std::fmt::Debug for ZoneManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneManager")
            .field("servers", &self.inventory.servers.len())
            .field("keyring", &self.keyring)
            .finish_non_exhaustive()
    }
}

impl ZoneManager {
    /// Engine sending updates over TCP with the inventory's timeouts.
    #[must_use]
    pub fn new(inventory: Arc<Inventory>) -> Self {
        let transport = Arc::new(TcpUpdateTransport::new(inventory.timeouts));
        Self::with_transport(inventory, transport)
    }

    /// Engine using a caller-supplied update transport.
    #[must_use]
    pub fn with_transport(inventory: Arc<Inventory>, transport: Arc<dyn UpdateTransport>) -> Self {
        Self {
            keyring: Keyring::new(&inventory.keys),
            axfr: AxfrClient::new(inventory.timeouts),
            statistics: StatisticsClient::new(&inventory.timeouts),
            transport,
            inventory,
        }
    }

    #[must_use]
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    #[must_use]
    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    /// Configured servers, ordered by hostname.
    #[must_use]
    pub fn servers(&self) -> Vec<&Server> {
        self.inventory.servers_sorted()
    }

    /// Look up a configured server.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::UnknownServer`] if the hostname is not in the inventory.
    pub fn server(&self, hostname: &str) -> Result<&Server, DnsError> {
        self.inventory
            .server(hostname)
            .ok_or_else(|| DnsError::UnknownServer(hostname.to_string()))
    }

    /// Add a record, plus its PTR when `create_reverse` is set for an A or
    /// AAAA record in a forward zone.
    ///
    /// Returns one result per submitted transaction, forward first. A failed
    /// transaction is reported in its result, not as an `Err`.
    ///
    /// # Errors
    ///
    /// - [`DnsError::UnknownServer`] for an unconfigured server
    /// - [`DnsError::Keyring`] for a missing or unusable key, before any network call
    /// - [`RecordError::InvalidRecordData`] for a type the add path does not accept
    pub async fn add_record(
        &self,
        request: &AddRecordRequest,
    ) -> Result<Vec<OperationResult>, DnsError> {
        let server = self.server(&request.server)?;
        let key_name = self.check_key(request.key_name.as_deref())?;

        let zone = fqdn(&request.zone);
        let name = owner_name(&request.record_name, &zone);
        if !request.kind.is_writable() {
            return Err(RecordError::InvalidRecordData {
                name,
                reason: format!("{} records cannot be added", request.kind),
            }
            .into());
        }

        let forward = ResourceRecord::new(&name, request.kind, &request.data, request.ttl);
        let reverse = (request.create_reverse
            && matches!(request.kind, RecordKind::A | RecordKind::AAAA)
            && !is_reverse_zone(&zone))
        .then(|| self.reverse_record(&forward));

        debug!(
            zone = %zone,
            name = %forward.name,
            kind = %forward.kind,
            reverse = reverse.is_some(),
            "Resolved add request"
        );

        let mut pending = vec![self.submit(server, &zone, UpdateAction::Add, forward, key_name)];
        if let Some(reverse) = reverse {
            pending.push(match reverse {
                Ok((reverse_zone, ptr)) => {
                    self.submit(server, &reverse_zone, UpdateAction::Add, ptr, key_name)
                }
                Err(failed) => failed,
            });
        }

        Ok(Self::collect(pending).await)
    }

    /// Add a CNAME record. There is no reverse counterpart.
    ///
    /// # Errors
    ///
    /// - [`DnsError::UnknownServer`] for an unconfigured server
    /// - [`DnsError::Keyring`] for a missing or unusable key, before any network call
    pub async fn add_cname_record(
        &self,
        request: &AddCnameRequest,
    ) -> Result<OperationResult, DnsError> {
        let server = self.server(&request.server)?;
        let key_name = self.check_key(request.key_name.as_deref())?;

        let zone = fqdn(&request.zone);
        let alias = ResourceRecord::new(
            &owner_name(&request.record_name, &zone),
            RecordKind::CNAME,
            &request.target,
            request.ttl,
        );

        Ok(self
            .submit(server, &zone, UpdateAction::Add, alias, key_name)
            .finish()
            .await)
    }

    /// Delete records, one transaction per triple.
    ///
    /// The result list has one entry per input triple, in input order. A
    /// triple that cannot be turned into a record (unsupported type, name
    /// outside the zone) fails on its own without affecting the others.
    ///
    /// # Errors
    ///
    /// - [`DnsError::UnknownServer`] for an unconfigured server
    /// - [`DnsError::Keyring`] for a missing or unusable key, before any network call
    pub async fn delete_records(
        &self,
        server: &str,
        zone: &str,
        triples: &[RecordTriple],
        key_name: Option<&str>,
    ) -> Result<Vec<OperationResult>, DnsError> {
        let server = self.server(server)?;
        let key_name = self.check_key(key_name)?;
        let zone = fqdn(zone);

        info!(zone = %zone, server = %server.hostname, count = triples.len(), "Deleting records");

        let pending = triples
            .iter()
            .map(|triple| match RecordKind::from_str(&triple.record_type) {
                Ok(kind) => {
                    let record =
                        ResourceRecord::new(&owner_name(&triple.name, &zone), kind, &triple.data, 0);
                    self.submit(server, &zone, UpdateAction::Delete, record, key_name)
                }
                Err(reason) => Pending {
                    action: UpdateAction::Delete,
                    zone: zone.clone(),
                    record: triple.clone(),
                    task: Err(RecordError::InvalidRecordData {
                        name: triple.name.clone(),
                        reason,
                    }
                    .into()),
                },
            })
            .collect();

        Ok(Self::collect(pending).await)
    }

    /// List the zones a server serves.
    ///
    /// A failed listing is not an `Err`: the listing carries the error next
    /// to an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::UnknownServer`] for an unconfigured server.
    pub async fn list_zones(&self, server: &str) -> Result<ZoneListing, DnsError> {
        let server = self.server(server)?;
        let listing = self.statistics.list_zones(server).await;
        metrics::record_listing(listing.is_ok());
        Ok(listing)
    }

    /// Transfer a zone's records. Without an explicit key the server's
    /// default transfer key is used, if it has one.
    ///
    /// # Errors
    ///
    /// - [`DnsError::UnknownServer`] for an unconfigured server
    /// - [`DnsError::Keyring`] for a missing or unusable key, before any network call
    /// - [`DnsError::Transfer`] if the transfer fails or is refused
    pub async fn list_zone_records(
        &self,
        server: &str,
        zone: &str,
        key_name: Option<&str>,
    ) -> Result<ZoneTransfer, DnsError> {
        let server = self.server(server)?;
        let key_name = key_name.or(server.default_transfer_key.as_deref());
        let signer = key_name.map(|name| self.keyring.signer(name)).transpose()?;

        let result = self.axfr.transfer(server, zone, signer).await;
        metrics::record_transfer(match &result {
            Ok(_) => "success",
            Err(TransferError::AuthenticationRequired { .. }) => "auth_required",
            Err(TransferError::Unreachable { .. }) => "unreachable",
            Err(TransferError::TransferFailed { .. }) => "failure",
        });
        result.map_err(|e| {
            warn!(zone = %zone, server = %server.hostname, key = key_name.unwrap_or("-"), error = %e, "Zone transfer failed");
            e.into()
        })
    }

    /// Addresses a server's hostname resolves to. Resolution failures are
    /// logged and yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::UnknownServer`] for an unconfigured server.
    pub async fn resolve_addresses(&self, server: &str) -> Result<Vec<IpAddr>, DnsError> {
        let server = self.server(server)?;
        match tokio::net::lookup_host((server.hostname.as_str(), server.dns_port)).await {
            Ok(addresses) => Ok(addresses
                .map(|addr| addr.ip())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()),
            Err(e) => {
                warn!(server = %server.hostname, error = %e, "Failed to resolve server address");
                Ok(Vec::new())
            }
        }
    }

    /// Validate the key up front so a bad key costs no network calls.
    fn check_key<'a>(&self, key_name: Option<&'a str>) -> Result<Option<&'a str>, DnsError> {
        if let Some(name) = key_name {
            self.keyring.signer(name)?;
        }
        Ok(key_name)
    }

    /// Derive the PTR for a forward address record.
    ///
    /// The address must belong to the record's family: IPv4 for A, IPv6 for
    /// AAAA. Otherwise the forward record cannot exist either, and the PTR
    /// fails without being sent.
    fn reverse_record(&self, forward: &ResourceRecord) -> Result<(String, ResourceRecord), Pending> {
        let Ok(address) = IpAddr::from_str(&forward.data) else {
            return Err(Self::reverse_failure(
                UNKNOWN_REVERSE_ZONE.to_string(),
                &forward.data,
                forward,
                format!("cannot derive a reverse name from '{}'", forward.data),
            ));
        };

        let mapping = self.inventory.reverse.mapping(address);
        let family = match forward.kind {
            RecordKind::AAAA => "IPv6",
            _ => "IPv4",
        };
        if matches!(
            (forward.kind, address),
            (RecordKind::A, IpAddr::V6(_)) | (RecordKind::AAAA, IpAddr::V4(_))
        ) {
            return Err(Self::reverse_failure(
                mapping.zone,
                &mapping.ptr_name,
                forward,
                format!(
                    "'{}' is not an {family} address, so no {} record can point at it",
                    forward.data, forward.kind
                ),
            ));
        }

        let ptr = ResourceRecord::new(
            &mapping.ptr_name,
            RecordKind::PTR,
            &forward.name,
            forward.ttl,
        );
        Ok((mapping.zone, ptr))
    }

    fn reverse_failure(
        zone: String,
        ptr_name: &str,
        forward: &ResourceRecord,
        reason: String,
    ) -> Pending {
        warn!(zone = %zone, name = %ptr_name, reason = %reason, "Reverse record not sent");
        Pending {
            action: UpdateAction::Add,
            zone,
            record: RecordTriple::new(ptr_name, RecordKind::PTR.as_str(), &forward.name),
            task: Err(RecordError::InvalidRecordData {
                name: ptr_name.to_string(),
                reason,
            }
            .into()),
        }
    }

    /// Build one transaction and hand it to its own task.
    fn submit(
        &self,
        server: &Server,
        zone: &str,
        action: UpdateAction,
        record: ResourceRecord,
        key_name: Option<&str>,
    ) -> Pending {
        let identity = RecordTriple::new(&record.name, record.kind.as_str(), &record.data);
        let built = UpdateBuilder::new(zone)
            .change(action, record)
            .signed_with(key_name)
            .build(&self.keyring);

        let task = built.map(|message| {
            let transport = Arc::clone(&self.transport);
            let server = server.clone();
            tokio::spawn(async move { send(transport.as_ref(), &server, action, &message).await })
        });
        if let Err(e) = &task {
            warn!(zone = %zone, name = %identity.name, error = %e, "Update not sent");
        }

        Pending {
            action,
            zone: fqdn(zone),
            record: identity,
            task,
        }
    }

    async fn collect(pending: Vec<Pending>) -> Vec<OperationResult> {
        let mut results = Vec::with_capacity(pending.len());
        for item in pending {
            results.push(item.finish().await);
        }
        results
    }
}

/// Submit one transaction and classify the answer.
async fn send(
    transport: &dyn UpdateTransport,
    server: &Server,
    action: UpdateAction,
    message: &UpdateMessage,
) -> Outcome {
    let Some((_, record)) = message.changes().first() else {
        return Outcome::Failed(
            RecordError::InvalidTransaction {
                zone: message.zone().to_string(),
                reason: "no records to update".to_string(),
            }
            .into(),
        );
    };

    let started = Instant::now();
    let response = transport.submit(server, message).await;
    let elapsed = started.elapsed();

    let outcome = match response {
        Ok(response) if response.is_success() => Outcome::Applied {
            rcode: response.rcode_name(),
        },
        Ok(response) => Outcome::Failed(
            RecordError::UpdateRejected {
                name: record.name.clone(),
                zone: message.zone().to_string(),
                server: server.update_endpoint(),
                rcode: response.rcode_name(),
            }
            .into(),
        ),
        Err(e) => Outcome::Failed(e.into()),
    };

    metrics::record_update(
        action.as_str(),
        matches!(outcome, Outcome::Applied { .. }),
        elapsed,
    );
    match &outcome {
        Outcome::Applied { rcode } => info!(
            action = %action,
            zone = %message.zone(),
            name = %record.name,
            kind = %record.kind,
            data = %record.data,
            rcode = %rcode,
            elapsed_ms = elapsed.as_millis(),
            "DNS UPDATE applied"
        ),
        Outcome::Failed(e) => error!(
            action = %action,
            zone = %message.zone(),
            name = %record.name,
            kind = %record.kind,
            data = %record.data,
            error = %e,
            "DNS UPDATE failed"
        ),
    }
    outcome
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod coordinator_tests;
