// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Binder - BIND9 Zone Management Engine
//!
//! Binder manages records on authoritative BIND9 servers over the standard
//! DNS wire protocols: TSIG-signed dynamic updates (RFC 2136) to change
//! records, AXFR zone transfers to list them, and the statistics channel to
//! list zones.
//!
//! ## Overview
//!
//! - Forward records (A, AAAA, CNAME) and reverse PTR records
//! - Forward/reverse pairing as two independent transactions
//! - Bulk deletes reported per record
//! - An error taxonomy that tells "the server said no" apart from
//!   "the server could not be reached" and "a key is needed"
//!
//! ## Modules
//!
//! - [`coordinator`] - The engine: [`coordinator::ZoneManager`]
//! - [`bind9`] - Keyring, update builder, transport, AXFR and statistics clients
//! - [`config`] - Server and key inventory
//! - [`dns_errors`] - Error taxonomy
//! - [`names`] - FQDN and reverse-name helpers
//! - [`triples`] - Parser for `name||data||type` delete selections
//! - [`query_history`] - Query log summaries
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use binder::config::Inventory;
//! use binder::coordinator::ZoneManager;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let inventory = Inventory::load(Path::new("/etc/binder/binder.yaml"))?;
//! let manager = ZoneManager::new(Arc::new(inventory));
//!
//! let listing = manager.list_zones("ns1.example.com").await?;
//! for zone in listing.names() {
//!     println!("{zone}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod bind9;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod dns_errors;
pub mod metrics;
pub mod names;
pub mod query_history;
pub mod triples;

#[cfg(test)]
mod test_support;
