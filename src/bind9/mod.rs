// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! BIND9 protocol clients.
//!
//! Everything that talks to an authoritative server lives here:
//!
//! - TSIG keyring and key file parsing ([`keyring`])
//! - RFC 2136 dynamic update transactions ([`update`])
//! - TSIG-verified DNS-over-TCP client for updates and transfers ([`transport`])
//! - AXFR zone transfers ([`axfr`])
//! - Zone listing through the statistics channel ([`statistics`])
//!
//! Each server exposes three independent endpoints: updates, transfers and
//! statistics. A failure on one says nothing about the others.
//!
//! # Example
//!
//! ```rust,no_run
//! use binder::bind9::{AxfrClient, Keyring};
//! use binder::config::Server;
//!
//! # async fn example(keyring: &Keyring) -> anyhow::Result<()> {
//! let server = Server::new("ns1.example.com");
//! let signer = keyring.signer("transfer-key")?;
//! let transfer = AxfrClient::default()
//!     .transfer(&server, "example.com", Some(signer))
//!     .await?;
//! println!("{} records", transfer.len());
//! # Ok(())
//! # }
//! ```

pub mod axfr;
pub mod keyring;
pub mod statistics;
pub mod transport;
pub mod types;
pub mod update;

pub use axfr::{AxfrClient, ZoneTransfer};
pub use keyring::{create_tsig_signer, parse_key_file, Keyring};
pub use statistics::{StatisticsClient, ZoneListing, ZoneMetadata};
pub use transport::{TcpUpdateTransport, UpdateResponse, UpdateTransport};
pub use types::{RecordKind, ResourceRecord, UpdateAction, ZoneRecord};
pub use update::{UpdateBuilder, UpdateMessage};
