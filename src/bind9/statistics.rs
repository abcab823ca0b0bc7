// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone directory client for the BIND9 statistics channel.
//!
//! BIND9 publishes its zone table on the statistics channel as JSON under
//! `/json/v1/zones`, grouped by view:
//!
//! ```json
//! { "views": { "_default": { "zones": [
//!     { "name": "example.com", "class": "IN", "serial": 2024010101, "type": "primary" }
//! ] } } }
//! ```
//!
//! The built-in `_bind` view (CHAOS zones such as `version.bind`) is skipped.
//! A failed listing never yields a partial mapping: callers get an empty
//! mapping together with the error.

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{endpoint, Server, Timeouts};
use crate::constants::{STATISTICS_BUILTIN_VIEW, STATISTICS_ZONES_PATH};
use crate::dns_errors::ZoneError;
use crate::names::fqdn;

/// What the statistics channel reports about one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneMetadata {
    pub view: String,
    pub class: String,
    /// `None` while the zone is not loaded
    pub serial: Option<u64>,
    /// `primary`, `secondary`, `forward`, ...
    pub zone_type: String,
}

/// Result of a zone listing: the mapping, plus the error if listing failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneListing {
    /// Fully-qualified zone name to metadata; empty when `error` is set
    pub zones: BTreeMap<String, ZoneMetadata>,
    pub error: Option<ZoneError>,
}

impl ZoneListing {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Zone names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.zones.keys().map(String::as_str).collect()
    }
}

/// HTTP client for a server's statistics endpoint.
#[derive(Debug, Clone)]
pub struct StatisticsClient {
    client: Arc<HttpClient>,
}

impl Default for StatisticsClient {
    fn default() -> Self {
        Self::new(&Timeouts::default())
    }
}

impl StatisticsClient {
    #[must_use]
    pub fn new(timeouts: &Timeouts) -> Self {
        let client = HttpClient::builder()
            .connect_timeout(timeouts.connect())
            .timeout(timeouts.read())
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build statistics HTTP client, using defaults");
                HttpClient::new()
            });
        Self {
            client: Arc::new(client),
        }
    }

    /// List the zones a server serves. Never fails: errors come back inside
    /// the listing, next to an empty mapping.
    pub async fn list_zones(&self, server: &Server) -> ZoneListing {
        match self.fetch_zones(server).await {
            Ok(zones) => ZoneListing { zones, error: None },
            Err(e) => {
                error!(server = %server.hostname, error = %e, "Zone listing failed");
                ZoneListing {
                    zones: BTreeMap::new(),
                    error: Some(e),
                }
            }
        }
    }

    /// Fetch and parse the zone table.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::ListingFailed`] carrying the HTTP client's error
    /// and its causes for network or status failures, and [`ZoneError::MalformedListing`]
    /// if the document is not the expected shape.
    pub async fn fetch_zones(
        &self,
        server: &Server,
    ) -> Result<BTreeMap<String, ZoneMetadata>, ZoneError> {
        let url = statistics_url(server)?;
        let listing_failed = |e: reqwest::Error| ZoneError::ListingFailed {
            endpoint: url.to_string(),
            reason: error_chain(&e),
        };

        debug!(url = %url, "Querying statistics channel");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(listing_failed)?;

        let document: Value = response.json().await.map_err(|e| ZoneError::MalformedListing {
            endpoint: url.to_string(),
            reason: error_chain(&e),
        })?;

        let zones = parse_zones(url.as_str(), &document)?;
        info!(url = %url, zones = zones.len(), "Listed zones");
        Ok(zones)
    }
}

/// An error's message followed by each of its causes, joined with `: `.
///
/// reqwest's own message only names the failing request; the refused
/// connection or DNS failure sits further down the source chain.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}

/// `http://<hostname>:<statistics_port>/json/v1/zones`
///
/// # Errors
///
/// Returns [`ZoneError::ListingFailed`] if the hostname does not form a valid URL.
pub fn statistics_url(server: &Server) -> Result<Url, ZoneError> {
    let raw = format!(
        "http://{}{STATISTICS_ZONES_PATH}",
        endpoint(&server.hostname, server.statistics_port)
    );
    Url::parse(&raw).map_err(|e| ZoneError::ListingFailed {
        endpoint: raw.clone(),
        reason: e.to_string(),
    })
}

/// Parse the statistics zone document into a zone-name keyed mapping.
///
/// A zone present in several views keeps the entry of the first view in
/// name order.
///
/// # Errors
///
/// Returns [`ZoneError::MalformedListing`] if `views` is missing or a view's
/// `zones` is not a list.
pub fn parse_zones(
    endpoint: &str,
    document: &Value,
) -> Result<BTreeMap<String, ZoneMetadata>, ZoneError> {
    let malformed = |reason: &str| ZoneError::MalformedListing {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };

    let views = document
        .get("views")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("missing 'views' object"))?;

    let mut zones = BTreeMap::new();
    for (view, body) in views {
        if view == STATISTICS_BUILTIN_VIEW {
            continue;
        }
        let Some(entries) = body.get("zones") else {
            continue;
        };
        let entries = entries
            .as_array()
            .ok_or_else(|| malformed(&format!("'zones' of view '{view}' is not a list")))?;

        for entry in entries {
            let Some(name) = entry.get("name").and_then(Value::as_str) else {
                warn!(view = %view, "Skipping zone entry without a name");
                continue;
            };
            let text = |field: &str| {
                entry
                    .get(field)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            zones.entry(fqdn(name)).or_insert_with(|| ZoneMetadata {
                view: view.clone(),
                class: text("class"),
                serial: entry.get("serial").and_then(Value::as_u64),
                zone_type: text("type"),
            });
        }
    }
    Ok(zones)
}

#[cfg(test)]
#[path = "statistics_tests.rs"]
mod statistics_tests;
