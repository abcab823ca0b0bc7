// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone transfer (AXFR) client.
//!
//! A transfer is a single query answered by a stream of messages over one TCP
//! connection, driven by hickory's [`ClientHandle::zone_transfer`]. The
//! stream opens and closes with the zone's SOA record; the closing SOA is not
//! repeated in the result. Records are only handed back once the closing SOA
//! has arrived, so callers never see a partial zone. A signed transfer has
//! every message of the stream verified against the key.
//!
//! Refusals are reported as [`TransferError::AuthenticationRequired`], whose
//! message hints at a missing default transfer key. Failing to reach the
//! endpoint at all is reported separately as [`TransferError::Unreachable`].

use futures::StreamExt;
use hickory_client::client::{ClientHandle, Signer};
use hickory_client::error::{ClientError, ClientErrorKind};
use hickory_client::op::ResponseCode;
use hickory_client::rr::{Name, Record, RecordType};
use hickory_proto::rr::dnssec::tsig::TSigner;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::transport::{connect, rcode_name, request_error};
use super::types::ZoneRecord;
use crate::config::{Server, Timeouts};
use crate::constants::MAX_AXFR_MESSAGES;
use crate::dns_errors::{TransferError, TransportError};
use crate::names::fqdn;

/// A completed zone transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTransfer {
    /// Fully-qualified zone name
    pub zone: String,
    /// Transfer endpoint the records came from
    pub server: String,
    /// Records in transfer order, starting with the SOA
    pub records: Vec<ZoneRecord>,
}

impl ZoneTransfer {
    /// The zone's serial number, taken from the opening SOA.
    #[must_use]
    pub fn serial(&self) -> Option<u32> {
        let soa = self.records.first().filter(|r| r.record_type == "SOA")?;
        // SOA presentation: mname rname serial refresh retry expire minimum
        soa.data.split_whitespace().nth(2)?.parse().ok()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Rcodes a server uses to turn away an unauthenticated or badly signed AXFR.
fn is_authentication_refusal(code: ResponseCode) -> bool {
    matches!(
        code,
        ResponseCode::Refused
            | ResponseCode::NotAuth
            | ResponseCode::BADKEY
            | ResponseCode::BADSIG
            | ResponseCode::BADTIME
    )
}

/// Client performing full zone transfers over TCP.
#[derive(Debug, Clone, Default)]
pub struct AxfrClient {
    timeouts: Timeouts,
}

impl AxfrClient {
    #[must_use]
    pub fn new(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }

    /// Transfer `zone` from the server's transfer endpoint, signing the
    /// query with `signer` when given.
    ///
    /// The whole transfer, first query to closing SOA, must finish within
    /// the transfer deadline.
    ///
    /// # Errors
    ///
    /// - [`TransferError::AuthenticationRequired`] if the server refuses the transfer
    /// - [`TransferError::Unreachable`] if the endpoint cannot be reached or stops answering
    /// - [`TransferError::TransferFailed`] for any other failure, including a
    ///   truncated stream or a response that fails TSIG verification
    pub async fn transfer(
        &self,
        server: &Server,
        zone: &str,
        signer: Option<TSigner>,
    ) -> Result<ZoneTransfer, TransferError> {
        let zone = fqdn(zone);
        let endpoint = server.transfer_endpoint();
        let signed = signer.is_some();
        let failed = |reason: String| TransferError::TransferFailed {
            zone: zone.clone(),
            server: endpoint.clone(),
            reason,
        };
        let unreachable = |source: TransportError| TransferError::Unreachable {
            zone: zone.clone(),
            server: endpoint.clone(),
            source,
        };

        let origin =
            Name::from_str(&zone).map_err(|e| failed(format!("invalid zone name: {e}")))?;
        let request_timeout = self.timeouts.transfer();
        let signer = signer.map(|s| Arc::new(Signer::from(s)));
        let mut client = connect(&endpoint, &self.timeouts, request_timeout, signer)
            .await
            .map_err(&unreachable)?;

        info!(zone = %zone, server = %endpoint, signed = signed, "Starting zone transfer");
        let mut stream = client.zone_transfer(origin, None);

        let mut records: Vec<ZoneRecord> = Vec::new();
        let mut messages = 0usize;
        loop {
            let response = match stream.next().await {
                Some(Ok(response)) => response,
                Some(Err(e)) => {
                    return Err(match stream_error(&endpoint, request_timeout, &e) {
                        StreamFailure::Transport(
                            source @ TransportError::UnverifiedResponse { .. },
                        ) => failed(source.to_string()),
                        StreamFailure::Transport(source) => unreachable(source),
                        StreamFailure::Protocol(reason) => {
                            failed(format!("{reason} after {} records", records.len()))
                        }
                    });
                }
                None => {
                    return Err(failed(format!(
                        "stream ended without a closing SOA after {} records",
                        records.len()
                    )));
                }
            };
            messages += 1;

            let code = response.response_code();
            if is_authentication_refusal(code) {
                warn!(
                    zone = %zone,
                    server = %endpoint,
                    rcode = %rcode_name(code),
                    signed = signed,
                    "Zone transfer refused"
                );
                return Err(TransferError::AuthenticationRequired {
                    zone,
                    server: endpoint,
                    rcode: rcode_name(code),
                });
            }
            if code != ResponseCode::NoError {
                return Err(failed(format!("server answered {}", rcode_name(code))));
            }

            if append_answers(&mut records, response.answers()).map_err(&failed)? {
                break;
            }

            if messages >= MAX_AXFR_MESSAGES {
                return Err(failed(format!(
                    "transfer exceeded {MAX_AXFR_MESSAGES} messages without a closing SOA"
                )));
            }
        }

        info!(
            zone = %zone,
            server = %endpoint,
            records = records.len(),
            messages = messages,
            "Zone transfer complete"
        );

        Ok(ZoneTransfer {
            zone,
            server: endpoint,
            records,
        })
    }
}

enum StreamFailure {
    /// Connection, deadline or signature failure
    Transport(TransportError),
    /// The stream was not a valid transfer
    Protocol(String),
}

fn stream_error(endpoint: &str, request_timeout: Duration, error: &ClientError) -> StreamFailure {
    match error.kind() {
        ClientErrorKind::Proto(proto) => {
            StreamFailure::Transport(request_error(endpoint, request_timeout, proto))
        }
        ClientErrorKind::Timeout => StreamFailure::Transport(TransportError::Timeout {
            endpoint: endpoint.to_string(),
            timeout_ms: u64::try_from(request_timeout.as_millis()).unwrap_or(u64::MAX),
        }),
        ClientErrorKind::Io(e) => StreamFailure::Transport(TransportError::Io {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }),
        _ => StreamFailure::Protocol(error.to_string()),
    }
}

/// Append one message's answers. Returns `true` once the closing SOA is seen.
fn append_answers(records: &mut Vec<ZoneRecord>, answers: &[Record]) -> Result<bool, String> {
    for record in answers {
        let is_soa = record.record_type() == RecordType::SOA;
        if records.is_empty() {
            if !is_soa {
                return Err(format!(
                    "transfer began with {} instead of SOA",
                    record.record_type()
                ));
            }
        } else if is_soa {
            debug!(records = records.len(), "Closing SOA received");
            return Ok(true);
        }
        records.push(ZoneRecord::from(record));
    }
    Ok(false)
}

#[cfg(test)]
#[path = "axfr_tests.rs"]
mod axfr_tests;
