// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS-over-TCP transport for update transactions and zone transfers.
//!
//! Both paths run on hickory's [`AsyncClient`] over a [`TcpClientStream`].
//! The client assigns message ids, signs requests when it holds a TSIG
//! signer and verifies the signature of every response to a signed request.
//! A response that fails verification is never treated as the server's
//! verdict.
//!
//! Every connect and request is bounded by a deadline so a hung
//! authoritative server cannot hang the caller. Nothing here retries.

use async_trait::async_trait;
use hickory_client::client::{AsyncClient, Signer};
use hickory_client::op::{MessageType, OpCode, ResponseCode};
use hickory_client::tcp::TcpClientStream;
use hickory_proto::error::{ProtoError, ProtoErrorKind};
use hickory_proto::iocompat::AsyncIoTokioAsStd;
use hickory_proto::xfer::{DnsHandle, FirstAnswer};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream as TokioTcpStream;
use tracing::{debug, info, warn};

use super::update::UpdateMessage;
use crate::config::{Server, Timeouts};
use crate::dns_errors::TransportError;

/// Conventional upper-case name of a response code, e.g. `NOERROR`, `NOTAUTH`.
#[must_use]
pub fn rcode_name(code: ResponseCode) -> String {
    match code {
        ResponseCode::NoError => "NOERROR".to_string(),
        ResponseCode::FormErr => "FORMERR".to_string(),
        ResponseCode::ServFail => "SERVFAIL".to_string(),
        ResponseCode::NXDomain => "NXDOMAIN".to_string(),
        ResponseCode::NotImp => "NOTIMP".to_string(),
        ResponseCode::Refused => "REFUSED".to_string(),
        ResponseCode::YXDomain => "YXDOMAIN".to_string(),
        ResponseCode::YXRRSet => "YXRRSET".to_string(),
        ResponseCode::NXRRSet => "NXRRSET".to_string(),
        ResponseCode::NotAuth => "NOTAUTH".to_string(),
        ResponseCode::NotZone => "NOTZONE".to_string(),
        ResponseCode::BADKEY => "BADKEY".to_string(),
        ResponseCode::BADTIME => "BADTIME".to_string(),
        other => format!("RCODE{}", u16::from(other)),
    }
}

/// Open a TCP client to `endpoint` (`host:port`).
///
/// `request_timeout` bounds each request from send to last response
/// message. With a `signer`, qualifying requests (updates, transfers) are
/// signed and their responses verified.
///
/// # Errors
///
/// Returns [`TransportError::ConnectionFailed`] if the host cannot be
/// resolved or the connection is refused, and [`TransportError::Timeout`] if
/// the connect deadline passes.
pub async fn connect(
    endpoint: &str,
    timeouts: &Timeouts,
    request_timeout: Duration,
    signer: Option<Arc<Signer>>,
) -> Result<AsyncClient, TransportError> {
    let address = resolve(endpoint, timeouts).await?;
    debug!(endpoint = %endpoint, address = %address, signed = signer.is_some(), "Connecting to DNS endpoint");

    let (stream, sender) = TcpClientStream::<AsyncIoTokioAsStd<TokioTcpStream>>::with_timeout(
        address,
        timeouts.connect(),
    );
    let (client, background) = AsyncClient::with_timeout(stream, sender, request_timeout, signer)
        .await
        .map_err(|e| match e.kind() {
            ProtoErrorKind::Timeout => TransportError::Timeout {
                endpoint: endpoint.to_string(),
                timeout_ms: timeouts.connect_timeout_ms,
            },
            _ => TransportError::ConnectionFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            },
        })?;

    // Drives the connection; ends when the client is dropped
    tokio::spawn(background);
    Ok(client)
}

async fn resolve(endpoint: &str, timeouts: &Timeouts) -> Result<SocketAddr, TransportError> {
    let lookup = tokio::time::timeout(timeouts.connect(), tokio::net::lookup_host(endpoint))
        .await
        .map_err(|_| TransportError::Timeout {
            endpoint: endpoint.to_string(),
            timeout_ms: timeouts.connect_timeout_ms,
        })?;

    lookup
        .map_err(|e| TransportError::ConnectionFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?
        .next()
        .ok_or_else(|| TransportError::ConnectionFailed {
            endpoint: endpoint.to_string(),
            reason: "host resolved to no addresses".to_string(),
        })
}

/// True when the client rejected a response because its TSIG did not verify.
fn is_signature_failure(error: &ProtoError) -> bool {
    matches!(error.kind(), ProtoErrorKind::TsigWrongKey)
        || error.to_string().to_ascii_lowercase().contains("tsig")
}

/// Classify a failure reported by the client after a request was sent.
pub(crate) fn request_error(
    endpoint: &str,
    request_timeout: Duration,
    error: &ProtoError,
) -> TransportError {
    if is_signature_failure(error) {
        return TransportError::UnverifiedResponse {
            endpoint: endpoint.to_string(),
            reason: error.to_string(),
        };
    }
    match error.kind() {
        ProtoErrorKind::Timeout => TransportError::Timeout {
            endpoint: endpoint.to_string(),
            timeout_ms: u64::try_from(request_timeout.as_millis()).unwrap_or(u64::MAX),
        },
        _ => TransportError::Io {
            endpoint: endpoint.to_string(),
            reason: error.to_string(),
        },
    }
}

/// Operation and result codes of an update response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResponse {
    pub op_code: OpCode,
    pub response_code: ResponseCode,
}

impl UpdateResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_code == ResponseCode::NoError
    }

    #[must_use]
    pub fn rcode_name(&self) -> String {
        rcode_name(self.response_code)
    }
}

/// Sends a built update transaction and reports the server's verdict.
///
/// Implementations attempt the transaction exactly once.
#[async_trait]
pub trait UpdateTransport: Send + Sync {
    /// Submit `message` to the server's update endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no trustworthy DNS-level answer could
    /// be obtained. A DNS-level rejection is an `Ok` response with a
    /// non-NOERROR code.
    async fn submit(
        &self,
        server: &Server,
        message: &UpdateMessage,
    ) -> Result<UpdateResponse, TransportError>;
}

/// [`UpdateTransport`] over TCP.
#[derive(Debug, Clone, Default)]
pub struct TcpUpdateTransport {
    timeouts: Timeouts,
}

impl TcpUpdateTransport {
    #[must_use]
    pub fn new(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }
}

#[async_trait]
impl UpdateTransport for TcpUpdateTransport {
    async fn submit(
        &self,
        server: &Server,
        message: &UpdateMessage,
    ) -> Result<UpdateResponse, TransportError> {
        let endpoint = server.update_endpoint();
        let request_timeout = self.timeouts.read();
        let client = connect(&endpoint, &self.timeouts, request_timeout, message.signer()).await?;

        info!(
            endpoint = %endpoint,
            zone = %message.zone(),
            changes = message.changes().len(),
            key = message.key_name().unwrap_or("-"),
            "Sending DNS UPDATE"
        );
        let response = client
            .send(message.message().clone())
            .first_answer()
            .await
            .map_err(|e| {
                let error = request_error(&endpoint, request_timeout, &e);
                warn!(endpoint = %endpoint, zone = %message.zone(), error = %error, "No usable DNS UPDATE response");
                error
            })?;

        if response.message_type() != MessageType::Response {
            return Err(TransportError::MalformedResponse {
                endpoint,
                reason: format!("expected a response, got {:?}", response.message_type()),
            });
        }

        let result = UpdateResponse {
            op_code: response.op_code(),
            response_code: response.response_code(),
        };
        debug!(
            endpoint = %endpoint,
            opcode = ?result.op_code,
            rcode = %result.rcode_name(),
            "Received DNS UPDATE response"
        );
        Ok(result)
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod transport_tests;
