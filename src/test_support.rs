// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-process fake authoritative servers for unit tests.

use chrono::Utc;
use hickory_client::op::{Message, MessageType, ResponseCode};
use hickory_client::rr::{rdata, Name, RData, Record};
use hickory_proto::rr::dnssec::rdata::tsig::{make_tsig_record, message_tbs, TSIG};
use hickory_proto::rr::dnssec::rdata::DNSSECRData;
use hickory_proto::rr::dnssec::tsig::TSigner;
use hickory_proto::serialize::binary::BinEncodable;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::bind9::keyring::create_tsig_signer;
use crate::config::{KeyConfig, Server, Timeouts, TsigAlgorithm};

/// Base64 secret shared by every test key.
pub const TEST_SECRET: &str = "dGVzdHNlY3JldHRlc3RzZWNyZXQ=";

/// An hmac-sha256 key named `name` with [`TEST_SECRET`].
pub fn test_key(name: &str) -> KeyConfig {
    KeyConfig {
        name: name.to_string(),
        algorithm: TsigAlgorithm::HmacSha256,
        secret: TEST_SECRET.to_string(),
    }
}

/// Spawn a DNS-over-TCP server answering each request with `handler`'s messages.
pub async fn spawn_dns_server<F>(handler: F) -> SocketAddr
where
    F: Fn(Message) -> Vec<Message> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                loop {
                    let mut len = [0u8; 2];
                    if stream.read_exact(&mut len).await.is_err() {
                        break;
                    }
                    let mut buf = vec![0u8; usize::from(u16::from_be_bytes(len))];
                    if stream.read_exact(&mut buf).await.is_err() {
                        break;
                    }
                    let request = Message::from_vec(&buf).unwrap();
                    for response in handler(request) {
                        let bytes = response.to_bytes().unwrap();
                        let len = u16::try_from(bytes.len()).unwrap();
                        if stream.write_all(&len.to_be_bytes()).await.is_err()
                            || stream.write_all(&bytes).await.is_err()
                        {
                            return;
                        }
                    }
                }
            });
        }
    });

    addr
}

/// Spawn a server that accepts connections and never answers.
pub async fn spawn_silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn refused_endpoint() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Response skeleton echoing the request's id, opcode and question.
pub fn response_to(request: &Message, rcode: ResponseCode) -> Message {
    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_response_code(rcode);
    response.add_queries(request.queries().to_vec());
    response
}

/// SOA record for `zone` with the given serial.
pub fn soa_record(zone: &str, serial: u32) -> Record {
    let origin = Name::from_str(zone).unwrap();
    let soa = rdata::SOA::new(
        Name::from_str(&format!("ns1.{zone}")).unwrap(),
        Name::from_str(&format!("hostmaster.{zone}")).unwrap(),
        serial,
        3600,
        600,
        604_800,
        300,
    );
    Record::from_rdata(origin, 3600, RData::SOA(soa))
}

/// A record with a one hour TTL.
pub fn a_record(name: &str, address: &str) -> Record {
    let ip = Ipv4Addr::from_str(address).unwrap();
    Record::from_rdata(Name::from_str(name).unwrap(), 3600, RData::A(ip.into()))
}

/// Inventory entry whose every endpoint points at `addr`.
pub fn server_at(addr: SocketAddr) -> Server {
    Server {
        hostname: addr.ip().to_string(),
        dns_port: addr.port(),
        transfer_port: addr.port(),
        statistics_port: addr.port(),
        default_transfer_key: None,
    }
}

/// Short deadlines so failure tests finish quickly.
pub fn fast_timeouts() -> Timeouts {
    Timeouts {
        connect_timeout_ms: 1_000,
        read_timeout_ms: 300,
        transfer_timeout_ms: 500,
    }
}

/// Signer for the key `request` was signed with, assuming [`TEST_SECRET`].
pub fn request_signer(request: &Message) -> Option<TSigner> {
    let tsig = request.signature().first()?;
    create_tsig_signer(&test_key(&tsig.name().to_string())).ok()
}

fn request_mac(request: &Message) -> Vec<u8> {
    match request.signature().first().and_then(|tsig| tsig.data()) {
        Some(RData::DNSSEC(DNSSECRData::TSIG(tsig))) => tsig.mac().to_vec(),
        _ => Vec::new(),
    }
}

/// TSIG-sign a response stream to `request`.
///
/// The first message's MAC covers the request MAC and the full TSIG
/// variables; each later message covers the previous MAC and timers only.
pub fn sign_responses(request: &Message, responses: Vec<Message>, signer: &TSigner) -> Vec<Message> {
    let now = u64::try_from(Utc::now().timestamp()).unwrap();
    let mut previous = request_mac(request);

    responses
        .into_iter()
        .enumerate()
        .map(|(index, mut response)| {
            let pre_tsig = TSIG::new(
                signer.algorithm().clone(),
                now,
                signer.fudge(),
                Vec::new(),
                response.id(),
                0,
                Vec::new(),
            );
            let tbs = if index == 0 {
                message_tbs(Some(previous.as_slice()), &response, &pre_tsig, signer.signer_name()).unwrap()
            } else {
                let mut tbs = Vec::new();
                tbs.extend_from_slice(&u16::try_from(previous.len()).unwrap().to_be_bytes());
                tbs.extend_from_slice(&previous);
                tbs.extend_from_slice(&response.to_bytes().unwrap());
                tbs.extend_from_slice(&u16::try_from(now >> 32).unwrap().to_be_bytes());
                tbs.extend_from_slice(&u32::try_from(now & 0xffff_ffff).unwrap().to_be_bytes());
                tbs.extend_from_slice(&signer.fudge().to_be_bytes());
                tbs
            };
            let mac = signer.sign(&tbs).unwrap();
            previous.clone_from(&mac);
            response.add_tsig(make_tsig_record(
                signer.signer_name().clone(),
                pre_tsig.set_mac(mac),
            ));
            response
        })
        .collect()
}

/// Sign `responses` when `request` was signed, as a TSIG-aware server does.
pub fn answer(request: &Message, responses: Vec<Message>) -> Vec<Message> {
    match request_signer(request) {
        Some(signer) => sign_responses(request, responses, &signer),
        None => responses,
    }
}
