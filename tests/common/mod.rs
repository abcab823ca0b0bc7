// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common test utilities for integration tests: an in-process authoritative
//! server that applies dynamic updates and serves zone transfers. Answers to
//! signed requests are signed with the same key, as BIND does.

#![allow(dead_code)]

use binder::bind9::create_tsig_signer;
use binder::config::{KeyConfig, TsigAlgorithm};
use chrono::Utc;
use hickory_client::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_client::rr::{rdata, DNSClass, Name, RData, Record, RecordType};
use hickory_proto::rr::dnssec::rdata::tsig::{make_tsig_record, message_tbs, TSIG};
use hickory_proto::rr::dnssec::rdata::DNSSECRData;
use hickory_proto::serialize::binary::BinEncodable;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const TEST_SECRET: &str = "dGVzdHNlY3JldHRlc3RzZWNyZXQ=";

/// Zone contents held by the fake server.
#[derive(Default)]
pub struct FakeAuthority {
    zones: Vec<Name>,
    records: Mutex<Vec<Record>>,
    require_tsig: bool,
    updates: Mutex<usize>,
}

impl FakeAuthority {
    pub fn new(zones: &[&str], require_tsig: bool) -> Self {
        Self {
            zones: zones.iter().map(|z| Name::from_str(z).unwrap()).collect(),
            require_tsig,
            ..Self::default()
        }
    }

    /// Records currently held, as `(name, type, data)`.
    pub fn contents(&self) -> Vec<(String, String, String)> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| {
                (
                    r.name().to_string(),
                    r.record_type().to_string(),
                    r.data().map(ToString::to_string).unwrap_or_default(),
                )
            })
            .collect()
    }

    pub fn update_count(&self) -> usize {
        *self.updates.lock().unwrap()
    }

    fn handle(&self, request: &Message) -> Vec<Message> {
        let mut response = Message::new();
        response
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code());
        response.add_queries(request.queries().to_vec());

        let Some(zone) = request
            .queries()
            .first()
            .map(|q| q.name().clone())
            .filter(|name| self.zones.contains(name))
        else {
            response.set_response_code(ResponseCode::NotAuth);
            return vec![response];
        };

        if self.require_tsig && request.signature().is_empty() {
            response.set_response_code(ResponseCode::Refused);
            return vec![response];
        }

        match request.op_code() {
            OpCode::Update => {
                *self.updates.lock().unwrap() += 1;
                let mut records = self.records.lock().unwrap();
                for change in request.name_servers() {
                    if !zone.zone_of(change.name()) {
                        response.set_response_code(ResponseCode::NotZone);
                        return vec![response];
                    }
                    let same = |r: &Record| {
                        r.name() == change.name()
                            && r.record_type() == change.record_type()
                            && r.data() == change.data()
                    };
                    if change.dns_class() == DNSClass::NONE {
                        records.retain(|r| !same(r));
                    } else if !records.iter().any(same) {
                        records.push(change.clone());
                    }
                }
                response.set_response_code(ResponseCode::NoError);
                vec![response]
            }
            _ if request.queries()[0].query_type() == RecordType::AXFR => {
                response.set_response_code(ResponseCode::NoError);
                response.add_answer(soa(&zone));
                for record in self.records.lock().unwrap().iter() {
                    if zone.zone_of(record.name()) {
                        response.add_answer(record.clone());
                    }
                }
                response.add_answer(soa(&zone));
                vec![response]
            }
            _ => {
                response.set_response_code(ResponseCode::NotImp);
                vec![response]
            }
        }
    }
}

fn soa(zone: &Name) -> Record {
    let soa = rdata::SOA::new(
        Name::from_str("ns1.example.com.").unwrap(),
        Name::from_str("hostmaster.example.com.").unwrap(),
        1,
        3600,
        600,
        604_800,
        300,
    );
    Record::from_rdata(zone.clone(), 3600, RData::SOA(soa))
}

/// Sign a single-message answer with the key `request` was signed with.
fn sign_answer(request: &Message, mut responses: Vec<Message>) -> Vec<Message> {
    let Some(tsig) = request.signature().first() else {
        return responses;
    };
    let Some(RData::DNSSEC(DNSSECRData::TSIG(request_tsig))) = tsig.data() else {
        return responses;
    };
    let Ok(signer) = create_tsig_signer(&KeyConfig {
        name: tsig.name().to_string(),
        algorithm: TsigAlgorithm::HmacSha256,
        secret: TEST_SECRET.to_string(),
    }) else {
        return responses;
    };

    let now = u64::try_from(Utc::now().timestamp()).unwrap();
    for response in &mut responses {
        let pre_tsig = TSIG::new(
            signer.algorithm().clone(),
            now,
            signer.fudge(),
            Vec::new(),
            response.id(),
            0,
            Vec::new(),
        );
        let tbs =
            message_tbs(Some(request_tsig.mac()), &*response, &pre_tsig, signer.signer_name())
                .unwrap();
        let mac = signer.sign(&tbs).unwrap();
        response.add_tsig(make_tsig_record(
            signer.signer_name().clone(),
            pre_tsig.set_mac(mac),
        ));
    }
    responses
}

/// Serve `authority` on an ephemeral local port.
pub async fn spawn_authority(authority: Arc<FakeAuthority>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let authority = Arc::clone(&authority);
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
                    for response in sign_answer(&request, authority.handle(&request)) {
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
