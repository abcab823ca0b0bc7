// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for the DNS-over-TCP update transport.

#[cfg(test)]
mod tests {
    use crate::bind9::keyring::{create_tsig_signer, Keyring};
    use crate::bind9::transport::{rcode_name, TcpUpdateTransport, UpdateTransport};
    use crate::bind9::types::{RecordKind, ResourceRecord};
    use crate::bind9::update::{UpdateBuilder, UpdateMessage};
    use crate::dns_errors::{DnsError, TransportError};
    use crate::test_support::{
        answer, fast_timeouts, refused_endpoint, response_to, server_at, sign_responses,
        spawn_dns_server, spawn_silent_server, test_key,
    };
    use hickory_client::op::{OpCode, ResponseCode};

    fn build(key_name: Option<&str>, keyring: &Keyring) -> UpdateMessage {
        UpdateBuilder::new("example.com")
            .add(ResourceRecord::new(
                "host1.example.com",
                RecordKind::A,
                "10.1.1.5",
                300,
            ))
            .signed_with(key_name)
            .build(keyring)
            .unwrap()
    }

    fn message() -> UpdateMessage {
        build(None, &Keyring::default())
    }

    fn signed_message() -> UpdateMessage {
        build(Some("update-key"), &Keyring::new(&[test_key("update-key")]))
    }

    #[tokio::test]
    async fn test_submit_noerror() {
        let addr = spawn_dns_server(|request| vec![response_to(&request, ResponseCode::NoError)]).await;
        let transport = TcpUpdateTransport::new(fast_timeouts());

        let response = transport.submit(&server_at(addr), &message()).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.op_code, OpCode::Update);
        assert_eq!(response.rcode_name(), "NOERROR");
    }

    #[tokio::test]
    async fn test_submit_refused_is_dns_level_answer() {
        let addr = spawn_dns_server(|request| vec![response_to(&request, ResponseCode::Refused)]).await;
        let transport = TcpUpdateTransport::new(fast_timeouts());

        let response = transport.submit(&server_at(addr), &message()).await.unwrap();

        assert!(!response.is_success());
        assert_eq!(response.rcode_name(), "REFUSED");
    }

    #[tokio::test]
    async fn test_submit_connection_refused() {
        let addr = refused_endpoint().await;
        let transport = TcpUpdateTransport::new(fast_timeouts());

        let err = transport.submit(&server_at(addr), &message()).await.unwrap_err();

        assert!(matches!(err, TransportError::ConnectionFailed { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_submit_times_out_on_silent_server() {
        let addr = spawn_silent_server().await;
        let transport = TcpUpdateTransport::new(fast_timeouts());

        let err = transport.submit(&server_at(addr), &message()).await.unwrap_err();

        assert!(matches!(err, TransportError::Timeout { timeout_ms: 300, .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_submit_signed_accepts_signed_answer() {
        let addr = spawn_dns_server(|request| {
            assert_eq!(request.signature().len(), 1, "update must carry a TSIG");
            answer(&request, vec![response_to(&request, ResponseCode::NoError)])
        })
        .await;
        let transport = TcpUpdateTransport::new(fast_timeouts());

        let response = transport
            .submit(&server_at(addr), &signed_message())
            .await
            .unwrap();

        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_submit_signed_rejects_unsigned_answer() {
        let addr =
            spawn_dns_server(|request| vec![response_to(&request, ResponseCode::NoError)]).await;
        let transport = TcpUpdateTransport::new(fast_timeouts());

        let err = transport
            .submit(&server_at(addr), &signed_message())
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::UnverifiedResponse { .. }), "{err:?}");
        assert!(!DnsError::from(err).is_transient());
    }

    #[tokio::test]
    async fn test_submit_signed_rejects_answer_signed_with_other_secret() {
        let addr = spawn_dns_server(|request| {
            let mut forged = test_key("update-key");
            forged.secret = "Zm9yZ2VkZm9yZ2VkZm9yZ2VkZm9yZ2Vk".to_string();
            let Ok(signer) = create_tsig_signer(&forged) else {
                panic!("forged key must still be valid");
            };
            sign_responses(&request, vec![response_to(&request, ResponseCode::NoError)], &signer)
        })
        .await;
        let transport = TcpUpdateTransport::new(fast_timeouts());

        let err = transport
            .submit(&server_at(addr), &signed_message())
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::UnverifiedResponse { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_submit_ignores_answer_with_mismatched_id() {
        let addr = spawn_dns_server(|request| {
            let mut response = response_to(&request, ResponseCode::NoError);
            response.set_id(request.id().wrapping_add(1));
            vec![response]
        })
        .await;
        let transport = TcpUpdateTransport::new(fast_timeouts());

        // An answer for an unknown id is dropped, so the request runs out of time
        let err = transport.submit(&server_at(addr), &message()).await.unwrap_err();

        assert!(matches!(err, TransportError::Timeout { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_submit_server_closes_without_answer() {
        let addr = spawn_dns_server(|_| Vec::new()).await;
        let transport = TcpUpdateTransport::new(fast_timeouts());

        // The fake server keeps the connection open with no answer, so this
        // surfaces as a read timeout rather than a DNS-level failure.
        let err = transport.submit(&server_at(addr), &message()).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }), "{err:?}");
    }

    #[test]
    fn test_rcode_names() {
        assert_eq!(rcode_name(ResponseCode::NoError), "NOERROR");
        assert_eq!(rcode_name(ResponseCode::FormErr), "FORMERR");
        assert_eq!(rcode_name(ResponseCode::Refused), "REFUSED");
        assert_eq!(rcode_name(ResponseCode::NotAuth), "NOTAUTH");
        assert_eq!(rcode_name(ResponseCode::NotZone), "NOTZONE");
        assert_eq!(rcode_name(ResponseCode::Unknown(3841)), "RCODE3841");
    }
}
