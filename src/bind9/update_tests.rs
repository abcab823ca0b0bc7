// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for the dynamic update transaction builder.

#[cfg(test)]
mod tests {
    use crate::bind9::keyring::Keyring;
    use crate::bind9::types::{RecordKind, ResourceRecord, UpdateAction};
    use crate::bind9::update::UpdateBuilder;
    use crate::config::{KeyConfig, TsigAlgorithm};
    use crate::dns_errors::{DnsError, KeyringError, RecordError};
    use hickory_client::op::OpCode;
    use hickory_client::rr::{DNSClass, RecordType};

    fn keyring() -> Keyring {
        Keyring::new(&[KeyConfig {
            name: "update-key".to_string(),
            algorithm: TsigAlgorithm::HmacSha256,
            secret: "dGVzdHNlY3JldHRlc3RzZWNyZXQ=".to_string(),
        }])
    }

    fn a_record(name: &str, ip: &str) -> ResourceRecord {
        ResourceRecord::new(name, RecordKind::A, ip, 300)
    }

    #[test]
    fn test_build_unsigned_add() {
        let message = UpdateBuilder::new("example.com")
            .add(a_record("host1.example.com", "10.1.1.5"))
            .build(&Keyring::default())
            .unwrap();

        assert_eq!(message.zone(), "example.com.");
        assert!(!message.is_signed());
        assert_eq!(message.changes().len(), 1);
        assert_eq!(message.changes()[0].0, UpdateAction::Add);
        assert_eq!(message.changes()[0].1.name, "host1.example.com.");

        let decoded = message.message();
        assert_eq!(decoded.op_code(), OpCode::Update);
        assert_eq!(decoded.queries().len(), 1);
        assert_eq!(decoded.queries()[0].name().to_string(), "example.com.");
        assert_eq!(decoded.queries()[0].query_type(), RecordType::SOA);
        assert_eq!(decoded.name_servers().len(), 1);
        assert_eq!(decoded.name_servers()[0].dns_class(), DNSClass::IN);
        assert_eq!(decoded.name_servers()[0].ttl(), 300);
    }

    #[test]
    fn test_build_delete_uses_class_none() {
        let message = UpdateBuilder::new("example.com.")
            .delete(a_record("a.example.com.", "10.1.1.1"))
            .build(&Keyring::default())
            .unwrap();

        let decoded = message.message();
        let update = &decoded.name_servers()[0];
        assert_eq!(update.dns_class(), DNSClass::NONE);
        assert_eq!(update.ttl(), 0);
        assert_eq!(update.record_type(), RecordType::A);
    }

    #[test]
    fn test_build_keeps_change_order() {
        let message = UpdateBuilder::new("example.com")
            .add(a_record("b.example.com", "10.1.1.2"))
            .delete(a_record("a.example.com", "10.1.1.1"))
            .build(&Keyring::default())
            .unwrap();

        let decoded = message.message();
        let names: Vec<String> = decoded
            .name_servers()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["b.example.com.", "a.example.com."]);
    }

    #[test]
    fn test_build_signed_carries_signer() {
        let message = UpdateBuilder::new("example.com")
            .add(a_record("host1.example.com", "10.1.1.5"))
            .signed_with(Some("update-key"))
            .build(&keyring())
            .unwrap();

        assert!(message.is_signed());
        assert!(message.signer().is_some());
        assert_eq!(message.key_name(), Some("update-key"));
        // Signed by the client once the id is assigned
        assert!(message.message().signature().is_empty());
    }

    #[test]
    fn test_build_unsigned_has_no_signer() {
        let message = UpdateBuilder::new("example.com")
            .add(a_record("host1.example.com", "10.1.1.5"))
            .build(&keyring())
            .unwrap();

        assert!(message.signer().is_none());
        assert_eq!(message.key_name(), None);
    }

    #[test]
    fn test_build_missing_key_fails() {
        let result = UpdateBuilder::new("example.com")
            .add(a_record("host1.example.com", "10.1.1.5"))
            .signed_with(Some("absent-key"))
            .build(&keyring());

        assert_eq!(
            result.unwrap_err(),
            DnsError::Keyring(KeyringError::KeyNotFound {
                name: "absent-key".to_string()
            })
        );
    }

    #[test]
    fn test_build_rejects_mixed_zones() {
        let result = UpdateBuilder::new("example.com")
            .add(a_record("host1.example.com", "10.1.1.5"))
            .add(a_record("host2.example.net", "10.1.1.6"))
            .build(&Keyring::default());

        assert!(matches!(
            result,
            Err(DnsError::Record(RecordError::NotInZone { ref name, .. })) if name == "host2.example.net."
        ));
    }

    #[test]
    fn test_build_rejects_empty_zone() {
        let result = UpdateBuilder::new("  ")
            .add(a_record("host1.example.com", "10.1.1.5"))
            .build(&Keyring::default());

        assert!(matches!(
            result,
            Err(DnsError::Record(RecordError::InvalidTransaction { .. }))
        ));
    }

    #[test]
    fn test_build_rejects_empty_record_set() {
        let result = UpdateBuilder::new("example.com").build(&Keyring::default());

        assert!(matches!(
            result,
            Err(DnsError::Record(RecordError::InvalidTransaction { ref reason, .. })) if reason.contains("no records")
        ));
    }
}
