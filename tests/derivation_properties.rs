//! Property tests for address derivation and inscription identifiers

use proptest::prelude::*;
use teleburn::derivation::{self, DEFAULT_DOMAIN_TAG};
use teleburn::InscriptionId;

fn identifier() -> impl Strategy<Value = InscriptionId> {
    (any::<[u8; 32]>(), any::<u32>()).prop_map(|(origin, index)| InscriptionId::new(origin, index))
}

proptest! {
    #[test]
    fn derived_addresses_are_off_curve(id in identifier(), domain in "[a-z.]{1,24}") {
        let derived = derivation::derive(&id, &domain).unwrap();
        prop_assert!(!derivation::is_on_curve(&derived.to_bytes()));
        prop_assert!(!derived.address.is_on_curve());
    }

    #[test]
    fn derivation_is_deterministic(id in identifier()) {
        let a = derivation::derive(&id, DEFAULT_DOMAIN_TAG).unwrap();
        let b = derivation::derive(&id, DEFAULT_DOMAIN_TAG).unwrap();
        prop_assert_eq!(a, b);
        prop_assert!(derivation::verify_binding(&id, DEFAULT_DOMAIN_TAG, &a.address, Some(a.bump)).unwrap());
    }

    #[test]
    fn identifier_text_round_trips(id in identifier()) {
        let text = id.to_string();
        prop_assert_eq!(InscriptionId::parse(&text).unwrap(), id);
    }

    #[test]
    fn parse_never_panics(input in "\\PC{0,140}") {
        let _ = InscriptionId::parse(&input);
    }
}

#[test]
fn test_domain_tag_separates_addresses() {
    let id = InscriptionId::parse(&format!("{}i0", "a".repeat(64))).unwrap();
    let v1 = derivation::derive(&id, "proto.v1").unwrap();
    let v2 = derivation::derive(&id, "proto.v2").unwrap();

    assert_eq!(v1.to_bytes().len(), 32);
    assert_ne!(v1.address, v2.address);
    assert_eq!(v1, derivation::derive(&id, "proto.v1").unwrap());
}

#[test]
fn test_binding_rejects_other_domain() {
    let id = InscriptionId::parse(&format!("{}i5", "c".repeat(64))).unwrap();
    let derived = derivation::derive(&id, "proto.v1").unwrap();
    assert!(!derivation::verify_binding(&id, "proto.v2", &derived.address, None).unwrap());
}

#[test]
fn test_identifier_boundaries() {
    assert!(InscriptionId::parse(&format!("{}i0", "0".repeat(64))).is_ok());

    let short = InscriptionId::parse(&format!("{}i0", "0".repeat(63))).unwrap_err();
    assert_eq!(short.kind(), "invalid_identifier");

    let leading_zero = InscriptionId::parse(&format!("{}i01", "0".repeat(64))).unwrap_err();
    assert_eq!(leading_zero.kind(), "invalid_identifier");

    assert!(InscriptionId::parse(&format!("{}i0", "A".repeat(64))).is_err());
}
