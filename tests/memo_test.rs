//! Memo codec tests over the public API

use proptest::prelude::*;
use teleburn::memo::{self, MemoFormat};
use teleburn::InscriptionId;

fn identifier() -> impl Strategy<Value = InscriptionId> {
    (any::<[u8; 32]>(), any::<u32>()).prop_map(|(origin, index)| InscriptionId::new(origin, index))
}

proptest! {
    #[test]
    fn canonical_memo_round_trips(id in identifier()) {
        let decoded = memo::decode(&memo::encode(&id)).unwrap();
        prop_assert_eq!(decoded.identifier, id);
        prop_assert_eq!(decoded.format, MemoFormat::Canonical);
    }

    #[test]
    fn decode_is_total(input in "\\PC{0,2048}") {
        if let Err(e) = memo::decode(&input) {
            prop_assert_eq!(e.kind(), "invalid_memo");
        }
    }

    #[test]
    fn decode_is_total_on_memo_like_input(input in "(teleburn:(v[0-9.]{0,4}:[a-z-]{0,20}:)?)?[0-9a-fi\\[\\]{}\" :]{0,120}") {
        let _ = memo::decode(&input);
    }

    #[test]
    fn rpc_memo_field_split_is_total(field in "(\\[[0-9]{1,3}\\] ?\\PC{0,40}(; )?){0,6}") {
        let _ = memo::split_rpc_memo_field(&field);
    }

    #[test]
    fn rpc_memo_field_split_handles_arbitrary_text(field in "\\PC{0,512}") {
        let _ = memo::split_rpc_memo_field(&field);
    }
}

#[test]
fn test_decode_accepts_every_known_shape() {
    let id = format!("{}i2", "ab".repeat(32));
    let cases = [
        (format!("teleburn:{}", id), MemoFormat::Canonical),
        (format!("teleburn:v0.1:burn:{}", id), MemoFormat::LegacyCompact),
        (id.clone(), MemoFormat::LegacyBare),
        (
            format!(
                r#"{{"standard":"KILN","version":"0.1","action":"burn","inscription":{{"id":"{}"}}}}"#,
                id
            ),
            MemoFormat::LegacyRecord,
        ),
    ];

    for (raw, format) in cases {
        let decoded = memo::decode(&raw).unwrap_or_else(|e| panic!("{}: {}", raw, e));
        assert_eq!(decoded.format, format, "{}", raw);
        assert_eq!(decoded.identifier.to_string(), id);
    }
}

#[test]
fn test_decode_rejects_malformed_input() {
    for raw in [
        "",
        "   ",
        "teleburn:",
        "teleburn:xyz",
        "{\"standard\":",
        "hello world",
        "\u{0}\u{1}\u{2}",
    ] {
        let err = memo::decode(raw).unwrap_err();
        assert_eq!(err.kind(), "invalid_memo", "{:?}", raw);
    }

    let huge = "a".repeat(memo::MAX_DECODE_INPUT_BYTES + 1);
    assert!(memo::decode(&huge).is_err());
}

#[test]
fn test_rpc_memo_field_split() {
    let a = format!("teleburn:{}i0", "1".repeat(64));
    let b = "note; with separator";
    let field = format!("[{}] {}; [{}] {}", a.len(), a, b.len(), b);

    assert_eq!(memo::split_rpc_memo_field(&field), vec![a, b.to_string()]);
}
