//! Teleburn memo codec
//!
//! The canonical proof string is `teleburn:<64 lowercase hex>i<index>` and
//! always fits in [`CANONICAL_MEMO_MAX_BYTES`]. Decoding also accepts the
//! legacy shapes found on chain, tried in a fixed priority order:
//!
//! 1. canonical `teleburn:<identifier>`
//! 2. structured JSON record (`{"standard":..,"action":..,"inscription":{"id":..}}`)
//! 3. compact `teleburn:v<version>:<action>:<identifier>`
//! 4. bare `<identifier>`
//!
//! Every strategy is total: malformed chain data yields `InvalidMemo`,
//! never a panic.

mod legacy;

pub use legacy::{DerivedRef, LegacyMemo, MediaRef, MemoAction, SolanaRef, RECORD_VERSION};

use crate::errors::{Result, TeleburnError};
use crate::identifier::InscriptionId;
use serde::{Deserialize, Serialize};

pub const CANONICAL_PREFIX: &str = "teleburn:";

/// Byte budget for the canonical memo
pub const CANONICAL_MEMO_MAX_BYTES: usize = 100;

/// Larger inputs are rejected before any parsing
pub const MAX_DECODE_INPUT_BYTES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemoFormat {
    Canonical,
    LegacyRecord,
    LegacyCompact,
    LegacyBare,
}

impl MemoFormat {
    pub fn is_current(&self) -> bool {
        matches!(self, MemoFormat::Canonical)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TeleburnMemo {
    Canonical { identifier: InscriptionId },
    /// Structured or compact record
    Legacy(LegacyMemo),
    /// Identifier alone, without prefix or record fields
    LegacyBare { identifier: InscriptionId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedMemo {
    pub identifier: InscriptionId,
    pub format: MemoFormat,
    pub memo: TeleburnMemo,
}

impl DecodedMemo {
    /// Record fields, for the legacy shapes that carry any
    pub fn legacy(&self) -> Option<&LegacyMemo> {
        match &self.memo {
            TeleburnMemo::Legacy(record) => Some(record),
            TeleburnMemo::Canonical { .. } | TeleburnMemo::LegacyBare { .. } => None,
        }
    }
}

type Strategy = fn(&str) -> Option<DecodedMemo>;

const STRATEGIES: [Strategy; 4] = [
    decode_canonical,
    decode_record,
    decode_compact,
    decode_bare,
];

/// Encode the canonical memo for `id`
pub fn encode(id: &InscriptionId) -> String {
    let memo = format!("{}{}", CANONICAL_PREFIX, id);
    debug_assert!(memo.len() <= CANONICAL_MEMO_MAX_BYTES);
    memo
}

/// Parse `raw` as an identifier and encode it
pub fn encode_str(raw: &str) -> Result<String> {
    Ok(encode(&InscriptionId::parse(raw)?))
}

/// Decode a memo payload of any supported shape
pub fn decode(raw: &str) -> Result<DecodedMemo> {
    if raw.len() > MAX_DECODE_INPUT_BYTES {
        return Err(TeleburnError::invalid_memo(format!(
            "memo is {} bytes, limit {}",
            raw.len(),
            MAX_DECODE_INPUT_BYTES
        )));
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TeleburnError::invalid_memo("memo is empty"));
    }

    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(trimmed))
        .ok_or_else(|| TeleburnError::invalid_memo("no known teleburn memo shape matched"))
}

/// Decode raw instruction data from the memo program
pub fn decode_bytes(data: &[u8]) -> Result<DecodedMemo> {
    let text = std::str::from_utf8(data)
        .map_err(|_| TeleburnError::invalid_memo("memo data is not valid UTF-8"))?;
    decode(text)
}

/// Split the `memo` summary of a signature listing into individual memos.
///
/// RPC nodes render every memo instruction of a transaction as
/// `[<len>] <text>` and join them with `"; "`.
pub fn split_rpc_memo_field(field: &str) -> Vec<String> {
    let mut memos = Vec::new();
    let mut rest = field.trim();

    while !rest.is_empty() {
        let Some(body) = strip_length_prefix(rest) else {
            memos.push(rest.to_string());
            break;
        };
        let (len, text) = body;
        // Byte length is authoritative; a "; " inside a memo must not split it.
        if let Some(memo) = text.get(..len) {
            memos.push(memo.to_string());
            rest = text[len..].trim_start_matches("; ").trim_start();
        } else {
            memos.push(text.to_string());
            break;
        }
    }
    memos
}

fn strip_length_prefix(s: &str) -> Option<(usize, &str)> {
    let inner = s.strip_prefix('[')?;
    let (digits, tail) = inner.split_once(']')?;
    let len = digits.parse::<usize>().ok()?;
    Some((len, tail.strip_prefix(' ').unwrap_or(tail)))
}

fn decode_canonical(raw: &str) -> Option<DecodedMemo> {
    let id = InscriptionId::parse(raw.strip_prefix(CANONICAL_PREFIX)?).ok()?;
    Some(DecodedMemo {
        identifier: id,
        format: MemoFormat::Canonical,
        memo: TeleburnMemo::Canonical { identifier: id },
    })
}

fn decode_record(raw: &str) -> Option<DecodedMemo> {
    let record = LegacyMemo::parse_record(raw)?;
    Some(DecodedMemo {
        identifier: record.identifier(),
        format: MemoFormat::LegacyRecord,
        memo: TeleburnMemo::Legacy(record),
    })
}

fn decode_compact(raw: &str) -> Option<DecodedMemo> {
    let record = LegacyMemo::parse_compact(raw)?;
    Some(DecodedMemo {
        identifier: record.identifier(),
        format: MemoFormat::LegacyCompact,
        memo: TeleburnMemo::Legacy(record),
    })
}

fn decode_bare(raw: &str) -> Option<DecodedMemo> {
    let id = InscriptionId::parse(raw).ok()?;
    Some(DecodedMemo {
        identifier: id,
        format: MemoFormat::LegacyBare,
        memo: TeleburnMemo::LegacyBare { identifier: id },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ff3() -> InscriptionId {
        InscriptionId::parse(&format!("{}i3", "f".repeat(64))).unwrap()
    }

    #[test]
    fn test_encode_canonical() {
        let memo = encode(&ff3());
        assert_eq!(memo, format!("teleburn:{}i3", "f".repeat(64)));
        assert!(memo.len() <= CANONICAL_MEMO_MAX_BYTES);
    }

    #[test]
    fn test_largest_index_fits_budget() {
        let id = InscriptionId::new([0xff; 32], u32::MAX);
        assert!(encode(&id).len() <= CANONICAL_MEMO_MAX_BYTES);
    }

    #[test]
    fn test_decode_canonical() {
        let decoded = decode(&encode(&ff3())).unwrap();
        assert_eq!(decoded.identifier, ff3());
        assert_eq!(decoded.format, MemoFormat::Canonical);
        assert!(decoded.format.is_current());
        assert!(decoded.legacy().is_none());
    }

    #[test]
    fn test_decode_dispatches_legacy_shapes() {
        let id = ff3();

        let record = format!(
            r#"{{"standard":"KILN","version":"0.1","action":"seal","inscription":{{"id":"{}"}}}}"#,
            id
        );
        assert_eq!(decode(&record).unwrap().format, MemoFormat::LegacyRecord);

        let compact = format!("teleburn:v1:burn:{}", id);
        let decoded = decode(&compact).unwrap();
        assert_eq!(decoded.format, MemoFormat::LegacyCompact);
        assert_eq!(decoded.legacy().unwrap().action, MemoAction::Burn);

        let bare = decode(&id.to_string()).unwrap();
        assert_eq!(bare.format, MemoFormat::LegacyBare);
        assert_eq!(bare.memo, TeleburnMemo::LegacyBare { identifier: id });
        assert!(bare.legacy().is_none());
    }

    #[test]
    fn test_decode_trims_whitespace() {
        let decoded = decode(&format!("  {}\n", encode(&ff3()))).unwrap();
        assert_eq!(decoded.identifier, ff3());
    }

    #[test]
    fn test_decode_rejects_malformed() {
        for raw in [
            "",
            "   ",
            "teleburn:",
            "teleburn:xyz",
            "TELEBURN:ffff",
            "{not json",
            "{\"standard\":\"KILN\"}",
            "hello world",
        ] {
            let err = decode(raw).unwrap_err();
            assert_eq!(err.kind(), "invalid_memo", "input {:?}", raw);
        }
        assert!(decode(&"x".repeat(MAX_DECODE_INPUT_BYTES + 1)).is_err());
        assert!(decode_bytes(&[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn test_split_rpc_memo_field() {
        let a = encode(&ff3());
        let field = format!("[{}] {}; [5] hello", a.len(), a);
        assert_eq!(split_rpc_memo_field(&field), vec![a, "hello".to_string()]);
    }

    #[test]
    fn test_split_rpc_memo_field_keeps_embedded_separator() {
        let field = "[8] a; b; cd";
        assert_eq!(split_rpc_memo_field(field), vec!["a; b; cd".to_string()]);
        assert_eq!(split_rpc_memo_field("plain"), vec!["plain".to_string()]);
        assert!(split_rpc_memo_field("").is_empty());
    }
}
