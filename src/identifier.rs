//! Bitcoin inscription identifiers (`<txid>i<index>`)
//!
//! The identifier is the cross-chain anchor of a teleburn: the origin
//! transaction id (32 bytes, rendered as 64 lowercase hex characters) and
//! the inscription index within that transaction.
//!
//! Parsing is strict. Uppercase hex, missing or extra characters, and
//! indexes with leading zeros (other than the literal `0`) are rejected so
//! that every identifier has exactly one textual form.

use crate::errors::{Result, TeleburnError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of the hex-encoded origin transaction id
pub const ORIGIN_HEX_LEN: usize = 64;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InscriptionId {
    origin: [u8; 32],
    index: u32,
}

impl InscriptionId {
    pub const fn new(origin: [u8; 32], index: u32) -> Self {
        Self { origin, index }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let (hex_part, index_part) = input
            .split_once('i')
            .ok_or_else(|| TeleburnError::invalid_identifier(input, "missing 'i' separator"))?;

        if hex_part.len() != ORIGIN_HEX_LEN {
            return Err(TeleburnError::invalid_identifier(
                input,
                format!(
                    "origin must be {} hex characters, got {}",
                    ORIGIN_HEX_LEN,
                    hex_part.len()
                ),
            ));
        }
        if !hex_part
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(TeleburnError::invalid_identifier(
                input,
                "origin must be lowercase hex",
            ));
        }

        if index_part.is_empty() || !index_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TeleburnError::invalid_identifier(
                input,
                "index must be a non-empty decimal number",
            ));
        }
        if index_part.len() > 1 && index_part.starts_with('0') {
            return Err(TeleburnError::invalid_identifier(
                input,
                "index must not have leading zeros",
            ));
        }
        let index = index_part.parse::<u32>().map_err(|_| {
            TeleburnError::invalid_identifier(input, "index does not fit in 32 bits")
        })?;

        let mut origin = [0u8; 32];
        hex::decode_to_slice(hex_part, &mut origin)
            .map_err(|e| TeleburnError::invalid_identifier(input, e.to_string()))?;

        Ok(Self { origin, index })
    }

    /// Origin transaction id bytes, in the order they appear in the hex form
    pub fn origin(&self) -> &[u8; 32] {
        &self.origin
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn origin_hex(&self) -> String {
        hex::encode(self.origin)
    }
}

impl fmt::Display for InscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}i{}", self.origin_hex(), self.index)
    }
}

impl fmt::Debug for InscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InscriptionId({})", self)
    }
}

impl FromStr for InscriptionId {
    type Err = TeleburnError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for InscriptionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InscriptionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zeros() -> String {
        "0".repeat(64)
    }

    #[test]
    fn test_all_zero_origin_with_index_zero_is_valid() {
        let id = InscriptionId::parse(&format!("{}i0", zeros())).unwrap();
        assert_eq!(id.origin(), &[0u8; 32]);
        assert_eq!(id.index(), 0);
    }

    #[test]
    fn test_short_origin_rejected() {
        let err = InscriptionId::parse(&format!("{}i0", "0".repeat(63))).unwrap_err();
        assert_eq!(err.kind(), "invalid_identifier");
    }

    #[test]
    fn test_leading_zero_index_rejected() {
        let err = InscriptionId::parse(&format!("{}i01", zeros())).unwrap_err();
        assert!(err.to_string().contains("leading zeros"));
    }

    #[test]
    fn test_uppercase_hex_rejected() {
        let input = format!("{}i0", "A".repeat(64));
        assert!(InscriptionId::parse(&input).is_err());
    }

    #[test]
    fn test_missing_or_garbage_index_rejected() {
        assert!(InscriptionId::parse(&zeros()).is_err());
        assert!(InscriptionId::parse(&format!("{}i", zeros())).is_err());
        assert!(InscriptionId::parse(&format!("{}i-1", zeros())).is_err());
        assert!(InscriptionId::parse(&format!("{}i4294967296", zeros())).is_err());
    }

    #[test]
    fn test_display_is_canonical() {
        let input = "87e11177b0e184cd7ef0f076fc4de5ddacf509b71d2b1937a01b351965567998i0";
        let id: InscriptionId = input.parse().unwrap();
        assert_eq!(id.to_string(), input);
        assert_eq!(id.origin()[0], 0x87);
    }

    #[test]
    fn test_serde_as_string() {
        let input = format!("{}i12", "ab".repeat(32));
        let id = InscriptionId::parse(&input).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", input));
        let back: InscriptionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<InscriptionId>("\"nope\"").is_err());
    }
}
