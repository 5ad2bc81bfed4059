//! Structured and compact legacy memo shapes
//!
//! Early teleburns recorded a JSON record instead of the compact canonical
//! string. The record is still produced today for derived-address bindings
//! (`action = "teleburn-derived"`), where it travels next to the canonical
//! memo so verifiers can re-derive the bound address.

use crate::derivation::DerivedAddress;
use crate::identifier::InscriptionId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Standard name written into records produced by this crate
pub const RECORD_STANDARD: &str = "KILN";

/// Record version written by this crate
pub const RECORD_VERSION: &str = "0.2";

static COMPACT_LEGACY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^teleburn:v([0-9]{1,3}(?:\.[0-9]{1,3})?):(seal|burn|incinerate|teleburn-derived):(\S+)$")
        .expect("compact legacy pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemoAction {
    Seal,
    Burn,
    Incinerate,
    TeleburnDerived,
}

impl MemoAction {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "seal" => Some(Self::Seal),
            "burn" => Some(Self::Burn),
            "incinerate" => Some(Self::Incinerate),
            "teleburn-derived" => Some(Self::TeleburnDerived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InscriptionRef {
    pub id: InscriptionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolanaRef {
    pub mint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedRef {
    pub address: String,
    pub bump: u8,
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyMemo {
    pub standard: String,
    pub version: String,
    pub action: MemoAction,
    pub inscription: InscriptionRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solana: Option<SolanaRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
}

impl LegacyMemo {
    /// Record binding a derived off-curve address to an inscription
    pub fn derived_binding(
        id: InscriptionId,
        mint: &Pubkey,
        derived: &DerivedAddress,
        domain: &str,
    ) -> Self {
        Self {
            standard: RECORD_STANDARD.to_string(),
            version: RECORD_VERSION.to_string(),
            action: MemoAction::TeleburnDerived,
            inscription: InscriptionRef { id },
            solana: Some(SolanaRef {
                mint: mint.to_string(),
            }),
            media: None,
            derived: Some(DerivedRef {
                address: derived.address.to_string(),
                bump: derived.bump,
                domain: domain.to_string(),
            }),
            timestamp: None,
            block_height: None,
        }
    }

    /// Intent record written by seal transactions, before anything is destroyed
    pub fn seal(id: InscriptionId, mint: &Pubkey) -> Self {
        Self {
            standard: RECORD_STANDARD.to_string(),
            version: RECORD_VERSION.to_string(),
            action: MemoAction::Seal,
            inscription: InscriptionRef { id },
            solana: Some(SolanaRef {
                mint: mint.to_string(),
            }),
            media: None,
            derived: None,
            timestamp: None,
            block_height: None,
        }
    }

    pub fn identifier(&self) -> InscriptionId {
        self.inscription.id
    }

    /// Mint recorded in the record, if present and well-formed
    pub fn mint(&self) -> Option<Pubkey> {
        self.solana.as_ref().and_then(|s| s.mint.parse().ok())
    }

    pub fn to_json(&self) -> String {
        // Every field is a plain string/number; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub(crate) fn parse_record(raw: &str) -> Option<Self> {
        if !raw.starts_with('{') {
            return None;
        }
        serde_json::from_str(raw).ok()
    }

    pub(crate) fn parse_compact(raw: &str) -> Option<Self> {
        let caps = COMPACT_LEGACY.captures(raw)?;
        let version = caps.get(1)?.as_str();
        let action = MemoAction::parse(caps.get(2)?.as_str())?;
        let id = InscriptionId::parse(caps.get(3)?.as_str()).ok()?;

        Some(Self {
            standard: "teleburn".to_string(),
            version: version.to_string(),
            action,
            inscription: InscriptionRef { id },
            solana: None,
            media: None,
            derived: None,
            timestamp: None,
            block_height: None,
        })
    }
}
