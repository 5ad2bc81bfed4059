//! Shared protocol types used across the builder, dry-run and verification paths

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the token is destroyed at retire time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RetireMethod {
    /// Burn the unit, reducing supply to zero, plus the teleburn memo
    DirectBurn,
    /// Move the unit to the incinerator's token account, then close the source
    TransferToSink,
    /// Burn the unit and bind the derived off-curve address in the memo
    DeriveAndBind,
}

impl RetireMethod {
    pub const ALL: [RetireMethod; 3] = [
        RetireMethod::DirectBurn,
        RetireMethod::TransferToSink,
        RetireMethod::DeriveAndBind,
    ];

    /// Stable machine-readable name, also used on the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            RetireMethod::DirectBurn => "direct-burn",
            RetireMethod::TransferToSink => "transfer-to-sink",
            RetireMethod::DeriveAndBind => "derive-and-bind",
        }
    }

    /// Whether the method destroys the unit through an SPL burn
    pub fn burns(&self) -> bool {
        matches!(self, RetireMethod::DirectBurn | RetireMethod::DeriveAndBind)
    }
}

impl fmt::Display for RetireMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetireMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct-burn" | "directburn" | "burn" => Ok(RetireMethod::DirectBurn),
            "transfer-to-sink" | "transfertosink" | "incinerate" => Ok(RetireMethod::TransferToSink),
            "derive-and-bind" | "deriveandbind" | "teleburn-derived" => {
                Ok(RetireMethod::DeriveAndBind)
            }
            other => Err(format!("unknown retire method '{}'", other)),
        }
    }
}
