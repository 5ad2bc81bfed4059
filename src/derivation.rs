//! Deterministic off-curve address derivation
//!
//! Maps an inscription id to a 32-byte Solana address that is provably not
//! an ed25519 public key, so no private key for it can exist:
//!
//! ```text
//! preimage = origin (32B) || index (4B, big-endian) || utf8(domain_tag)
//! h0       = sha256(preimage)
//! h(n+1)   = sha256(h(n) || 0x00)      while h(n) decompresses to a curve point
//! ```
//!
//! The first off-curve hash is returned together with the number of
//! re-hash rounds (the bump). Any third party can recompute the result from
//! the inscription id and the domain tag alone.
//!
//! The domain tag is versioned. A different tag yields a disjoint address
//! space, so verifiers must use the exact tag recorded alongside the binding.

use crate::errors::{Result, TeleburnError};
use crate::identifier::InscriptionId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

/// Domain tag for version 1 derived bindings
pub const DEFAULT_DOMAIN_TAG: &str = "teleburn.ordinals.derived.v1";

/// Upper bound on re-hash rounds; bumps are reported as a single byte
pub const MAX_BUMP: u8 = u8::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

impl DerivedAddress {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.address.to_bytes()
    }
}

/// Derive the off-curve address for `id` under `domain_tag`
pub fn derive(id: &InscriptionId, domain_tag: &str) -> Result<DerivedAddress> {
    derive_with(id, domain_tag, is_on_curve)
}

/// Same as [`derive`] with an explicit curve-membership predicate.
///
/// Production code always goes through [`derive`]; the predicate seam exists
/// so the exhaustion path can be exercised.
pub(crate) fn derive_with<F>(
    id: &InscriptionId,
    domain_tag: &str,
    on_curve: F,
) -> Result<DerivedAddress>
where
    F: Fn(&[u8; 32]) -> bool,
{
    let mut current = initial_hash(id, domain_tag);

    for bump in 0..=MAX_BUMP {
        if !on_curve(&current) {
            debug!(
                inscription = %id,
                domain = domain_tag,
                bump,
                "Derived off-curve address"
            );
            return Ok(DerivedAddress {
                address: Pubkey::new_from_array(current),
                bump,
            });
        }
        current = rehash(&current);
    }

    Err(TeleburnError::DerivationExhausted {
        domain: domain_tag.to_string(),
        attempts: u32::from(MAX_BUMP) + 1,
    })
}

/// Re-derive and compare against a recorded binding
pub fn verify_binding(
    id: &InscriptionId,
    domain_tag: &str,
    expected: &Pubkey,
    expected_bump: Option<u8>,
) -> Result<bool> {
    let derived = derive(id, domain_tag)?;
    Ok(derived.address == *expected && expected_bump.map_or(true, |b| b == derived.bump))
}

/// Curve-membership predicate for 32-byte candidates
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    Pubkey::new_from_array(*bytes).is_on_curve()
}

fn initial_hash(id: &InscriptionId, domain_tag: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(id.origin());
    hasher.update(id.index().to_be_bytes());
    hasher.update(domain_tag.as_bytes());
    hasher.finalize().into()
}

fn rehash(previous: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(previous);
    hasher.update([0x00]);
    hasher.finalize().into()
}
