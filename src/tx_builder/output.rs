//! Caller-owned result of a transaction build
//!
//! `BuiltTransaction` holds the compiled message together with the
//! instructions it was compiled from. The builder keeps no reference to it.

use crate::errors::{Result, TeleburnError};
use crate::types::RetireMethod;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    hash::Hash, instruction::Instruction, message::VersionedMessage, pubkey::Pubkey,
    signature::Signature, transaction::VersionedTransaction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TransactionKind {
    Seal,
    Retire { method: RetireMethod },
    MetadataUpdate,
}

impl TransactionKind {
    /// Metric / log label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Seal => "seal",
            Self::Retire { .. } => "retire",
            Self::MetadataUpdate => "metadata_update",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuiltTransaction {
    pub kind: TransactionKind,
    pub instructions: Vec<Instruction>,
    pub fee_payer: Pubkey,
    /// Base fee plus priority fee, in lamports
    pub estimated_fee: u64,
    pub description: String,
    pub recent_blockhash: Hash,
    pub message: VersionedMessage,
    /// Serialized size with placeholder signatures
    pub serialized_size: usize,
    /// Extracted from the message header
    pub required_signers: Vec<Pubkey>,
}

impl BuiltTransaction {
    pub(crate) fn required_signers_of(message: &VersionedMessage) -> Vec<Pubkey> {
        let count = message.header().num_required_signatures as usize;
        message
            .static_account_keys()
            .iter()
            .take(count)
            .copied()
            .collect()
    }

    /// Transaction with one default signature per required signer
    pub fn to_unsigned_transaction(&self) -> VersionedTransaction {
        unsigned_transaction(&self.message)
    }

    /// bincode wire bytes of the unsigned transaction, base64 encoded
    pub fn serialize_base64(&self) -> Result<String> {
        let bytes = bincode::serialize(&self.to_unsigned_transaction())
            .map_err(|e| TeleburnError::instruction_build("transaction", e))?;
        Ok(STANDARD.encode(bytes))
    }

    pub fn summary(&self) -> Result<TransactionSummary> {
        Ok(TransactionSummary {
            kind: self.kind,
            description: self.description.clone(),
            fee_payer: self.fee_payer.to_string(),
            estimated_fee: self.estimated_fee,
            instructions: self.instructions.len(),
            serialized_size: self.serialized_size,
            required_signers: self.required_signers.iter().map(|p| p.to_string()).collect(),
            recent_blockhash: self.recent_blockhash.to_string(),
            transaction_base64: self.serialize_base64()?,
        })
    }
}

pub(crate) fn unsigned_transaction(message: &VersionedMessage) -> VersionedTransaction {
    let required = message.header().num_required_signatures as usize;
    VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message: message.clone(),
    }
}

/// JSON view of a built transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub kind: TransactionKind,
    pub description: String,
    pub fee_payer: String,
    pub estimated_fee: u64,
    pub instructions: usize,
    pub serialized_size: usize,
    pub required_signers: Vec<String>,
    pub recent_blockhash: String,
    pub transaction_base64: String,
}
