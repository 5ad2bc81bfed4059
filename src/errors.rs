//! Error taxonomy for the teleburn protocol engine
//!
//! Every failure carries:
//! - a stable machine-readable kind (`kind()`), safe to match on from callers
//! - a human-readable explanation (`Display`)
//! - where applicable, a suggested alternative retire method (`suggestion()`)
//!
//! `EndpointUnavailable` is produced only after the failover layer has tried
//! every configured endpoint. `SimulationFailed` never escapes the dry-run
//! orchestrator; it is folded into the report's warnings instead.

use crate::types::RetireMethod;
use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, TeleburnError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TeleburnError {
    /// Cross-chain identifier does not match `<64 lowercase hex>i<index>`
    #[error("Invalid inscription identifier '{input}': {reason}")]
    InvalidIdentifier { input: String, reason: String },

    /// Memo payload matched none of the known teleburn shapes
    #[error("Invalid teleburn memo: {reason}")]
    InvalidMemo { reason: String },

    /// No off-curve point within the bump bound. Never retried.
    #[error("Address derivation exhausted after {attempts} attempts (domain: {domain})")]
    DerivationExhausted { domain: String, attempts: u32 },

    /// Token account is frozen and the requested method cannot proceed
    #[error("Token account {account} is frozen; {method} cannot proceed")]
    FrozenAccount {
        account: String,
        method: RetireMethod,
        suggestion: Option<RetireMethod>,
    },

    #[error("Insufficient token balance in {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: String,
        required: u64,
        available: u64,
    },

    /// Balance is above one unit and the override flag was not set
    #[error("Unexpected token balance in {account}: expected {expected}, found {available} (set allow_non_unit_balance to retire the whole balance)")]
    UnexpectedBalance {
        account: String,
        expected: u64,
        available: u64,
    },

    #[error("Account not found: {address}")]
    AccountNotFound { address: String },

    /// Account exists but does not hold the expected state
    #[error("Invalid account {address}: {reason}")]
    InvalidAccount { address: String, reason: String },

    #[error("Instruction build failed for {program}: {reason}")]
    InstructionBuild { program: String, reason: String },

    /// Exceeds the ledger's serialized size or instruction ceiling
    #[error("Transaction too large: {size} bytes / {instructions} instructions (limit {max_size} bytes / {max_instructions} instructions)")]
    TransactionTooLarge {
        size: usize,
        max_size: usize,
        instructions: usize,
        max_instructions: usize,
    },

    /// Every configured endpoint failed or timed out
    #[error("All endpoints unavailable for {operation}: {attempts:?}")]
    EndpointUnavailable {
        operation: String,
        attempts: Vec<String>,
    },

    /// An endpoint rejected the request in a way no other endpoint would accept
    #[error("Ledger rejected {operation} at {endpoint}: {reason}")]
    LedgerRejected {
        operation: String,
        endpoint: String,
        reason: String,
    },

    #[error("Simulation failed for {step}: {reason}")]
    SimulationFailed { step: String, reason: String },

    #[error("Rate limited: {identity} (retry after {retry_after_secs}s)")]
    RateLimited {
        identity: String,
        retry_after_secs: u64,
    },

    #[error("Service is shutting down")]
    ShutdownActive,
}

impl TeleburnError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier { .. } => "invalid_identifier",
            Self::InvalidMemo { .. } => "invalid_memo",
            Self::DerivationExhausted { .. } => "derivation_exhausted",
            Self::FrozenAccount { .. } => "frozen_account",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::UnexpectedBalance { .. } => "unexpected_balance",
            Self::AccountNotFound { .. } => "account_not_found",
            Self::InvalidAccount { .. } => "invalid_account",
            Self::InstructionBuild { .. } => "instruction_build",
            Self::TransactionTooLarge { .. } => "transaction_too_large",
            Self::EndpointUnavailable { .. } => "endpoint_unavailable",
            Self::LedgerRejected { .. } => "ledger_rejected",
            Self::SimulationFailed { .. } => "simulation_failed",
            Self::RateLimited { .. } => "rate_limited",
            Self::ShutdownActive => "shutdown_active",
        }
    }

    /// Alternative retire method that avoids this failure, if one exists
    pub fn suggestion(&self) -> Option<RetireMethod> {
        match self {
            Self::FrozenAccount { suggestion, .. } => *suggestion,
            _ => None,
        }
    }

    /// Check if this error is potentially retryable by the caller
    ///
    /// Construction errors are never retryable: retrying a malformed
    /// request produces the same malformed transaction.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EndpointUnavailable { .. } | Self::RateLimited { .. }
        )
    }

    /// Boundary-layer rejections happen before any core logic runs
    pub fn is_boundary_rejection(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::ShutdownActive)
    }
}

// Convenience constructors for common error scenarios
impl TeleburnError {
    pub fn invalid_identifier(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_memo(reason: impl Into<String>) -> Self {
        Self::InvalidMemo {
            reason: reason.into(),
        }
    }

    pub fn account_not_found(address: impl ToString) -> Self {
        Self::AccountNotFound {
            address: address.to_string(),
        }
    }

    pub fn invalid_account(address: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidAccount {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    pub fn instruction_build(program: impl Into<String>, reason: impl ToString) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.to_string(),
        }
    }

    pub fn simulation_failed(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SimulationFailed {
            step: step.into(),
            reason: reason.into(),
        }
    }
}
