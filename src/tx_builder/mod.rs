//! Unsigned transaction construction for seal and retire
//!
//! The module is split into focused parts:
//! - **instructions**: instruction planning (compute budget → body) and the
//!   SPL / memo instruction sets for each retire method
//! - **builder**: `TxBuilder`, which reads mint and holder state through the
//!   failover ledger, applies preconditions and compiles the message
//! - **output**: `BuiltTransaction`, the caller-owned result
//!
//! Nothing here signs or broadcasts. Every built transaction is checked
//! against the ledger's size and instruction ceilings before it is returned.

use solana_sdk::{pubkey, pubkey::Pubkey};

mod builder;
pub mod instructions;
mod output;

pub use builder::{RetirePreflight, TransactionConfig, TxBuilder};
pub use instructions::{
    memo_instruction, plan_instructions, sanity_check_ix_order, sink_token_account,
    InstructionPlan, RetireAccounts,
};
pub use output::{BuiltTransaction, TransactionKind, TransactionSummary};

/// SPL Memo program (v2), used for every memo this crate writes
pub const MEMO_PROGRAM_ID: Pubkey = pubkey!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");

/// SPL Memo program (v1); still recognised when reading history
pub const MEMO_V1_PROGRAM_ID: Pubkey = pubkey!("Memo1UhkJRfHyvLMcVucJwxXeuD728EqVDDwQDxFMNo");

/// Incinerator: well-known owner with no private key
pub const SINK_OWNER: Pubkey = pubkey!("1nc1nerator11111111111111111111111111111111");

/// Maximum serialized transaction size (one network packet)
pub const MAX_TRANSACTION_SIZE: usize = 1232;

/// Instruction ceiling enforced before a transaction is returned
pub const MAX_INSTRUCTIONS: usize = 64;

/// Runtime default compute units per non-budget instruction
pub const DEFAULT_UNITS_PER_INSTRUCTION: u64 = 200_000;

/// Runtime cap on compute units per transaction
pub const MAX_COMPUTE_UNITS: u64 = 1_400_000;

/// Base fee per signature used when the ledger cannot quote one
pub const LAMPORTS_PER_SIGNATURE: u64 = 5_000;
