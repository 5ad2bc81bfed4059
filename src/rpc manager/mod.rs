//! Ledger access
//!
//! `LedgerClient` is the read/simulate surface of one Solana RPC endpoint.
//! `FailoverLedger` wraps an ordered list of them and retries each read
//! against the next endpoint on retryable failures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    account::Account, hash::Hash, message::VersionedMessage, pubkey::Pubkey,
    transaction::VersionedTransaction,
};

pub mod rpc_errors;
pub mod rpc_failover;
pub mod rpc_ledger;

pub use rpc_errors::LedgerError;
pub use rpc_failover::{FailoverLedger, FailoverSettings, RetryPredicate};
pub use rpc_ledger::RpcLedger;

/// Result of a non-mutating simulation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub err: Option<String>,
    pub logs: Vec<String>,
    pub units_consumed: Option<u64>,
}

impl SimulationOutcome {
    pub fn succeeded(&self) -> bool {
        self.err.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHolding {
    pub address: Pubkey,
    pub amount: u64,
}

/// One entry of an address's signature history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    /// RPC memo summary (`[len] text; ...`), when the node provides it
    pub memo: Option<String>,
    pub failed: bool,
}

/// Memo payloads extracted from a confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMemos {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub memos: Vec<String>,
    pub failed: bool,
}

/// Read and simulate surface of a single ledger endpoint
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Endpoint label used in logs and errors
    fn endpoint(&self) -> &str;

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError>;

    async fn get_latest_blockhash(&self) -> Result<Hash, LedgerError>;

    /// Base fee the cluster would charge for `message`
    async fn get_fee_for_message(&self, message: &VersionedMessage) -> Result<u64, LedgerError>;

    /// Simulate without signature verification, replacing the blockhash
    async fn simulate(&self, tx: &VersionedTransaction) -> Result<SimulationOutcome, LedgerError>;

    async fn get_token_largest_accounts(
        &self,
        mint: &Pubkey,
    ) -> Result<Vec<TokenHolding>, LedgerError>;

    /// Most recent signatures first
    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, LedgerError>;

    /// `None` when the node does not know the transaction
    async fn get_transaction_memos(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionMemos>, LedgerError>;
}
