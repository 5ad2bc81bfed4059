//! Test Utilities Module
//!
//! In-memory ledger and account fixtures for deterministic testing of the
//! builder, dry-run orchestrator and verification service without any
//! network access.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use crate::rpc_manager::{
    FailoverLedger, FailoverSettings, LedgerClient, LedgerError, SignatureInfo, SimulationOutcome,
    TokenHolding, TransactionMemos,
};
use async_trait::async_trait;
use nonempty::NonEmpty;
use parking_lot::Mutex;
use solana_sdk::{
    account::Account, hash::Hash, message::VersionedMessage, pubkey::Pubkey,
    transaction::VersionedTransaction,
};
use spl_token::solana_program::{program_option::COption, program_pack::Pack};
use spl_token::state::{Account as TokenAccount, AccountState, Mint};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default base fee reported by the mock (one signature)
pub const MOCK_BASE_FEE: u64 = 5_000;

#[derive(Default)]
struct MockState {
    accounts: HashMap<Pubkey, Account>,
    largest_accounts: HashMap<Pubkey, Vec<TokenHolding>>,
    signatures: HashMap<Pubkey, Vec<SignatureInfo>>,
    transactions: HashMap<String, TransactionMemos>,
    simulations: VecDeque<SimulationOutcome>,
    simulated: Vec<VersionedTransaction>,
    fail_all: Option<LedgerError>,
    failing_operations: HashMap<&'static str, LedgerError>,
    fee: Option<u64>,
    latency: Option<Duration>,
}

/// In-memory `LedgerClient`
///
/// Every method counts as one call. Failures can be injected for all
/// operations (`fail_all_with`) or a single one (`fail_operation`).
pub struct MockLedger {
    label: String,
    blockhash: Hash,
    calls: AtomicUsize,
    state: Mutex<MockState>,
}

impl MockLedger {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            blockhash: Hash::new_from_array([7u8; 32]),
            calls: AtomicUsize::new(0),
            state: Mutex::new(MockState::default()),
        }
    }

    /// The blockhash every successful `get_latest_blockhash` returns
    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_all_with(&self, err: LedgerError) {
        self.state.lock().fail_all = Some(err);
    }

    pub fn fail_operation(&self, operation: &'static str, err: LedgerError) {
        self.state.lock().failing_operations.insert(operation, err);
    }

    pub fn recover(&self) {
        let mut state = self.state.lock();
        state.fail_all = None;
        state.failing_operations.clear();
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = Some(latency);
    }

    pub fn set_fee(&self, fee: u64) {
        self.state.lock().fee = Some(fee);
    }

    pub fn set_account(&self, address: Pubkey, account: Account) {
        self.state.lock().accounts.insert(address, account);
    }

    pub fn set_largest_accounts(&self, mint: Pubkey, holdings: Vec<TokenHolding>) {
        self.state.lock().largest_accounts.insert(mint, holdings);
    }

    pub fn set_signatures(&self, address: Pubkey, signatures: Vec<SignatureInfo>) {
        self.state.lock().signatures.insert(address, signatures);
    }

    pub fn add_transaction(&self, memos: TransactionMemos) {
        self.state
            .lock()
            .transactions
            .insert(memos.signature.clone(), memos);
    }

    /// Queue the outcome of the next simulation; an empty queue simulates success
    pub fn push_simulation(&self, outcome: SimulationOutcome) {
        self.state.lock().simulations.push_back(outcome);
    }

    /// Transactions submitted to `simulate`, in order
    pub fn simulated(&self) -> Vec<VersionedTransaction> {
        self.state.lock().simulated.clone()
    }

    async fn enter(&self, operation: &'static str) -> Result<(), LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (latency, failure) = {
            let state = self.state.lock();
            let failure = state
                .fail_all
                .clone()
                .or_else(|| state.failing_operations.get(operation).cloned());
            (state.latency, failure)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    fn endpoint(&self) -> &str {
        &self.label
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError> {
        self.enter("get_account").await?;
        Ok(self.state.lock().accounts.get(address).cloned())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, LedgerError> {
        self.enter("get_latest_blockhash").await?;
        Ok(self.blockhash)
    }

    async fn get_fee_for_message(&self, message: &VersionedMessage) -> Result<u64, LedgerError> {
        self.enter("get_fee_for_message").await?;
        let signers = message.header().num_required_signatures as u64;
        Ok(self
            .state
            .lock()
            .fee
            .unwrap_or(MOCK_BASE_FEE * signers.max(1)))
    }

    async fn simulate(&self, tx: &VersionedTransaction) -> Result<SimulationOutcome, LedgerError> {
        self.enter("simulate").await?;
        let mut state = self.state.lock();
        state.simulated.push(tx.clone());
        Ok(state.simulations.pop_front().unwrap_or(SimulationOutcome {
            err: None,
            logs: vec!["Program log: mock simulation".to_string()],
            units_consumed: Some(4_200),
        }))
    }

    async fn get_token_largest_accounts(
        &self,
        mint: &Pubkey,
    ) -> Result<Vec<TokenHolding>, LedgerError> {
        self.enter("get_token_largest_accounts").await?;
        Ok(self
            .state
            .lock()
            .largest_accounts
            .get(mint)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, LedgerError> {
        self.enter("get_signatures_for_address").await?;
        Ok(self
            .state
            .lock()
            .signatures
            .get(address)
            .map(|s| s.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_transaction_memos(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionMemos>, LedgerError> {
        self.enter("get_transaction_memos").await?;
        Ok(self.state.lock().transactions.get(signature).cloned())
    }
}

/// Wrap mocks into a failover ledger with a short timeout
pub fn failover_over(ledgers: &[Arc<MockLedger>]) -> Arc<FailoverLedger> {
    let clients: Vec<Arc<dyn LedgerClient>> = ledgers
        .iter()
        .map(|l| l.clone() as Arc<dyn LedgerClient>)
        .collect();
    let clients = match NonEmpty::from_vec(clients) {
        Some(c) => c,
        None => panic!("failover_over needs at least one ledger"),
    };
    Arc::new(FailoverLedger::new(
        clients,
        FailoverSettings {
            call_timeout: Duration::from_secs(2),
            requests_per_second: None,
        },
    ))
}

/// SPL mint account with the given supply and optional freeze authority
pub fn mint_account(supply: u64, decimals: u8, freeze_authority: Option<Pubkey>) -> Account {
    let mint = Mint {
        mint_authority: COption::None,
        supply,
        decimals,
        is_initialized: true,
        freeze_authority: freeze_authority.map(COption::Some).unwrap_or(COption::None),
    };
    let mut data = vec![0u8; Mint::LEN];
    Mint::pack(mint, &mut data).unwrap();
    Account {
        lamports: 1_461_600,
        data,
        owner: spl_token::id(),
        executable: false,
        rent_epoch: 0,
    }
}

/// SPL token account holding `amount` of `mint` for `owner`
pub fn token_account(mint: Pubkey, owner: Pubkey, amount: u64, frozen: bool) -> Account {
    let account = TokenAccount {
        mint,
        owner,
        amount,
        delegate: COption::None,
        state: if frozen {
            AccountState::Frozen
        } else {
            AccountState::Initialized
        },
        is_native: COption::None,
        delegated_amount: 0,
        close_authority: COption::None,
    };
    let mut data = vec![0u8; TokenAccount::LEN];
    TokenAccount::pack(account, &mut data).unwrap();
    Account {
        lamports: 2_039_280,
        data,
        owner: spl_token::id(),
        executable: false,
        rent_epoch: 0,
    }
}

/// Deterministic inscription id for tests: `<64 x hex_char>i<index>`
pub fn inscription_id(hex_char: char, index: u32) -> String {
    format!("{}i{}", hex_char.to_string().repeat(64), index)
}

/// Signature listing entry without an RPC memo summary
pub fn signature_info(signature: &str, slot: u64) -> SignatureInfo {
    SignatureInfo {
        signature: signature.to_string(),
        slot,
        block_time: Some(1_700_000_000 + slot as i64),
        memo: None,
        failed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_ledger_serves_fixtures() {
        let ledger = MockLedger::new("mock");
        let mint = Pubkey::new_unique();
        ledger.set_account(mint, mint_account(1, 0, None));

        let account = ledger.get_account(&mint).await.unwrap().unwrap();
        let unpacked = Mint::unpack(&account.data).unwrap();
        assert_eq!(unpacked.supply, 1);
        assert!(ledger.get_account(&Pubkey::new_unique()).await.unwrap().is_none());
        assert_eq!(ledger.call_count(), 2);
    }

    #[tokio::test]
    async fn test_operation_failure_injection() {
        let ledger = MockLedger::new("mock");
        ledger.fail_operation("simulate", LedgerError::Fatal("boom".into()));
        assert!(ledger.get_latest_blockhash().await.is_ok());
        ledger.recover();
        assert!(ledger.get_latest_blockhash().await.is_ok());
    }

    #[test]
    fn test_token_account_fixture_roundtrip() {
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let account = token_account(mint, owner, 1, true);
        let unpacked = TokenAccount::unpack(&account.data).unwrap();
        assert_eq!(unpacked.owner, owner);
        assert!(unpacked.is_frozen());
    }
}
