//! Integration tests for teleburn status resolution
//!
//! Covers the status/confidence table end to end through the public API,
//! including degraded ledgers and sink-held supply.

use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use teleburn::memo;
use teleburn::rpc_manager::{LedgerError, TokenHolding, TransactionMemos};
use teleburn::test_utils::{
    failover_over, inscription_id, mint_account, signature_info, token_account, MockLedger,
};
use teleburn::tx_builder::{sink_token_account, SINK_OWNER};
use teleburn::verification::{Confidence, TeleburnStatus, VerificationService};
use teleburn::{InscriptionId, RetireMethod};

fn service(ledger: &Arc<MockLedger>) -> VerificationService {
    VerificationService::new(failover_over(&[ledger.clone()]), 25)
}

/// Zero-supply mint whose history holds one transaction with `memos`
fn burned_mint(ledger: &MockLedger, memos: Vec<String>) -> Pubkey {
    let mint = Pubkey::new_unique();
    ledger.set_account(mint, mint_account(0, 0, None));
    ledger.set_signatures(mint, vec![signature_info("retire-sig", 42)]);
    ledger.add_transaction(TransactionMemos {
        signature: "retire-sig".into(),
        slot: 42,
        block_time: Some(1_700_000_042),
        memos,
        failed: false,
    });
    mint
}

#[tokio::test]
async fn test_zero_supply_without_memo_is_burned_low() {
    let ledger = Arc::new(MockLedger::new("mock"));
    let mint = Pubkey::new_unique();
    ledger.set_account(mint, mint_account(0, 0, None));

    let result = service(&ledger).resolve(&mint).await;

    assert_eq!(result.status, TeleburnStatus::Burned);
    assert_eq!(result.confidence, Confidence::Low);
    assert_eq!(result.supply, Some(0));
    assert!(result.identifier.is_none());
}

#[tokio::test]
async fn test_matching_memo_never_lowers_confidence() {
    let id = inscription_id('e', 0);

    let bare = Arc::new(MockLedger::new("bare"));
    let bare_mint = burned_mint(&bare, vec!["unrelated note".into()]);
    let without = service(&bare).resolve(&bare_mint).await;

    let proven = Arc::new(MockLedger::new("proven"));
    let proven_mint = burned_mint(&proven, vec![memo::encode_str(&id).unwrap()]);
    let with = service(&proven).resolve(&proven_mint).await;

    assert_eq!(without.status, TeleburnStatus::Burned);
    assert_eq!(with.status, TeleburnStatus::OfficialTeleburn);
    assert!(with.confidence >= without.confidence);
    assert_eq!(with.confidence, Confidence::High);
    assert_eq!(with.slot, Some(42));
    assert_eq!(with.block_time, Some(1_700_000_042));
}

#[tokio::test]
async fn test_failed_transactions_are_not_evidence() {
    let ledger = Arc::new(MockLedger::new("mock"));
    let mint = Pubkey::new_unique();
    ledger.set_account(mint, mint_account(0, 0, None));
    let mut failed = signature_info("failed-sig", 50);
    failed.failed = true;
    failed.memo = Some(format!("[{}] teleburn:{}", 9 + 66, inscription_id('f', 0)));
    ledger.set_signatures(mint, vec![failed]);

    let result = service(&ledger).resolve(&mint).await;

    assert_eq!(result.status, TeleburnStatus::Burned);
    assert_eq!(result.confidence, Confidence::Low);
}

#[tokio::test]
async fn test_rpc_memo_summary_is_used_without_fetching_transaction() {
    let ledger = Arc::new(MockLedger::new("mock"));
    let mint = Pubkey::new_unique();
    ledger.set_account(mint, mint_account(0, 0, None));
    let canonical = memo::encode_str(&inscription_id('1', 7)).unwrap();
    let mut info = signature_info("summary-sig", 9);
    info.memo = Some(format!("[{}] {}", canonical.len(), canonical));
    ledger.set_signatures(mint, vec![info]);
    ledger.fail_operation(
        "get_transaction_memos",
        LedgerError::Fatal("should not be called".into()),
    );

    let result = service(&ledger).resolve(&mint).await;

    assert_eq!(result.status, TeleburnStatus::OfficialTeleburn);
    assert_eq!(result.identifier, Some(inscription_id('1', 7)));
}

#[tokio::test]
async fn test_supply_held_by_sink_counts_as_destroyed() {
    let ledger = Arc::new(MockLedger::new("mock"));
    let mint = Pubkey::new_unique();
    let sink = sink_token_account(&mint);
    ledger.set_account(mint, mint_account(1, 0, None));
    ledger.set_largest_accounts(
        mint,
        vec![TokenHolding {
            address: sink,
            amount: 1,
        }],
    );
    ledger.set_account(sink, token_account(mint, SINK_OWNER, 1, false));

    let result = service(&ledger).resolve(&mint).await;

    assert_eq!(result.status, TeleburnStatus::Burned);
    assert_eq!(result.method, Some(RetireMethod::TransferToSink));
    assert_eq!(result.supply, Some(1));
}

#[tokio::test]
async fn test_unreachable_ledger_is_unknown_low() {
    let ledger = Arc::new(MockLedger::new("mock"));
    ledger.fail_all_with(LedgerError::Transport {
        endpoint: "mock".into(),
        message: "connection reset".into(),
    });
    let mint = Pubkey::new_unique();

    let result = service(&ledger).resolve(&mint).await;

    assert_eq!(result.status, TeleburnStatus::Unknown);
    assert_eq!(result.confidence, Confidence::Low);
    assert!(!result.notes.is_empty());
}

#[tokio::test]
async fn test_resolve_address_rejects_garbage() {
    let ledger = Arc::new(MockLedger::new("mock"));
    let err = service(&ledger).resolve_address("not-a-mint").await.unwrap_err();
    assert_eq!(err.kind(), "invalid_account");
    assert_eq!(ledger.call_count(), 0);
}

#[tokio::test]
async fn test_identifier_round_trips_through_result() {
    let id = InscriptionId::parse(&inscription_id('9', 12)).unwrap();
    let ledger = Arc::new(MockLedger::new("mock"));
    let mint = burned_mint(&ledger, vec![memo::encode(&id)]);

    let result = service(&ledger).resolve(&mint).await;

    let reported = InscriptionId::parse(result.identifier.as_deref().unwrap()).unwrap();
    assert_eq!(reported, id);
}
