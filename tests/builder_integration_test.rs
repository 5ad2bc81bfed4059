//! Integration tests for seal and retire construction
//!
//! Builds transactions through the public API and inspects them the way a
//! wallet would: decoded instructions, required signers, serialized form.

use base64::Engine;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use spl_associated_token_account::get_associated_token_address;
use std::sync::Arc;
use teleburn::dry_run::decode::{decode_all, DecodedInstruction};
use teleburn::errors::TeleburnError;
use teleburn::memo;
use teleburn::test_utils::{failover_over, inscription_id, mint_account, token_account, MockLedger};
use teleburn::tx_builder::{TransactionConfig, TxBuilder, MAX_TRANSACTION_SIZE, MEMO_PROGRAM_ID};
use teleburn::RetireMethod;

struct Fixture {
    ledger: Arc<MockLedger>,
    builder: TxBuilder,
    owner: Pubkey,
    mint: Pubkey,
}

fn fixture(frozen: bool) -> Fixture {
    let ledger = Arc::new(MockLedger::new("mock"));
    let owner = Pubkey::new_unique();
    let mint = Pubkey::new_unique();
    ledger.set_account(mint, mint_account(1, 0, None));
    ledger.set_account(
        get_associated_token_address(&owner, &mint),
        token_account(mint, owner, 1, frozen),
    );
    let builder = TxBuilder::new(failover_over(&[ledger.clone()]), TransactionConfig::default());
    Fixture {
        ledger,
        builder,
        owner,
        mint,
    }
}

fn instruction_names(decoded: &[DecodedInstruction]) -> Vec<String> {
    decoded
        .iter()
        .map(|ix| match ix {
            DecodedInstruction::KnownProgram {
                name, instruction, ..
            } => format!("{}:{}", name, instruction),
            DecodedInstruction::Unknown { program_id, .. } => format!("unknown:{}", program_id),
        })
        .collect()
}

#[tokio::test]
async fn test_transfer_to_sink_on_frozen_account_returns_no_transaction() {
    let f = fixture(true);
    let result = f
        .builder
        .build_retire(
            &f.owner,
            &f.owner,
            &f.mint,
            &inscription_id('c', 0),
            RetireMethod::TransferToSink,
        )
        .await;

    match result {
        Err(TeleburnError::FrozenAccount { method, .. }) => {
            assert_eq!(method, RetireMethod::TransferToSink);
        }
        other => panic!("expected FrozenAccount, got {:?}", other.map(|b| b.description)),
    }
    assert!(f.ledger.simulated().is_empty());
}

#[tokio::test]
async fn test_direct_burn_memo_is_canonical_and_last_body_instruction() {
    let f = fixture(false);
    let id = inscription_id('b', 4);
    let built = f
        .builder
        .build_retire(&f.owner, &f.owner, &f.mint, &id, RetireMethod::DirectBurn)
        .await
        .unwrap();

    let names = instruction_names(&decode_all(&built.instructions));
    assert!(names[0].starts_with("Compute Budget:"));
    assert!(names.iter().any(|n| n.ends_with(":burnChecked")));
    assert!(names.iter().any(|n| n.ends_with(":closeAccount")));

    let memo_ix = built.instructions.last().unwrap();
    assert_eq!(memo_ix.program_id, MEMO_PROGRAM_ID);
    let decoded = memo::decode_bytes(&memo_ix.data).unwrap();
    assert_eq!(decoded.identifier.to_string(), id);
    assert!(decoded.format.is_current());

    assert_eq!(built.fee_payer, f.owner);
    assert_eq!(built.required_signers, vec![f.owner]);
    assert!(built.serialized_size <= MAX_TRANSACTION_SIZE);
}

#[tokio::test]
async fn test_separate_payer_signs_alongside_owner() {
    let f = fixture(false);
    let payer = Pubkey::new_unique();
    let built = f
        .builder
        .build_retire(
            &payer,
            &f.owner,
            &f.mint,
            &inscription_id('a', 1),
            RetireMethod::TransferToSink,
        )
        .await
        .unwrap();

    assert_eq!(built.fee_payer, payer);
    assert_eq!(built.required_signers[0], payer);
    assert!(built.required_signers.contains(&f.owner));
}

#[tokio::test]
async fn test_summary_carries_decodable_unsigned_transaction() {
    let f = fixture(false);
    let built = f
        .builder
        .build_seal(&f.owner, &f.mint, &inscription_id('0', 0))
        .await
        .unwrap();

    let summary = built.summary().unwrap();
    let json = serde_json::to_value(&summary).unwrap();
    let encoded = json["transactionBase64"].as_str().unwrap();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .unwrap();
    let tx: VersionedTransaction = bincode::deserialize(&bytes).unwrap();

    assert_eq!(tx.message.recent_blockhash(), &f.ledger.blockhash());
    assert_eq!(bytes.len(), built.serialized_size);
}

#[tokio::test]
async fn test_unknown_mint_is_reported() {
    let f = fixture(false);
    let stranger = Pubkey::new_unique();
    let err = f
        .builder
        .build_seal(&f.owner, &stranger, &inscription_id('a', 0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "account_not_found");
}
