//! `LedgerClient` backed by the Solana JSON-RPC client

use super::{LedgerClient, LedgerError, SignatureInfo, SimulationOutcome, TokenHolding, TransactionMemos};
use crate::dry_run::decode::is_memo_program;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_rpc_client_api::config::{RpcSimulateTransactionConfig, RpcTransactionConfig};
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash,
    message::VersionedMessage, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::UiTransactionEncoding;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct RpcLedger {
    url: String,
    client: RpcClient,
    commitment: CommitmentConfig,
}

impl std::fmt::Debug for RpcLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedger")
            .field("url", &self.url)
            .field("commitment", &self.commitment)
            .finish_non_exhaustive()
    }
}

impl RpcLedger {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let url = url.into();
        let commitment = CommitmentConfig::confirmed();
        Self {
            client: RpcClient::new_with_timeout_and_commitment(url.clone(), timeout, commitment),
            url,
            commitment,
        }
    }

    fn err(&self, e: solana_client::client_error::ClientError) -> LedgerError {
        LedgerError::from_client_error(e, &self.url)
    }

    fn decode_err(&self, message: impl Into<String>) -> LedgerError {
        LedgerError::Decode {
            endpoint: self.url.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    fn endpoint(&self) -> &str {
        &self.url
    }

    #[instrument(skip(self), fields(endpoint = %self.url))]
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| self.err(e))?;
        Ok(response.value)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, LedgerError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| self.err(e))
    }

    async fn get_fee_for_message(&self, message: &VersionedMessage) -> Result<u64, LedgerError> {
        let fee = match message {
            VersionedMessage::Legacy(m) => self.client.get_fee_for_message(m).await,
            VersionedMessage::V0(m) => self.client.get_fee_for_message(m).await,
        };
        fee.map_err(|e| self.err(e))
    }

    #[instrument(skip(self, tx), fields(endpoint = %self.url))]
    async fn simulate(&self, tx: &VersionedTransaction) -> Result<SimulationOutcome, LedgerError> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: true,
            commitment: Some(self.commitment),
            ..Default::default()
        };
        let response = self
            .client
            .simulate_transaction_with_config(tx, config)
            .await
            .map_err(|e| self.err(e))?;

        let result = response.value;
        debug!(
            err = ?result.err,
            units = ?result.units_consumed,
            "Simulation response"
        );
        Ok(SimulationOutcome {
            err: result.err.map(|e| format!("{:?}", e)),
            logs: result.logs.unwrap_or_default(),
            units_consumed: result.units_consumed,
        })
    }

    async fn get_token_largest_accounts(
        &self,
        mint: &Pubkey,
    ) -> Result<Vec<TokenHolding>, LedgerError> {
        let balances = self
            .client
            .get_token_largest_accounts(mint)
            .await
            .map_err(|e| self.err(e))?;

        balances
            .into_iter()
            .map(|b| {
                let address = Pubkey::from_str(&b.address)
                    .map_err(|e| self.decode_err(format!("holder address: {}", e)))?;
                let amount = b
                    .amount
                    .amount
                    .parse::<u64>()
                    .map_err(|e| self.decode_err(format!("holder amount: {}", e)))?;
                Ok(TokenHolding { address, amount })
            })
            .collect()
    }

    #[instrument(skip(self), fields(endpoint = %self.url))]
    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, LedgerError> {
        let config = GetConfirmedSignaturesForAddress2Config {
            limit: Some(limit),
            commitment: Some(self.commitment),
            ..Default::default()
        };
        let statuses = self
            .client
            .get_signatures_for_address_with_config(address, config)
            .await
            .map_err(|e| self.err(e))?;

        Ok(statuses
            .into_iter()
            .map(|s| SignatureInfo {
                signature: s.signature,
                slot: s.slot,
                block_time: s.block_time,
                memo: s.memo,
                failed: s.err.is_some(),
            })
            .collect())
    }

    async fn get_transaction_memos(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionMemos>, LedgerError> {
        let sig = Signature::from_str(signature)
            .map_err(|e| LedgerError::Fatal(format!("invalid signature {}: {}", signature, e)))?;
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };

        let confirmed = match self.client.get_transaction_with_config(&sig, config).await {
            Ok(tx) => tx,
            Err(e) => {
                let err = self.err(e);
                // Unknown transactions come back as a null result, not a failure
                if err.to_string().to_lowercase().contains("invalid type: null") {
                    return Ok(None);
                }
                return Err(err);
            }
        };

        let failed = confirmed
            .transaction
            .meta
            .as_ref()
            .map(|m| m.err.is_some())
            .unwrap_or(false);
        let tx = confirmed
            .transaction
            .transaction
            .decode()
            .ok_or_else(|| self.decode_err("transaction payload could not be decoded"))?;

        let keys = tx.message.static_account_keys();
        let memos = tx
            .message
            .instructions()
            .iter()
            .filter(|ix| {
                keys.get(ix.program_id_index as usize)
                    .map(is_memo_program)
                    .unwrap_or(false)
            })
            .filter_map(|ix| String::from_utf8(ix.data.clone()).ok())
            .collect();

        Ok(Some(TransactionMemos {
            signature: signature.to_string(),
            slot: confirmed.slot,
            block_time: confirmed.block_time,
            memos,
            failed,
        }))
    }
}
