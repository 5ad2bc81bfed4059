//! Sequential endpoint failover
//!
//! Every ledger read goes through [`FailoverLedger::call`], which walks the
//! configured endpoints in order:
//! - each attempt is bounded by the per-call timeout
//! - retryable failures (per the pluggable predicate) move on to the next endpoint
//! - a non-retryable failure stops the walk with `TeleburnError::LedgerRejected`
//! - exhausting the list yields `TeleburnError::EndpointUnavailable`
//!
//! Attempts are never raced against each other, so at most one request per
//! call is outstanding.

use super::{
    LedgerClient, LedgerError, RpcLedger, SignatureInfo, SimulationOutcome, TokenHolding,
    TransactionMemos,
};
use crate::errors::{Result, TeleburnError};
use crate::metrics::metrics;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonempty::NonEmpty;
use solana_sdk::{
    account::Account, hash::Hash, message::VersionedMessage, pubkey::Pubkey,
    transaction::VersionedTransaction,
};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Decides whether a failed attempt may be retried on the next endpoint
pub type RetryPredicate = Arc<dyn Fn(&LedgerError) -> bool + Send + Sync>;

#[derive(Debug, Clone)]
pub struct FailoverSettings {
    /// Upper bound for a single attempt against one endpoint
    pub call_timeout: Duration,
    /// Outbound pacing per endpoint; `None` disables pacing
    pub requests_per_second: Option<NonZeroU32>,
}

impl Default for FailoverSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            requests_per_second: None,
        }
    }
}

struct Endpoint {
    client: Arc<dyn LedgerClient>,
    limiter: Option<DefaultDirectRateLimiter>,
}

pub struct FailoverLedger {
    endpoints: NonEmpty<Endpoint>,
    settings: FailoverSettings,
    retryable: RetryPredicate,
}

impl std::fmt::Debug for FailoverLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverLedger")
            .field("endpoints", &self.endpoint_labels())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl FailoverLedger {
    pub fn new(clients: NonEmpty<Arc<dyn LedgerClient>>, settings: FailoverSettings) -> Self {
        let endpoints = clients.map(|client| Endpoint {
            client,
            limiter: settings
                .requests_per_second
                .map(|rps| RateLimiter::direct(Quota::per_second(rps))),
        });
        Self {
            endpoints,
            settings,
            retryable: Arc::new(LedgerError::is_retryable),
        }
    }

    /// Build one JSON-RPC client per URL, tried in the given order
    pub fn from_urls(urls: &NonEmpty<String>, settings: FailoverSettings) -> Self {
        let timeout = settings.call_timeout;
        let clients = urls.clone().map(|url| {
            Arc::new(RpcLedger::new(url, timeout)) as Arc<dyn LedgerClient>
        });
        Self::new(clients, settings)
    }

    /// Replace the default retry predicate (`LedgerError::is_retryable`)
    pub fn with_retry_predicate(mut self, predicate: RetryPredicate) -> Self {
        self.retryable = predicate;
        self
    }

    pub fn endpoint_labels(&self) -> Vec<String> {
        self.endpoints
            .iter()
            .map(|e| e.client.endpoint().to_string())
            .collect()
    }

    /// Run `op` against each endpoint in order until one succeeds
    pub async fn call<T, F, Fut>(&self, operation: &'static str, op: F) -> Result<T>
    where
        F: Fn(Arc<dyn LedgerClient>) -> Fut,
        Fut: Future<Output = std::result::Result<T, LedgerError>>,
    {
        let mut attempts = Vec::new();
        let timeout = self.settings.call_timeout;

        for (position, endpoint) in self.endpoints.iter().enumerate() {
            let label = endpoint.client.endpoint().to_string();
            if let Some(limiter) = &endpoint.limiter {
                limiter.until_ready().await;
            }

            let outcome = match tokio::time::timeout(timeout, op(endpoint.client.clone())).await {
                Ok(result) => result,
                Err(_) => Err(LedgerError::Timeout {
                    endpoint: label.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };

            match outcome {
                Ok(value) => {
                    if position > 0 {
                        info!(
                            operation,
                            endpoint = %label,
                            failed_endpoints = position,
                            "Ledger read succeeded after failover"
                        );
                    } else {
                        debug!(operation, endpoint = %label, "Ledger read succeeded");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let retryable = (self.retryable)(&err);
                    warn!(
                        operation,
                        endpoint = %label,
                        error = %err,
                        category = err.category(),
                        retryable,
                        "Ledger read failed"
                    );
                    if !retryable {
                        return Err(TeleburnError::LedgerRejected {
                            operation: operation.to_string(),
                            endpoint: label,
                            reason: err.to_string(),
                        });
                    }
                    attempts.push(format!("{}: {}", label, err));
                    metrics().endpoint_failovers.inc();
                }
            }
        }

        Err(TeleburnError::EndpointUnavailable {
            operation: operation.to_string(),
            attempts,
        })
    }

    pub async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>> {
        let address = *address;
        self.call("get_account", move |c| async move { c.get_account(&address).await })
            .await
    }

    pub async fn get_latest_blockhash(&self) -> Result<Hash> {
        self.call("get_latest_blockhash", |c| async move {
            c.get_latest_blockhash().await
        })
        .await
    }

    pub async fn get_fee_for_message(&self, message: &VersionedMessage) -> Result<u64> {
        self.call("get_fee_for_message", move |c| async move {
            c.get_fee_for_message(message).await
        })
        .await
    }

    pub async fn simulate(&self, tx: &VersionedTransaction) -> Result<SimulationOutcome> {
        self.call("simulate", move |c| async move { c.simulate(tx).await })
            .await
    }

    pub async fn get_token_largest_accounts(&self, mint: &Pubkey) -> Result<Vec<TokenHolding>> {
        let mint = *mint;
        self.call("get_token_largest_accounts", move |c| async move {
            c.get_token_largest_accounts(&mint).await
        })
        .await
    }

    pub async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>> {
        let address = *address;
        self.call("get_signatures_for_address", move |c| async move {
            c.get_signatures_for_address(&address, limit).await
        })
        .await
    }

    pub async fn get_transaction_memos(&self, signature: &str) -> Result<Option<TransactionMemos>> {
        self.call("get_transaction_memos", move |c| async move {
            c.get_transaction_memos(signature).await
        })
        .await
    }
}
