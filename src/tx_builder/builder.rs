//! Core TxBuilder implementation
//!
//! Reads mint and holder state through the failover ledger, applies the
//! retire preconditions, plans instructions and compiles a V0 message.
//! The only network calls are reads: account info, recent blockhash and the
//! fee quote.

use super::instructions::{
    burn_instructions, memo_instruction, plan_instructions, sanity_check_ix_order,
    sink_instructions, InstructionPlan, RetireAccounts,
};
use super::output::{unsigned_transaction, BuiltTransaction, TransactionKind};
use super::{
    DEFAULT_UNITS_PER_INSTRUCTION, LAMPORTS_PER_SIGNATURE, MAX_COMPUTE_UNITS, MAX_INSTRUCTIONS,
    MAX_TRANSACTION_SIZE,
};
use crate::config::BuilderConfig;
use crate::derivation;
use crate::errors::{Result, TeleburnError};
use crate::identifier::InscriptionId;
use crate::memo::{self, LegacyMemo};
use crate::metrics::metrics;
use crate::rpc_manager::FailoverLedger;
use crate::structured_logging::OperationContext;
use crate::types::RetireMethod;
use solana_sdk::{
    instruction::Instruction,
    message::{v0::Message as MessageV0, VersionedMessage},
    pubkey::Pubkey,
};
use spl_associated_token_account::get_associated_token_address;
use spl_token::solana_program::{program_option::COption, program_pack::Pack};
use spl_token::state::{Account as TokenAccount, Mint};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Per-builder transaction policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionConfig {
    /// Micro-lamports per compute unit; 0 omits the price instruction
    pub priority_fee_micro_lamports: u64,
    /// 0 omits the limit instruction
    pub compute_unit_limit: u32,
    pub allow_non_unit_balance: bool,
    pub domain_tag: String,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self::from(&BuilderConfig::default())
    }
}

impl From<&BuilderConfig> for TransactionConfig {
    fn from(config: &BuilderConfig) -> Self {
        Self {
            priority_fee_micro_lamports: config.priority_fee_micro_lamports,
            compute_unit_limit: config.compute_unit_limit,
            allow_non_unit_balance: config.allow_non_unit_balance,
            domain_tag: config.domain_tag.clone(),
        }
    }
}

/// Outcome of the retire preconditions for one holder account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetirePreflight {
    /// Units to burn or transfer
    pub amount: u64,
    /// Prepend a thaw (owner is the mint's freeze authority)
    pub thaw: bool,
}

impl RetirePreflight {
    /// Check frozen state and balance of `holding` for `method`
    pub fn evaluate(
        method: RetireMethod,
        owner: &Pubkey,
        source: &Pubkey,
        mint: &Mint,
        holding: &TokenAccount,
        allow_non_unit_balance: bool,
    ) -> Result<Self> {
        let mut thaw = false;
        if holding.is_frozen() {
            let can_thaw = mint.freeze_authority == COption::Some(*owner);
            if method.burns() && can_thaw {
                thaw = true;
            } else {
                let suggestion = (method == RetireMethod::TransferToSink && can_thaw)
                    .then_some(RetireMethod::DirectBurn);
                return Err(TeleburnError::FrozenAccount {
                    account: source.to_string(),
                    method,
                    suggestion,
                });
            }
        }

        match holding.amount {
            0 => Err(TeleburnError::InsufficientBalance {
                account: source.to_string(),
                required: 1,
                available: 0,
            }),
            1 => Ok(Self { amount: 1, thaw }),
            n if allow_non_unit_balance => Ok(Self { amount: n, thaw }),
            n => Err(TeleburnError::UnexpectedBalance {
                account: source.to_string(),
                expected: 1,
                available: n,
            }),
        }
    }
}

/// Priority fee in lamports for a plan, rounding micro-lamports up
pub fn priority_fee_lamports(cu_limit: u32, price_micro_lamports: u64, body_len: usize) -> u64 {
    let units = if cu_limit > 0 {
        cu_limit as u64
    } else {
        (DEFAULT_UNITS_PER_INSTRUCTION * body_len as u64).min(MAX_COMPUTE_UNITS)
    };
    (units as u128 * price_micro_lamports as u128).div_ceil(1_000_000) as u64
}

/// Builds unsigned seal, retire and metadata-update transactions
#[derive(Debug, Clone)]
pub struct TxBuilder {
    ledger: Arc<FailoverLedger>,
    config: TransactionConfig,
}

impl TxBuilder {
    pub fn new(ledger: Arc<FailoverLedger>, config: TransactionConfig) -> Self {
        Self { ledger, config }
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<FailoverLedger> {
        &self.ledger
    }

    /// Override the priority fee rate for transactions built from here on
    pub fn with_priority_fee(mut self, micro_lamports: u64) -> Self {
        self.config.priority_fee_micro_lamports = micro_lamports;
        self
    }

    /// Seal: one memo recording the intent to teleburn `mint` to `identifier`
    #[instrument(skip(self), fields(payer = %payer, mint = %mint))]
    pub async fn build_seal(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
        identifier: &str,
    ) -> Result<BuiltTransaction> {
        let ctx = OperationContext::new("build_seal");
        let kind = TransactionKind::Seal;
        let result = async {
            let id = InscriptionId::parse(identifier)?;
            self.load_mint(mint).await?;

            let record = LegacyMemo::seal(id, mint).to_json();
            let body = vec![memo_instruction(&record, &[payer])];
            let description = format!("Seal mint {} to inscription {}", mint, id);
            self.finalize(&ctx, kind, payer, mint, body, description).await
        }
        .await;
        self.record_failure(&ctx, kind, mint, result)
    }

    /// Retire `mint` held by `owner` using `method`
    #[instrument(skip(self), fields(payer = %payer, owner = %owner, mint = %mint, method = %method))]
    pub async fn build_retire(
        &self,
        payer: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
        identifier: &str,
        method: RetireMethod,
    ) -> Result<BuiltTransaction> {
        let ctx = OperationContext::new("build_retire");
        let kind = TransactionKind::Retire { method };
        let result = async {
            let id = InscriptionId::parse(identifier)?;
            let derived = match method {
                RetireMethod::DeriveAndBind => {
                    Some(derivation::derive(&id, &self.config.domain_tag)?)
                }
                _ => None,
            };

            let mint_state = self.load_mint(mint).await?;
            let source = get_associated_token_address(owner, mint);
            let holding = self.load_holding(&source, owner, mint).await?;
            let preflight = RetirePreflight::evaluate(
                method,
                owner,
                &source,
                &mint_state,
                &holding,
                self.config.allow_non_unit_balance,
            )?;

            let accounts = RetireAccounts {
                payer: *payer,
                owner: *owner,
                mint: *mint,
                source,
                amount: preflight.amount,
                decimals: mint_state.decimals,
            };
            let mut body = match method {
                RetireMethod::DirectBurn | RetireMethod::DeriveAndBind => {
                    burn_instructions(&accounts, preflight.thaw)?
                }
                RetireMethod::TransferToSink => sink_instructions(&accounts)?,
            };
            body.push(memo_instruction(&memo::encode(&id), &[owner]));
            if let Some(derived) = &derived {
                let record =
                    LegacyMemo::derived_binding(id, mint, derived, &self.config.domain_tag);
                body.push(memo_instruction(&record.to_json(), &[owner]));
            }

            let mut description = format!(
                "Retire {} unit(s) of mint {} via {} for inscription {}",
                preflight.amount, mint, method, id
            );
            if preflight.thaw {
                description.push_str(" (thaws the frozen account first)");
            }
            if let Some(derived) = &derived {
                description.push_str(&format!(
                    "; binds derived address {} (bump {})",
                    derived.address, derived.bump
                ));
            }

            self.finalize(&ctx, kind, payer, mint, body, description).await
        }
        .await;
        self.record_failure(&ctx, kind, mint, result)
    }

    /// Wrap caller-supplied metadata instructions into a checked transaction
    pub async fn build_metadata_update(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
        instructions: Vec<Instruction>,
    ) -> Result<BuiltTransaction> {
        let ctx = OperationContext::new("build_metadata_update");
        let kind = TransactionKind::MetadataUpdate;
        let description = format!(
            "Update metadata of mint {} ({} instruction(s))",
            mint,
            instructions.len()
        );
        let result = self
            .finalize(&ctx, kind, payer, mint, instructions, description)
            .await;
        self.record_failure(&ctx, kind, mint, result)
    }

    async fn load_mint(&self, mint: &Pubkey) -> Result<Mint> {
        let account = self
            .ledger
            .get_account(mint)
            .await?
            .ok_or_else(|| TeleburnError::account_not_found(mint))?;
        if account.owner != spl_token::id() {
            return Err(TeleburnError::invalid_account(
                mint,
                format!("owned by {}, not the SPL Token program", account.owner),
            ));
        }
        Mint::unpack(&account.data)
            .map_err(|e| TeleburnError::invalid_account(mint, format!("not a token mint: {}", e)))
    }

    async fn load_holding(
        &self,
        source: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<TokenAccount> {
        let account = self
            .ledger
            .get_account(source)
            .await?
            .ok_or_else(|| TeleburnError::account_not_found(source))?;
        let holding = TokenAccount::unpack(&account.data).map_err(|e| {
            TeleburnError::invalid_account(source, format!("not a token account: {}", e))
        })?;
        if holding.mint != *mint || holding.owner != *owner {
            return Err(TeleburnError::invalid_account(
                source,
                format!("holds mint {} for owner {}", holding.mint, holding.owner),
            ));
        }
        Ok(holding)
    }

    async fn finalize(
        &self,
        ctx: &OperationContext,
        kind: TransactionKind,
        payer: &Pubkey,
        mint: &Pubkey,
        body: Vec<Instruction>,
        description: String,
    ) -> Result<BuiltTransaction> {
        let plan = plan_instructions(
            self.config.compute_unit_limit,
            self.config.priority_fee_micro_lamports,
            body,
        )?;
        sanity_check_ix_order(&plan.instructions)?;

        let recent_blockhash = self.ledger.get_latest_blockhash().await?;
        let message = MessageV0::try_compile(payer, &plan.instructions, &[], recent_blockhash)
            .map_err(|e| TeleburnError::instruction_build("message", e))?;
        let message = VersionedMessage::V0(message);

        let serialized_size = bincode::serialized_size(&unsigned_transaction(&message))
            .map_err(|e| TeleburnError::instruction_build("transaction", e))?
            as usize;
        if serialized_size > MAX_TRANSACTION_SIZE || plan.instructions.len() > MAX_INSTRUCTIONS {
            return Err(TeleburnError::TransactionTooLarge {
                size: serialized_size,
                max_size: MAX_TRANSACTION_SIZE,
                instructions: plan.instructions.len(),
                max_instructions: MAX_INSTRUCTIONS,
            });
        }

        let estimated_fee = self.estimate_fee(&message, &plan).await;
        let built = BuiltTransaction {
            kind,
            required_signers: BuiltTransaction::required_signers_of(&message),
            instructions: plan.instructions,
            fee_payer: *payer,
            estimated_fee,
            description,
            recent_blockhash,
            message,
            serialized_size,
        };

        metrics()
            .transactions_built
            .with_label_values(&[kind.label()])
            .inc();
        ctx.logger.log_transaction_built(
            kind.label(),
            &mint.to_string(),
            built.instructions.len(),
            built.serialized_size,
            built.estimated_fee,
        );
        Ok(built)
    }

    async fn estimate_fee(&self, message: &VersionedMessage, plan: &InstructionPlan) -> u64 {
        let signatures = message.header().num_required_signatures as u64;
        let base = match self.ledger.get_fee_for_message(message).await {
            Ok(fee) => fee,
            Err(e) => {
                warn!(error = %e, "Fee quote unavailable, using per-signature base fee");
                LAMPORTS_PER_SIGNATURE * signatures
            }
        };
        let priority = priority_fee_lamports(
            self.config.compute_unit_limit,
            self.config.priority_fee_micro_lamports,
            plan.body().len(),
        );
        debug!(base, priority, "Fee estimated");
        base + priority
    }

    fn record_failure<T>(
        &self,
        ctx: &OperationContext,
        kind: TransactionKind,
        mint: &Pubkey,
        result: Result<T>,
    ) -> Result<T> {
        if let Err(e) = &result {
            metrics()
                .transaction_build_failures
                .with_label_values(&[e.kind()])
                .inc();
            ctx.logger
                .log_build_rejected(kind.label(), &mint.to_string(), e.kind(), &e.to_string());
        }
        result
    }
}
