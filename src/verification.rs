//! Teleburn status resolution
//!
//! `VerificationService::resolve` reconstructs the status of a mint from
//! chain facts only:
//! 1. mint supply (zero, or the whole supply held by the sink, means destroyed)
//! 2. for destroyed mints, recent signature history scanned for teleburn memos
//! 3. internal consistency of the memos found (identifier agreement, recorded
//!    mint, derived-address re-derivation, optional content digest)
//!
//! Nothing is cached between calls. Endpoint exhaustion degrades to
//! `unknown`/`low` instead of failing.

use crate::derivation;
use crate::errors::{Result, TeleburnError};
use crate::identifier::InscriptionId;
use crate::inscription::ContentFetcher;
use crate::memo::{self, DecodedMemo, LegacyMemo, MemoAction, MemoFormat};
use crate::metrics::metrics;
use crate::rpc_manager::{FailoverLedger, SignatureInfo};
use crate::structured_logging::OperationContext;
use crate::tx_builder::SINK_OWNER;
use crate::types::RetireMethod;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::{Account as TokenAccount, Mint};
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TeleburnStatus {
    Active,
    Burned,
    OfficialTeleburn,
    Unknown,
}

impl TeleburnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Burned => "burned",
            Self::OfficialTeleburn => "officialTeleburn",
            Self::Unknown => "unknown",
        }
    }
}

/// Ordered: `Low < Medium < High`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub mint: String,
    pub status: TeleburnStatus,
    pub confidence: Confidence,
    pub supply: Option<u64>,
    pub method: Option<RetireMethod>,
    pub identifier: Option<String>,
    pub memo_format: Option<MemoFormat>,
    pub signature: Option<String>,
    pub slot: Option<u64>,
    pub block_time: Option<i64>,
    pub derived_address: Option<String>,
    pub media_verified: Option<bool>,
    pub notes: Vec<String>,
}

impl VerificationResult {
    fn new(mint: &Pubkey, status: TeleburnStatus, confidence: Confidence) -> Self {
        Self {
            mint: mint.to_string(),
            status,
            confidence,
            supply: None,
            method: None,
            identifier: None,
            memo_format: None,
            signature: None,
            slot: None,
            block_time: None,
            derived_address: None,
            media_verified: None,
            notes: Vec::new(),
        }
    }

    fn unknown(mint: &Pubkey, note: String) -> Self {
        let mut result = Self::new(mint, TeleburnStatus::Unknown, Confidence::Low);
        result.notes.push(note);
        result
    }

    fn downgrade(&mut self, to: Confidence, note: String) {
        self.confidence = self.confidence.min(to);
        self.notes.push(note);
    }
}

/// Teleburn memos of one successful transaction
#[derive(Debug, Clone)]
struct MemoEvidence {
    signature: String,
    slot: u64,
    block_time: Option<i64>,
    memos: Vec<DecodedMemo>,
}

enum Destruction {
    Burned,
    HeldBySink,
}

pub struct VerificationService {
    ledger: Arc<FailoverLedger>,
    signature_limit: usize,
    accepted_domain_tags: Vec<String>,
    content: Option<Arc<dyn ContentFetcher>>,
}

impl VerificationService {
    pub fn new(ledger: Arc<FailoverLedger>, signature_limit: usize) -> Self {
        Self {
            ledger,
            signature_limit,
            accepted_domain_tags: vec![derivation::DEFAULT_DOMAIN_TAG.to_string()],
            content: None,
        }
    }

    pub fn with_accepted_domain_tags(mut self, tags: Vec<String>) -> Self {
        self.accepted_domain_tags = tags;
        self
    }

    /// Cross-check recorded media digests against fetched inscription content
    pub fn with_content_fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.content = Some(fetcher);
        self
    }

    /// Resolve a base58 mint address
    pub async fn resolve_address(&self, address: &str) -> Result<VerificationResult> {
        let mint: Pubkey = address
            .trim()
            .parse()
            .map_err(|e| TeleburnError::invalid_account(address, format!("not an address: {}", e)))?;
        Ok(self.resolve(&mint).await)
    }

    #[instrument(skip(self), fields(mint = %mint))]
    pub async fn resolve(&self, mint: &Pubkey) -> VerificationResult {
        let ctx = OperationContext::new("verify");
        let result = self.resolve_inner(mint).await;

        metrics()
            .verifications
            .with_label_values(&[result.status.as_str(), result.confidence.as_str()])
            .inc();
        ctx.logger.log_verification(
            &result.mint,
            result.status.as_str(),
            result.confidence.as_str(),
        );
        result
    }

    async fn resolve_inner(&self, mint: &Pubkey) -> VerificationResult {
        let account = match self.ledger.get_account(mint).await {
            Ok(Some(account)) => account,
            Ok(None) => return VerificationResult::unknown(mint, "mint account not found".into()),
            Err(e) => return VerificationResult::unknown(mint, format!("supply unavailable: {}", e)),
        };
        if account.owner != spl_token::id() {
            return VerificationResult::unknown(
                mint,
                format!("account is owned by {}, not the SPL Token program", account.owner),
            );
        }
        let mint_state = match Mint::unpack(&account.data) {
            Ok(m) => m,
            Err(e) => {
                return VerificationResult::unknown(mint, format!("not an SPL token mint: {}", e))
            }
        };

        let destruction = if mint_state.supply == 0 {
            Destruction::Burned
        } else {
            match self.sink_holds_supply(mint, mint_state.supply).await {
                Ok(true) => Destruction::HeldBySink,
                Ok(false) => {
                    let mut result =
                        VerificationResult::new(mint, TeleburnStatus::Active, Confidence::Low);
                    result.supply = Some(mint_state.supply);
                    result
                        .notes
                        .push(format!("supply is {}; token is live", mint_state.supply));
                    return result;
                }
                Err(e) => {
                    let mut result =
                        VerificationResult::unknown(mint, format!("holder lookup unavailable: {}", e));
                    result.supply = Some(mint_state.supply);
                    return result;
                }
            }
        };

        let mut result = VerificationResult::new(mint, TeleburnStatus::Burned, Confidence::Low);
        result.supply = Some(mint_state.supply);
        result.method = Some(match destruction {
            Destruction::Burned => RetireMethod::DirectBurn,
            Destruction::HeldBySink => RetireMethod::TransferToSink,
        });

        let evidence = match self.find_memo_evidence(mint, &mut result.notes).await {
            Ok(evidence) => evidence,
            Err(e) => {
                result.notes.push(format!("memo search unavailable: {}", e));
                return result;
            }
        };
        let Some(evidence) = evidence else {
            result.notes.push(format!(
                "no teleburn memo in the last {} signatures",
                self.signature_limit
            ));
            return result;
        };

        self.grade_evidence(mint, evidence, &mut result).await;
        result
    }

    /// Whether one holder owned by the sink holds the entire supply
    async fn sink_holds_supply(&self, mint: &Pubkey, supply: u64) -> Result<bool> {
        let holdings = self.ledger.get_token_largest_accounts(mint).await?;
        let Some(holder) = holdings.iter().find(|h| h.amount == supply) else {
            return Ok(false);
        };
        let Some(account) = self.ledger.get_account(&holder.address).await? else {
            return Ok(false);
        };
        Ok(TokenAccount::unpack(&account.data)
            .map(|a| a.owner == SINK_OWNER && a.mint == *mint)
            .unwrap_or(false))
    }

    /// Newest successful transaction carrying a teleburn memo
    async fn find_memo_evidence(
        &self,
        mint: &Pubkey,
        notes: &mut Vec<String>,
    ) -> Result<Option<MemoEvidence>> {
        let signatures = self
            .ledger
            .get_signatures_for_address(mint, self.signature_limit)
            .await?;

        for info in signatures.iter().filter(|s| !s.failed) {
            let raw = match self.memos_of(info).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    notes.push(format!("transaction {} unavailable: {}", info.signature, e));
                    continue;
                }
            };

            let memos: Vec<DecodedMemo> = raw
                .iter()
                .filter_map(|m| memo::decode(m).ok())
                .filter(|d| d.legacy().map_or(true, |l| l.action != MemoAction::Seal))
                .collect();
            debug!(
                signature = %info.signature,
                raw = raw.len(),
                teleburn = memos.len(),
                "Scanned transaction memos"
            );
            if !memos.is_empty() {
                return Ok(Some(MemoEvidence {
                    signature: info.signature.clone(),
                    slot: info.slot,
                    block_time: info.block_time,
                    memos,
                }));
            }
        }
        Ok(None)
    }

    /// Memo strings of a listed signature; `None` when the transaction failed
    async fn memos_of(&self, info: &SignatureInfo) -> Result<Option<Vec<String>>> {
        if let Some(field) = &info.memo {
            return Ok(Some(memo::split_rpc_memo_field(field)));
        }
        Ok(self
            .ledger
            .get_transaction_memos(&info.signature)
            .await?
            .filter(|tx| !tx.failed)
            .map(|tx| tx.memos))
    }

    async fn grade_evidence(
        &self,
        mint: &Pubkey,
        evidence: MemoEvidence,
        result: &mut VerificationResult,
    ) {
        result.signature = Some(evidence.signature);
        result.slot = Some(evidence.slot);
        result.block_time = evidence.block_time;
        result.status = TeleburnStatus::OfficialTeleburn;

        let primary = evidence
            .memos
            .iter()
            .find(|m| m.format.is_current())
            .unwrap_or(&evidence.memos[0]);
        let id = primary.identifier;
        result.identifier = Some(id.to_string());
        result.memo_format = Some(primary.format);
        result.confidence = if primary.format.is_current() {
            Confidence::High
        } else {
            Confidence::Medium
        };
        if !primary.format.is_current() {
            result.notes.push(format!("legacy memo format {:?}", primary.format));
        }

        if evidence.memos.iter().any(|m| m.identifier != id) {
            result.downgrade(
                Confidence::Medium,
                "memos in the retire transaction disagree on the inscription".into(),
            );
        }

        for record in evidence.memos.iter().filter_map(DecodedMemo::legacy) {
            if let Some(recorded) = &record.solana {
                if record.mint() != Some(*mint) {
                    result.downgrade(
                        Confidence::Medium,
                        format!("record names mint {}, not this mint", recorded.mint),
                    );
                }
            }
            self.check_binding(&id, record, result);
            self.check_media(&id, record, result).await;
        }
    }

    fn check_binding(&self, id: &InscriptionId, record: &LegacyMemo, result: &mut VerificationResult) {
        let Some(derived) = &record.derived else {
            return;
        };
        if result.method == Some(RetireMethod::DirectBurn) {
            result.method = Some(RetireMethod::DeriveAndBind);
        }
        if !self.accepted_domain_tags.iter().any(|t| t == &derived.domain) {
            result.downgrade(
                Confidence::Medium,
                format!("binding uses unaccepted domain tag '{}'", derived.domain),
            );
            return;
        }
        let matches = derived
            .address
            .parse::<Pubkey>()
            .ok()
            .map(|address| {
                derivation::verify_binding(id, &derived.domain, &address, Some(derived.bump))
                    .unwrap_or(false)
            })
            .unwrap_or(false);
        if matches {
            result.derived_address = Some(derived.address.clone());
        } else {
            result.downgrade(
                Confidence::Medium,
                format!("derived address {} does not re-derive", derived.address),
            );
        }
    }

    async fn check_media(&self, id: &InscriptionId, record: &LegacyMemo, result: &mut VerificationResult) {
        let (Some(fetcher), Some(media)) = (&self.content, &record.media) else {
            return;
        };
        match fetcher.fetch_digest(id).await {
            Ok(digest) if digest.matches(&media.sha256) => {
                result.media_verified = Some(true);
            }
            Ok(digest) => {
                result.media_verified = Some(false);
                result.downgrade(
                    Confidence::Medium,
                    format!(
                        "recorded media sha256 {} differs from content sha256 {}",
                        media.sha256, digest.sha256
                    ),
                );
            }
            Err(e) => result.notes.push(format!("media digest unavailable: {}", e)),
        }
    }
}
