//! Pre-flight simulation of a whole teleburn
//!
//! `SimulationOrchestrator::run` builds every transaction of the flow, decodes
//! its instructions and submits it to the ledger's non-mutating simulation.
//! Steps run sequentially in a fixed order (seal, optional metadata update,
//! retire). A failing step never aborts the ones after it; its failure is
//! recorded as a warning and the report is always returned.

pub mod decode;

use crate::errors::TeleburnError;
use crate::metrics::metrics;
use crate::structured_logging::OperationContext;
use crate::tx_builder::{BuiltTransaction, TxBuilder};
use crate::types::RetireMethod;
use decode::{decode_all, DecodedInstruction};
use serde::{Deserialize, Serialize};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use tracing::instrument;

pub use decode::{is_memo_program, program_name, AccountRole};

/// Inputs of one dry run
#[derive(Debug, Clone)]
pub struct DryRunParams {
    pub payer: Pubkey,
    pub owner: Pubkey,
    pub mint: Pubkey,
    pub identifier: String,
    pub method: RetireMethod,
    /// Caller-supplied metadata instructions; `None` skips the step
    pub metadata_update: Option<Vec<Instruction>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepName {
    Seal,
    MetadataUpdate,
    Retire,
}

impl StepName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seal => "seal",
            Self::MetadataUpdate => "metadata-update",
            Self::Retire => "retire",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepOutcome {
    Passed,
    BuildFailed,
    SimulationFailed,
    SimulationUnavailable,
}

impl StepOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::BuildFailed => "build_failed",
            Self::SimulationFailed => "simulation_failed",
            Self::SimulationUnavailable => "simulation_unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunStep {
    pub name: StepName,
    pub outcome: StepOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub instructions: Vec<DecodedInstruction>,
    pub estimated_fee: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_units: Option<u64>,
    pub logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<RetireMethod>,
}

impl DryRunStep {
    pub fn succeeded(&self) -> bool {
        self.outcome == StepOutcome::Passed
    }

    fn empty(name: StepName, outcome: StepOutcome) -> Self {
        Self {
            name,
            outcome,
            description: None,
            instructions: Vec::new(),
            estimated_fee: 0,
            compute_units: None,
            logs: Vec::new(),
            error_kind: None,
            suggestion: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunReport {
    pub steps: Vec<DryRunStep>,
    /// Sum over every step that could be built
    pub total_estimated_fee: u64,
    pub warnings: Vec<String>,
    pub summary: String,
}

impl DryRunReport {
    pub fn all_passed(&self) -> bool {
        self.steps.iter().all(DryRunStep::succeeded)
    }

    pub fn step(&self, name: StepName) -> Option<&DryRunStep> {
        self.steps.iter().find(|s| s.name == name)
    }
}

pub struct SimulationOrchestrator {
    builder: TxBuilder,
}

impl SimulationOrchestrator {
    pub fn new(builder: TxBuilder) -> Self {
        Self { builder }
    }

    /// Run every step; never fails
    #[instrument(skip(self, params), fields(mint = %params.mint, method = %params.method))]
    pub async fn run(&self, params: &DryRunParams) -> DryRunReport {
        let ctx = OperationContext::new("dry_run");
        let mut warnings = Vec::new();
        let mut steps = Vec::with_capacity(3);

        let seal = self
            .builder
            .build_seal(&params.payer, &params.mint, &params.identifier)
            .await;
        steps.push(self.run_step(&ctx, StepName::Seal, seal, &mut warnings).await);

        if let Some(instructions) = &params.metadata_update {
            let update = self
                .builder
                .build_metadata_update(&params.payer, &params.mint, instructions.clone())
                .await;
            steps.push(
                self.run_step(&ctx, StepName::MetadataUpdate, update, &mut warnings)
                    .await,
            );
        }

        let retire = self
            .builder
            .build_retire(
                &params.payer,
                &params.owner,
                &params.mint,
                &params.identifier,
                params.method,
            )
            .await;
        steps.push(self.run_step(&ctx, StepName::Retire, retire, &mut warnings).await);

        let total_estimated_fee = steps.iter().map(|s| s.estimated_fee).sum();
        let passed = steps.iter().filter(|s| s.succeeded()).count();
        let summary = format!(
            "{} of {} steps passed for mint {} via {}; total estimated fee {} lamports",
            passed,
            steps.len(),
            params.mint,
            params.method,
            total_estimated_fee
        );

        DryRunReport {
            steps,
            total_estimated_fee,
            warnings,
            summary,
        }
    }

    async fn run_step(
        &self,
        ctx: &OperationContext,
        name: StepName,
        built: crate::errors::Result<BuiltTransaction>,
        warnings: &mut Vec<String>,
    ) -> DryRunStep {
        let step_warnings_before = warnings.len();
        let step = match built {
            Err(e) => {
                warnings.push(format!("{}: build failed: {}", name.as_str(), e));
                if let Some(alt) = e.suggestion() {
                    warnings.push(format!("{}: consider retiring via {}", name.as_str(), alt));
                }
                let mut step = DryRunStep::empty(name, StepOutcome::BuildFailed);
                step.error_kind = Some(e.kind().to_string());
                step.suggestion = e.suggestion();
                step
            }
            Ok(built) => self.simulate_step(name, built, warnings).await,
        };

        metrics()
            .dry_run_steps
            .with_label_values(&[name.as_str(), step.outcome.label()])
            .inc();
        ctx.logger.log_dry_run_step(
            name.as_str(),
            step.succeeded(),
            step.estimated_fee,
            warnings.len() - step_warnings_before,
        );
        step
    }

    async fn simulate_step(
        &self,
        name: StepName,
        built: BuiltTransaction,
        warnings: &mut Vec<String>,
    ) -> DryRunStep {
        let instructions = decode_all(&built.instructions);
        for (position, ix) in instructions.iter().enumerate() {
            if !ix.is_known() {
                warnings.push(format!(
                    "{}: instruction {} targets unrecognised program {}",
                    name.as_str(),
                    position,
                    ix.program_id()
                ));
            }
        }

        let mut step = DryRunStep {
            description: Some(built.description.clone()),
            instructions,
            estimated_fee: built.estimated_fee,
            ..DryRunStep::empty(name, StepOutcome::Passed)
        };

        match self
            .builder
            .ledger()
            .simulate(&built.to_unsigned_transaction())
            .await
        {
            Ok(outcome) => {
                step.compute_units = outcome.units_consumed;
                step.logs = outcome.logs;
                if let Some(err) = outcome.err {
                    let failure = TeleburnError::simulation_failed(name.as_str(), err);
                    warnings.push(format!("{}: {}", name.as_str(), failure));
                    step.outcome = StepOutcome::SimulationFailed;
                    step.error_kind = Some(failure.kind().to_string());
                }
            }
            Err(e) => {
                warnings.push(format!("{}: simulation unavailable: {}", name.as_str(), e));
                step.outcome = StepOutcome::SimulationUnavailable;
                step.error_kind = Some(e.kind().to_string());
            }
        }
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc_manager::SimulationOutcome;
    use crate::test_utils::{failover_over, inscription_id, mint_account, token_account, MockLedger};
    use crate::tx_builder::{memo_instruction, TransactionConfig};
    use spl_associated_token_account::get_associated_token_address;
    use std::sync::Arc;

    fn setup(frozen: bool) -> (Arc<MockLedger>, SimulationOrchestrator, DryRunParams) {
        let ledger = Arc::new(MockLedger::new("mock"));
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        ledger.set_account(mint, mint_account(1, 0, None));
        ledger.set_account(
            get_associated_token_address(&owner, &mint),
            token_account(mint, owner, 1, frozen),
        );
        let builder = TxBuilder::new(failover_over(&[ledger.clone()]), TransactionConfig::default());
        let params = DryRunParams {
            payer: owner,
            owner,
            mint,
            identifier: inscription_id('a', 0),
            method: RetireMethod::DirectBurn,
            metadata_update: None,
        };
        (ledger, SimulationOrchestrator::new(builder), params)
    }

    #[tokio::test]
    async fn test_all_steps_pass() {
        let (ledger, orchestrator, params) = setup(false);
        let report = orchestrator.run(&params).await;

        assert!(report.all_passed());
        assert!(report.warnings.is_empty());
        let names: Vec<_> = report.steps.iter().map(|s| s.name).collect();
        assert_eq!(names, vec![StepName::Seal, StepName::Retire]);
        assert_eq!(
            report.total_estimated_fee,
            report.steps.iter().map(|s| s.estimated_fee).sum::<u64>()
        );
        assert_eq!(ledger.simulated().len(), 2);
        assert!(report.summary.starts_with("2 of 2 steps passed"));
    }

    #[tokio::test]
    async fn test_build_failure_becomes_warning_with_suggestion() {
        let (_ledger, orchestrator, mut params) = setup(true);
        params.method = RetireMethod::TransferToSink;
        let report = orchestrator.run(&params).await;

        let retire = report.step(StepName::Retire).unwrap();
        assert_eq!(retire.outcome, StepOutcome::BuildFailed);
        assert_eq!(retire.error_kind.as_deref(), Some("frozen_account"));
        assert!(report.warnings.iter().any(|w| w.starts_with("retire: build failed")));
        // Seal is unaffected
        assert!(report.step(StepName::Seal).unwrap().succeeded());
    }

    #[tokio::test]
    async fn test_metadata_step_runs_between_seal_and_retire() {
        let (ledger, orchestrator, mut params) = setup(false);
        let unknown = Instruction::new_with_bytes(Pubkey::new_unique(), &[9], vec![]);
        params.metadata_update = Some(vec![
            memo_instruction("metadata", &[&params.payer]),
            unknown,
        ]);
        ledger.push_simulation(SimulationOutcome::default());
        ledger.push_simulation(SimulationOutcome {
            err: Some("InstructionError(1, InvalidAccountData)".into()),
            logs: vec![],
            units_consumed: Some(10),
        });

        let report = orchestrator.run(&params).await;
        let names: Vec<_> = report.steps.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![StepName::Seal, StepName::MetadataUpdate, StepName::Retire]
        );
        let update = report.step(StepName::MetadataUpdate).unwrap();
        assert_eq!(update.outcome, StepOutcome::SimulationFailed);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("unrecognised program")));
        assert!(report.step(StepName::Retire).unwrap().succeeded());
    }
}
