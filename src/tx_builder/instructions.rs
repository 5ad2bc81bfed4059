//! Instruction planning and the retire instruction sets
//!
//! Every transaction follows the same layout:
//! 1. Compute budget instructions (CU limit, priority fee), each optional
//! 2. Body instructions (token operations, memos)

use super::{MEMO_PROGRAM_ID, SINK_OWNER};
use crate::errors::{Result, TeleburnError};
use solana_sdk::{
    compute_budget::{self, ComputeBudgetInstruction},
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};

/// Ordered instructions of one transaction
#[derive(Debug, Clone)]
pub struct InstructionPlan {
    pub instructions: Vec<Instruction>,
    /// Index of the first body instruction
    pub body_start: usize,
}

impl InstructionPlan {
    pub fn body(&self) -> &[Instruction] {
        &self.instructions[self.body_start..]
    }
}

/// Prefix `body` with compute budget instructions
///
/// `cu_limit == 0` skips the limit instruction and `prio_fee == 0` skips
/// the price instruction.
pub fn plan_instructions(
    cu_limit: u32,
    prio_fee: u64,
    body: Vec<Instruction>,
) -> Result<InstructionPlan> {
    if body.is_empty() {
        return Err(TeleburnError::instruction_build(
            "transaction",
            "no body instructions",
        ));
    }

    let mut instructions = Vec::with_capacity(body.len() + 2);
    if cu_limit > 0 {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(cu_limit));
    }
    if prio_fee > 0 {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_price(prio_fee));
    }
    let body_start = instructions.len();
    instructions.extend(body);

    Ok(InstructionPlan {
        instructions,
        body_start,
    })
}

/// Compute budget instructions may only appear as a prefix, and at least one
/// body instruction must follow.
pub fn sanity_check_ix_order(instructions: &[Instruction]) -> Result<()> {
    let is_budget = |ix: &Instruction| ix.program_id == compute_budget::id();
    let prefix = instructions.iter().take_while(|ix| is_budget(ix)).count();

    if prefix == instructions.len() {
        return Err(TeleburnError::instruction_build(
            "transaction",
            "instruction list has no body",
        ));
    }
    if let Some(pos) = instructions[prefix..].iter().position(is_budget) {
        return Err(TeleburnError::instruction_build(
            "transaction",
            format!(
                "compute budget instruction at position {} follows a body instruction",
                prefix + pos
            ),
        ));
    }
    Ok(())
}

/// Memo instruction; every listed signer must sign the transaction
pub fn memo_instruction(memo: &str, signers: &[&Pubkey]) -> Instruction {
    Instruction {
        program_id: MEMO_PROGRAM_ID,
        accounts: signers
            .iter()
            .map(|s| AccountMeta::new_readonly(**s, true))
            .collect(),
        data: memo.as_bytes().to_vec(),
    }
}

/// The sink's associated token account for `mint`
pub fn sink_token_account(mint: &Pubkey) -> Pubkey {
    get_associated_token_address(&SINK_OWNER, mint)
}

/// Accounts and amounts shared by every retire instruction set
#[derive(Debug, Clone, Copy)]
pub struct RetireAccounts {
    pub payer: Pubkey,
    pub owner: Pubkey,
    pub mint: Pubkey,
    /// Owner's token account holding the unit
    pub source: Pubkey,
    pub amount: u64,
    pub decimals: u8,
}

fn token_ix(
    name: &str,
    ix: std::result::Result<Instruction, impl std::fmt::Display>,
) -> Result<Instruction> {
    ix.map_err(|e| TeleburnError::instruction_build(format!("spl-token {}", name), e))
}

/// `[thaw] → burn_checked → close_account`
///
/// The thaw is only valid when the owner is the mint's freeze authority.
pub fn burn_instructions(accounts: &RetireAccounts, thaw: bool) -> Result<Vec<Instruction>> {
    let program = spl_token::id();
    let mut ixs = Vec::with_capacity(3);

    if thaw {
        ixs.push(token_ix(
            "thaw_account",
            spl_token::instruction::thaw_account(
                &program,
                &accounts.source,
                &accounts.mint,
                &accounts.owner,
                &[],
            ),
        )?);
    }
    ixs.push(token_ix(
        "burn_checked",
        spl_token::instruction::burn_checked(
            &program,
            &accounts.source,
            &accounts.mint,
            &accounts.owner,
            &[],
            accounts.amount,
            accounts.decimals,
        ),
    )?);
    ixs.push(token_ix(
        "close_account",
        spl_token::instruction::close_account(
            &program,
            &accounts.source,
            &accounts.owner,
            &accounts.owner,
            &[],
        ),
    )?);
    Ok(ixs)
}

/// `create sink ATA (idempotent) → transfer_checked → close_account`
pub fn sink_instructions(accounts: &RetireAccounts) -> Result<Vec<Instruction>> {
    let program = spl_token::id();
    let destination = sink_token_account(&accounts.mint);

    Ok(vec![
        create_associated_token_account_idempotent(
            &accounts.payer,
            &SINK_OWNER,
            &accounts.mint,
            &program,
        ),
        token_ix(
            "transfer_checked",
            spl_token::instruction::transfer_checked(
                &program,
                &accounts.source,
                &accounts.mint,
                &destination,
                &accounts.owner,
                &[],
                accounts.amount,
                accounts.decimals,
            ),
        )?,
        token_ix(
            "close_account",
            spl_token::instruction::close_account(
                &program,
                &accounts.source,
                &accounts.owner,
                &accounts.owner,
                &[],
            ),
        )?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> RetireAccounts {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        RetireAccounts {
            payer: owner,
            owner,
            mint,
            source: get_associated_token_address(&owner, &mint),
            amount: 1,
            decimals: 0,
        }
    }

    #[test]
    fn test_plan_orders_budget_before_body() {
        let memo = memo_instruction("teleburn:x", &[]);
        let plan = plan_instructions(60_000, 5_000, vec![memo.clone()]).unwrap();
        assert_eq!(plan.instructions.len(), 3);
        assert_eq!(plan.body_start, 2);
        assert_eq!(plan.instructions[0].program_id, compute_budget::id());
        assert_eq!(plan.instructions[1].program_id, compute_budget::id());
        assert_eq!(plan.body(), &[memo]);
        assert!(sanity_check_ix_order(&plan.instructions).is_ok());
    }

    #[test]
    fn test_plan_skips_zero_budget_values() {
        let plan = plan_instructions(0, 0, vec![memo_instruction("m", &[])]).unwrap();
        assert_eq!(plan.instructions.len(), 1);
        assert_eq!(plan.body_start, 0);

        let plan = plan_instructions(0, 10, vec![memo_instruction("m", &[])]).unwrap();
        assert_eq!(plan.instructions.len(), 2);
    }

    #[test]
    fn test_plan_rejects_empty_body() {
        assert!(plan_instructions(1, 1, vec![]).is_err());
    }

    #[test]
    fn test_sanity_check_rejects_budget_after_body() {
        let ixs = vec![
            memo_instruction("m", &[]),
            ComputeBudgetInstruction::set_compute_unit_price(1),
        ];
        let err = sanity_check_ix_order(&ixs).unwrap_err();
        assert!(err.to_string().contains("position 1"));

        let only_budget = vec![ComputeBudgetInstruction::set_compute_unit_limit(1)];
        assert!(sanity_check_ix_order(&only_budget).is_err());
    }

    #[test]
    fn test_memo_instruction_marks_signers() {
        let signer = Pubkey::new_unique();
        let ix = memo_instruction("hello", &[&signer]);
        assert_eq!(ix.program_id, MEMO_PROGRAM_ID);
        assert_eq!(ix.data, b"hello");
        assert!(ix.accounts[0].is_signer);
        assert!(!ix.accounts[0].is_writable);
    }

    #[test]
    fn test_burn_instructions_with_and_without_thaw() {
        let accts = accounts();
        let plain = burn_instructions(&accts, false).unwrap();
        assert_eq!(plain.len(), 2);
        assert!(plain.iter().all(|ix| ix.program_id == spl_token::id()));

        let thawed = burn_instructions(&accts, true).unwrap();
        assert_eq!(thawed.len(), 3);
        assert_eq!(thawed[1], plain[0]);
    }

    #[test]
    fn test_sink_instructions_target_sink_ata() {
        let accts = accounts();
        let ixs = sink_instructions(&accts).unwrap();
        assert_eq!(ixs.len(), 3);
        assert_eq!(ixs[0].program_id, spl_associated_token_account::id());

        let sink_ata = sink_token_account(&accts.mint);
        assert!(ixs[1].accounts.iter().any(|m| m.pubkey == sink_ata));
        assert!(ixs[0].accounts.iter().any(|m| m.pubkey == SINK_OWNER));
    }
}
