//! Instruction decoding for dry-run reports
//!
//! Program identity is a lookup against a small fixed table. Instructions of
//! programs outside the table decode to `Unknown` with their raw data.

use crate::tx_builder::{MEMO_PROGRAM_ID, MEMO_V1_PROGRAM_ID};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use solana_sdk::{compute_budget, instruction::Instruction, pubkey, pubkey::Pubkey, system_program};
use spl_token::instruction::TokenInstruction;

pub const TOKEN_2022_PROGRAM_ID: Pubkey = pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PQnBqCXEpPxuEb");
pub const TOKEN_METADATA_PROGRAM_ID: Pubkey =
    pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Program {
    System,
    ComputeBudget,
    Token,
    Token2022,
    AssociatedToken,
    Memo,
    MemoV1,
    TokenMetadata,
}

fn known_programs() -> [(Pubkey, Program, &'static str); 8] {
    [
        (system_program::id(), Program::System, "System Program"),
        (compute_budget::id(), Program::ComputeBudget, "Compute Budget"),
        (spl_token::id(), Program::Token, "SPL Token"),
        (TOKEN_2022_PROGRAM_ID, Program::Token2022, "SPL Token-2022"),
        (
            spl_associated_token_account::id(),
            Program::AssociatedToken,
            "Associated Token Account",
        ),
        (MEMO_PROGRAM_ID, Program::Memo, "SPL Memo"),
        (MEMO_V1_PROGRAM_ID, Program::MemoV1, "SPL Memo (v1)"),
        (
            TOKEN_METADATA_PROGRAM_ID,
            Program::TokenMetadata,
            "Token Metadata",
        ),
    ]
}

fn lookup(program_id: &Pubkey) -> Option<(Program, &'static str)> {
    known_programs()
        .into_iter()
        .find(|(id, _, _)| id == program_id)
        .map(|(_, program, name)| (program, name))
}

/// Display name of a known program
pub fn program_name(program_id: &Pubkey) -> Option<&'static str> {
    lookup(program_id).map(|(_, name)| name)
}

pub fn is_memo_program(program_id: &Pubkey) -> bool {
    *program_id == MEMO_PROGRAM_ID || *program_id == MEMO_V1_PROGRAM_ID
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRole {
    pub pubkey: String,
    pub role: String,
    pub signer: bool,
    pub writable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum DecodedInstruction {
    #[serde(rename_all = "camelCase")]
    KnownProgram {
        program_id: String,
        name: String,
        instruction: String,
        accounts: Vec<AccountRole>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Unknown {
        program_id: String,
        accounts: Vec<AccountRole>,
        /// base64 instruction data
        raw: String,
    },
}

impl DecodedInstruction {
    pub fn is_known(&self) -> bool {
        matches!(self, Self::KnownProgram { .. })
    }

    pub fn program_id(&self) -> &str {
        match self {
            Self::KnownProgram { program_id, .. } | Self::Unknown { program_id, .. } => program_id,
        }
    }
}

fn with_roles(ix: &Instruction, roles: &[&str]) -> Vec<AccountRole> {
    ix.accounts
        .iter()
        .enumerate()
        .map(|(i, meta)| AccountRole {
            pubkey: meta.pubkey.to_string(),
            role: roles
                .get(i)
                .map(|r| r.to_string())
                .unwrap_or_else(|| format!("account{}", i)),
            signer: meta.is_signer,
            writable: meta.is_writable,
        })
        .collect()
}

fn le_u64(bytes: &[u8]) -> Option<u64> {
    Some(u64::from_le_bytes(bytes.get(..8)?.try_into().ok()?))
}

fn le_u32(bytes: &[u8]) -> Option<u32> {
    Some(u32::from_le_bytes(bytes.get(..4)?.try_into().ok()?))
}

struct Decoded {
    instruction: String,
    roles: &'static [&'static str],
    summary: Option<String>,
}

impl Decoded {
    fn new(instruction: &str, roles: &'static [&'static str], summary: Option<String>) -> Self {
        Self {
            instruction: instruction.to_string(),
            roles,
            summary,
        }
    }
}

fn decode_token(data: &[u8]) -> Decoded {
    match TokenInstruction::unpack(data) {
        Ok(TokenInstruction::BurnChecked { amount, decimals }) => Decoded::new(
            "burnChecked",
            &["account", "mint", "authority"],
            Some(format!("burn {} (decimals {})", amount, decimals)),
        ),
        Ok(TokenInstruction::Burn { amount }) => Decoded::new(
            "burn",
            &["account", "mint", "authority"],
            Some(format!("burn {}", amount)),
        ),
        Ok(TokenInstruction::TransferChecked { amount, decimals }) => Decoded::new(
            "transferChecked",
            &["source", "mint", "destination", "authority"],
            Some(format!("transfer {} (decimals {})", amount, decimals)),
        ),
        Ok(TokenInstruction::Transfer { amount }) => Decoded::new(
            "transfer",
            &["source", "destination", "authority"],
            Some(format!("transfer {}", amount)),
        ),
        Ok(TokenInstruction::CloseAccount) => {
            Decoded::new("closeAccount", &["account", "destination", "owner"], None)
        }
        Ok(TokenInstruction::ThawAccount) => {
            Decoded::new("thawAccount", &["account", "mint", "freezeAuthority"], None)
        }
        Ok(TokenInstruction::FreezeAccount) => {
            Decoded::new("freezeAccount", &["account", "mint", "freezeAuthority"], None)
        }
        Ok(_) => Decoded::new("other", &[], None),
        Err(_) => Decoded::new("unparsed", &[], None),
    }
}

fn decode_compute_budget(data: &[u8]) -> Decoded {
    match data.split_first() {
        Some((2, rest)) => Decoded::new(
            "setComputeUnitLimit",
            &[],
            le_u32(rest).map(|units| format!("{} compute units", units)),
        ),
        Some((3, rest)) => Decoded::new(
            "setComputeUnitPrice",
            &[],
            le_u64(rest).map(|price| format!("{} micro-lamports per unit", price)),
        ),
        _ => Decoded::new("other", &[], None),
    }
}

fn decode_system(data: &[u8]) -> Decoded {
    match le_u32(data) {
        Some(0) => Decoded::new("createAccount", &["funder", "newAccount"], None),
        Some(2) => Decoded::new(
            "transfer",
            &["from", "to"],
            data.get(4..)
                .and_then(le_u64)
                .map(|lamports| format!("{} lamports", lamports)),
        ),
        _ => Decoded::new("other", &[], None),
    }
}

const ATA_ROLES: &[&str] = &[
    "funder",
    "associatedAccount",
    "wallet",
    "mint",
    "systemProgram",
    "tokenProgram",
];

fn decode_associated_token(data: &[u8]) -> Decoded {
    match data.first() {
        None | Some(0) => Decoded::new("create", ATA_ROLES, None),
        Some(1) => Decoded::new("createIdempotent", ATA_ROLES, None),
        _ => Decoded::new("other", &[], None),
    }
}

fn decode_memo(data: &[u8]) -> Decoded {
    Decoded::new(
        "memo",
        &["signer", "signer", "signer"],
        Some(String::from_utf8_lossy(data).into_owned()),
    )
}

/// Decode one instruction; never fails
pub fn decode_instruction(ix: &Instruction) -> DecodedInstruction {
    let Some((program, name)) = lookup(&ix.program_id) else {
        return DecodedInstruction::Unknown {
            program_id: ix.program_id.to_string(),
            accounts: with_roles(ix, &[]),
            raw: STANDARD.encode(&ix.data),
        };
    };

    let decoded = match program {
        Program::System => decode_system(&ix.data),
        Program::ComputeBudget => decode_compute_budget(&ix.data),
        Program::Token => decode_token(&ix.data),
        Program::AssociatedToken => decode_associated_token(&ix.data),
        Program::Memo | Program::MemoV1 => decode_memo(&ix.data),
        Program::Token2022 | Program::TokenMetadata => Decoded::new(
            &ix.data
                .first()
                .map(|d| format!("instruction{}", d))
                .unwrap_or_else(|| "empty".to_string()),
            &[],
            None,
        ),
    };

    DecodedInstruction::KnownProgram {
        program_id: ix.program_id.to_string(),
        name: name.to_string(),
        instruction: decoded.instruction,
        accounts: with_roles(ix, decoded.roles),
        summary: decoded.summary,
    }
}

pub fn decode_all(instructions: &[Instruction]) -> Vec<DecodedInstruction> {
    instructions.iter().map(decode_instruction).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx_builder::memo_instruction;
    use solana_sdk::compute_budget::ComputeBudgetInstruction;
    use solana_sdk::instruction::AccountMeta;

    #[test]
    fn test_compute_budget_decoding() {
        match decode_instruction(&ComputeBudgetInstruction::set_compute_unit_price(5_000)) {
            DecodedInstruction::KnownProgram {
                name,
                instruction,
                summary,
                ..
            } => {
                assert_eq!(name, "Compute Budget");
                assert_eq!(instruction, "setComputeUnitPrice");
                assert_eq!(summary.as_deref(), Some("5000 micro-lamports per unit"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_burn_checked_roles() {
        let account = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let ix = spl_token::instruction::burn_checked(
            &spl_token::id(),
            &account,
            &mint,
            &owner,
            &[],
            1,
            0,
        )
        .unwrap();

        match decode_instruction(&ix) {
            DecodedInstruction::KnownProgram {
                instruction,
                accounts,
                ..
            } => {
                assert_eq!(instruction, "burnChecked");
                let roles: Vec<_> = accounts.iter().map(|a| a.role.as_str()).collect();
                assert_eq!(roles, ["account", "mint", "authority"]);
                assert!(accounts[2].signer);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_memo_summary_is_text() {
        let signer = Pubkey::new_unique();
        let decoded = decode_instruction(&memo_instruction("teleburn:abc", &[&signer]));
        match decoded {
            DecodedInstruction::KnownProgram { summary, .. } => {
                assert_eq!(summary.as_deref(), Some("teleburn:abc"))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(is_memo_program(&MEMO_V1_PROGRAM_ID));
        assert!(!is_memo_program(&spl_token::id()));
    }

    #[test]
    fn test_unknown_program_falls_back_to_raw() {
        let program = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            program,
            &[1, 2, 3],
            vec![AccountMeta::new(Pubkey::new_unique(), true)],
        );
        let decoded = decode_instruction(&ix);
        assert!(!decoded.is_known());
        match decoded {
            DecodedInstruction::Unknown { raw, accounts, .. } => {
                assert_eq!(raw, "AQID");
                assert_eq!(accounts[0].role, "account0");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_malformed_known_program_data_does_not_fail() {
        let ix = Instruction::new_with_bytes(spl_token::id(), &[255, 1], vec![]);
        assert!(decode_instruction(&ix).is_known());
        let ix = Instruction::new_with_bytes(compute_budget::id(), &[3], vec![]);
        assert!(decode_instruction(&ix).is_known());
    }

    #[test]
    fn test_program_table() {
        assert_eq!(program_name(&TOKEN_METADATA_PROGRAM_ID), Some("Token Metadata"));
        assert_eq!(program_name(&Pubkey::new_unique()), None);
    }
}
