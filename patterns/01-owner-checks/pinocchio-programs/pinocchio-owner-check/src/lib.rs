//! # Pinocchio Owner Check Vault
//!
//! A token vault that exposes two withdrawal paths over the same accounts:
//!
//! - `insecure_withdraw` decodes whatever vault record it is handed and lets the
//!   program signer move funds out of whichever token account the caller names.
//!   A record written by a cloned program, pointing at a real vault's token
//!   account, drains that account.
//! - `secure_withdraw` checks the record's runtime owner and embedded owner tag,
//!   the signer against the stored authority, and re-derives the vault's token
//!   account before anything moves.
//!
//! ## Security Checks
//!
//! | Check | Anchor | Pinocchio |
//! |-------|--------|-----------|
//! | Record owner | `Account<'info, Vault>` | `owned_by(program_id)` + owner tag |
//! | Authority | `has_one = authority` | `signer == record.authority` |
//! | Token account | `seeds = [b"token", vault]` | re-derive and compare |
//!
//! The decision logic lives in [`authorize`] and is free of runtime calls, so
//! it can be exercised against an in-memory ledger off-chain.

#![allow(unexpected_cfgs)]

pub mod authorize;
pub mod error;
pub mod pda;
pub mod processor;
pub mod state;
pub mod token;

#[cfg(not(feature = "no-entrypoint"))]
use pinocchio::entrypoint;
use pinocchio::{error::ProgramError, AccountView, Address, ProgramResult};

use crate::authorize::WithdrawPolicy;

// =============================================================================
// PROGRAM ID
// =============================================================================

/// Program ID: 3fh1VqUoSyHL9rS8GKsqqacwUhR9nLuSxZm2aNgJGrjz
pub const ID: Address = Address::new_from_array([
    0x27, 0xa0, 0xae, 0xb3, 0xfe, 0xe9, 0x23, 0x2f, 0x8a, 0xf2, 0x21, 0x1f, 0x9e, 0xe4, 0x91, 0xc5,
    0xb1, 0x0b, 0xec, 0xb5, 0x56, 0x3b, 0xfc, 0x1e, 0x6f, 0x93, 0x42, 0x7e, 0xcb, 0xc8, 0xfe, 0x29,
]);

/// SPL Token Program ID
pub const TOKEN_PROGRAM_ID: Address = Address::new_from_array([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79, 0xac,
    0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff, 0x00, 0xa9,
]);

/// System Program ID
pub const SYSTEM_PROGRAM_ID: Address = Address::new_from_array([0u8; 32]);

/// Instruction discriminators
pub const INITIALIZE_VAULT_DISCRIMINATOR: u8 = 0;
pub const INSECURE_WITHDRAW_DISCRIMINATOR: u8 = 1;
pub const SECURE_WITHDRAW_DISCRIMINATOR: u8 = 2;

// =============================================================================
// ENTRYPOINT
// =============================================================================

#[cfg(not(feature = "no-entrypoint"))]
entrypoint!(process_instruction);

/// Main entrypoint for the Pinocchio owner check program.
pub fn process_instruction(
    program_id: &Address,
    accounts: &[AccountView],
    instruction_data: &[u8],
) -> ProgramResult {
    let (discriminator, data) =
        instruction_data.split_first().ok_or(ProgramError::InvalidInstructionData)?;

    match *discriminator {
        INITIALIZE_VAULT_DISCRIMINATOR => processor::initialize_vault(program_id, accounts, data),
        INSECURE_WITHDRAW_DISCRIMINATOR => {
            processor::withdraw(WithdrawPolicy::Insecure, program_id, accounts, data)
        }
        SECURE_WITHDRAW_DISCRIMINATOR => {
            processor::withdraw(WithdrawPolicy::Secure, program_id, accounts, data)
        }
        _ => Err(ProgramError::InvalidInstructionData),
    }
}
