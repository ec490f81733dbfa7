//! Instruction handlers.
//!
//! Each handler snapshots its accounts, lets [`crate::authorize`] decide, and
//! only then performs CPIs and writes. Borrows taken for the decision are
//! released before any CPI.

use pinocchio::{cpi::Seed, error::ProgramError, AccountView, Address, ProgramResult};
use solana_program_log::log;

use crate::{
    authorize::{
        authorize_withdrawal, plan_initialize, AccountSnapshot, InitializeRequest, WithdrawPolicy,
        WithdrawalRequest,
    },
    error::OwnerCheckError,
    pda::{derive_vault_signer, SIGNER_SEED, TOKEN_SEED},
    token::{
        spl_token_initialize_account3, spl_token_transfer_signed, system_create_account_signed,
        TOKEN_ACCOUNT_LEN,
    },
    SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID,
};

/// Creates the vault's token account at `["token", vault]` and writes the record.
///
/// Accounts: `[vault (w), token_account (w), mint, authority (s, w), system_program,
/// token_program]`
///
/// Data: `lamports: u64` funding the token account.
pub fn initialize_vault(
    program_id: &Address,
    accounts: &[AccountView],
    data: &[u8],
) -> ProgramResult {
    let [vault, token_account, mint, authority, system_program, token_program] = accounts else {
        return Err(ProgramError::NotEnoughAccountKeys);
    };

    if system_program.address() != &SYSTEM_PROGRAM_ID
        || token_program.address() != &TOKEN_PROGRAM_ID
    {
        return Err(ProgramError::IncorrectProgramId);
    }

    let lamports = u64::from_le_bytes(
        data.get(0..8)
            .ok_or(ProgramError::InvalidInstructionData)?
            .try_into()
            .map_err(|_| ProgramError::InvalidInstructionData)?,
    );

    let record = {
        let vault_data = vault.try_borrow()?;
        let mint_data = mint.try_borrow()?;

        let request = InitializeRequest {
            vault: AccountSnapshot { address: vault.address(), data: &vault_data },
            vault_owned_by_program: vault.owned_by(program_id),
            token_account: token_account.address(),
            mint: AccountSnapshot { address: mint.address(), data: &mint_data },
            mint_owned_by_token_program: mint.owned_by(&TOKEN_PROGRAM_ID),
            authority: authority.address(),
            authority_signed: authority.is_signer(),
        };

        plan_initialize(program_id, &request)?
    };

    let bump_bytes = [record.token_account_bump];
    let seeds = [
        Seed::from(TOKEN_SEED),
        Seed::from(vault.address().as_ref()),
        Seed::from(&bump_bytes),
    ];

    system_create_account_signed(
        authority,
        token_account,
        system_program,
        lamports,
        TOKEN_ACCOUNT_LEN as u64,
        &TOKEN_PROGRAM_ID,
        &seeds,
    )?;

    // Every vault token account is owned by the same program-wide signer
    let (vault_signer, _) = derive_vault_signer(program_id);
    spl_token_initialize_account3(token_account, mint, &vault_signer, token_program)?;

    let mut vault_data = vault.try_borrow_mut()?;
    record.serialize(&mut vault_data)?;

    log!("SECURE: Vault initialized");

    Ok(())
}

/// Moves tokens out of a vault's token account under `policy`.
///
/// Accounts: `[vault, token_account (w), destination (w), vault_signer, authority (s),
/// token_program]`
///
/// Data: optional `amount: u64`; empty withdraws the full balance.
pub fn withdraw(
    policy: WithdrawPolicy,
    program_id: &Address,
    accounts: &[AccountView],
    data: &[u8],
) -> ProgramResult {
    let [vault, token_account, destination, vault_signer, authority, token_program] = accounts
    else {
        return Err(ProgramError::NotEnoughAccountKeys);
    };

    if token_program.address() != &TOKEN_PROGRAM_ID {
        return Err(ProgramError::IncorrectProgramId);
    }

    let amount = parse_amount(data)?;

    let authorization = {
        let vault_data = vault.try_borrow()?;
        let token_data = token_account.try_borrow()?;

        let request = WithdrawalRequest {
            vault: AccountSnapshot { address: vault.address(), data: &vault_data },
            vault_owned_by_program: vault.owned_by(program_id),
            token_account: AccountSnapshot { address: token_account.address(), data: &token_data },
            destination: destination.address(),
            signer: authority.address(),
            signer_signed: authority.is_signer(),
            amount,
        };

        authorize_withdrawal(policy, program_id, &request)?
    };

    let (expected_signer, signer_bump) = derive_vault_signer(program_id);
    if vault_signer.address() != &expected_signer {
        log!("SECURITY REJECTION: Vault signer is not the program signer PDA");
        return Err(OwnerCheckError::AccountMismatch.into());
    }

    let bump_bytes = [signer_bump];
    let seeds = [Seed::from(SIGNER_SEED), Seed::from(&bump_bytes)];

    spl_token_transfer_signed(
        token_account,
        destination,
        vault_signer,
        token_program,
        authorization.amount,
        &seeds,
    )?;

    if policy == WithdrawPolicy::Secure {
        log!("SECURE: Withdrew {} tokens", authorization.amount);
    } else {
        log!("INSECURE: Withdrew {} tokens", authorization.amount);
    }

    Ok(())
}

/// Empty data means "everything"; otherwise the first 8 bytes are a LE `u64`.
pub fn parse_amount(data: &[u8]) -> Result<Option<u64>, ProgramError> {
    if data.is_empty() {
        return Ok(None);
    }

    let amount_bytes: [u8; 8] = data
        .get(0..8)
        .ok_or(ProgramError::InvalidInstructionData)?
        .try_into()
        .map_err(|_| ProgramError::InvalidInstructionData)?;

    Ok(Some(u64::from_le_bytes(amount_bytes)))
}
