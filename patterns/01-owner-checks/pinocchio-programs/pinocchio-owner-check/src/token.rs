//! SPL Token and System program helpers: raw layout parsing and hand-built CPIs.

use pinocchio::{
    cpi::{invoke, invoke_signed, Seed, Signer},
    instruction::{InstructionAccount, InstructionView},
    AccountView, Address, ProgramResult,
};

use crate::error::OwnerCheckError;

/// SPL token account length
pub const TOKEN_ACCOUNT_LEN: usize = 165;

/// SPL mint length
pub const MINT_LEN: usize = 82;

/// Offset of `is_initialized` in the SPL mint layout
const MINT_IS_INITIALIZED_OFFSET: usize = 45;

const SYSTEM_CREATE_ACCOUNT_DISCRIMINATOR: u32 = 0;
const SPL_TRANSFER_DISCRIMINATOR: u8 = 3;
const SPL_INITIALIZE_ACCOUNT3_DISCRIMINATOR: u8 = 18;

/// Parses the mint address from a token account's data (bytes 0..32).
pub fn parse_token_account_mint(token_account_data: &[u8]) -> Result<Address, OwnerCheckError> {
    read_address(token_account_data, 0)
}

/// Parses the owner address from a token account's data (bytes 32..64).
pub fn parse_token_account_owner(token_account_data: &[u8]) -> Result<Address, OwnerCheckError> {
    read_address(token_account_data, 32)
}

/// Parses the balance from a token account's data (bytes 64..72).
pub fn parse_token_account_amount(token_account_data: &[u8]) -> Result<u64, OwnerCheckError> {
    let amount_bytes: [u8; 8] = token_account_data
        .get(64..72)
        .ok_or(OwnerCheckError::MalformedRecord)?
        .try_into()
        .map_err(|_| OwnerCheckError::MalformedRecord)?;

    Ok(u64::from_le_bytes(amount_bytes))
}

/// True when `data` is an initialized SPL mint.
pub fn is_initialized_mint(mint_data: &[u8]) -> bool {
    mint_data.len() == MINT_LEN && mint_data[MINT_IS_INITIALIZED_OFFSET] == 1
}

fn read_address(data: &[u8], offset: usize) -> Result<Address, OwnerCheckError> {
    let bytes: [u8; 32] = data
        .get(offset..offset + 32)
        .ok_or(OwnerCheckError::MalformedRecord)?
        .try_into()
        .map_err(|_| OwnerCheckError::MalformedRecord)?;

    Ok(Address::new_from_array(bytes))
}

/// Invokes SPL Token Transfer instruction with PDA signer.
pub fn spl_token_transfer_signed<const N: usize>(
    from: &AccountView,
    to: &AccountView,
    authority: &AccountView,
    token_program: &AccountView,
    amount: u64,
    signer_seeds: &[Seed; N],
) -> ProgramResult {
    let mut instruction_data = [0u8; 9];
    instruction_data[0] = SPL_TRANSFER_DISCRIMINATOR;
    instruction_data[1..9].copy_from_slice(&amount.to_le_bytes());

    let accounts = [
        InstructionAccount::writable(from.address()),
        InstructionAccount::writable(to.address()),
        InstructionAccount::readonly_signer(authority.address()),
    ];

    let instruction = InstructionView {
        program_id: token_program.address(),
        accounts: &accounts,
        data: &instruction_data,
    };

    let signer = Signer::from(signer_seeds);

    invoke_signed::<3>(&instruction, &[from, to, authority], &[signer])
}

/// Invokes SPL Token InitializeAccount3, setting `owner` as the token owner.
pub fn spl_token_initialize_account3(
    account: &AccountView,
    mint: &AccountView,
    owner: &Address,
    token_program: &AccountView,
) -> ProgramResult {
    let mut instruction_data = [0u8; 33];
    instruction_data[0] = SPL_INITIALIZE_ACCOUNT3_DISCRIMINATOR;
    instruction_data[1..33].copy_from_slice(owner.as_ref());

    let accounts = [
        InstructionAccount::writable(account.address()),
        InstructionAccount::readonly(mint.address()),
    ];

    let instruction = InstructionView {
        program_id: token_program.address(),
        accounts: &accounts,
        data: &instruction_data,
    };

    invoke::<2>(&instruction, &[account, mint])
}

/// Invokes System CreateAccount for a PDA, signing with its seeds.
pub fn system_create_account_signed<const N: usize>(
    payer: &AccountView,
    new_account: &AccountView,
    system_program: &AccountView,
    lamports: u64,
    space: u64,
    owner: &Address,
    signer_seeds: &[Seed; N],
) -> ProgramResult {
    let mut instruction_data = [0u8; 52];
    instruction_data[0..4].copy_from_slice(&SYSTEM_CREATE_ACCOUNT_DISCRIMINATOR.to_le_bytes());
    instruction_data[4..12].copy_from_slice(&lamports.to_le_bytes());
    instruction_data[12..20].copy_from_slice(&space.to_le_bytes());
    instruction_data[20..52].copy_from_slice(owner.as_ref());

    let accounts = [
        InstructionAccount::writable_signer(payer.address()),
        InstructionAccount::writable_signer(new_account.address()),
    ];

    let instruction = InstructionView {
        program_id: system_program.address(),
        accounts: &accounts,
        data: &instruction_data,
    };

    let signer = Signer::from(signer_seeds);

    invoke_signed::<2>(&instruction, &[payer, new_account], &[signer])
}
