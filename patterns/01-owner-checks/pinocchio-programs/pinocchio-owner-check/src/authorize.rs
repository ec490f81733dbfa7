//! Vault authorization engine.
//!
//! Everything here is a pure function over account snapshots: no CPIs, no
//! writes. The processor collects the snapshots from `AccountView`s, asks the
//! engine for a decision, and only then touches the ledger.
//!
//! ## Withdrawal checks
//!
//! | Check | Insecure | Secure | Error |
//! |-------|----------|--------|-------|
//! | Signer signed | ✅ | ✅ | `MissingSignature` |
//! | Vault owned by this program | ❌ | ✅ | `MalformedRecord` |
//! | Record decodes | ✅ structure only | ✅ with owner tag | `MalformedRecord` |
//! | Signer == vault authority | ❌ | ✅ | `UnauthorizedSigner` |
//! | Token account == `["token", vault]` | ❌ | ✅ | `AccountMismatch` |
//! | Token account mint and owner match the vault | ❌ | ✅ | `AccountMismatch` |
//! | Amount <= balance | ✅ | ✅ | `InsufficientFunds` |

use pinocchio::Address;
use solana_program_log::log;

use crate::{
    error::OwnerCheckError,
    pda::{derive_token_account, derive_vault_signer},
    state::{is_empty_slot, VaultRecord, VAULT_SIZE},
    token::{
        is_initialized_mint, parse_token_account_amount, parse_token_account_mint,
        parse_token_account_owner,
    },
};

/// Which withdrawal path is being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawPolicy {
    /// Trusts the vault record and the caller's token account as given
    Insecure,
    /// Verifies provenance, authority and token account derivation
    Secure,
}

/// Address and data of an account as seen by the engine.
pub struct AccountSnapshot<'a> {
    pub address: &'a Address,
    pub data: &'a [u8],
}

/// Inputs of `initialize_vault`.
pub struct InitializeRequest<'a> {
    /// Slot that will hold the record
    pub vault: AccountSnapshot<'a>,
    /// Runtime owner of `vault` is the executing program
    pub vault_owned_by_program: bool,
    /// Address the caller wants the token account created at
    pub token_account: &'a Address,
    pub mint: AccountSnapshot<'a>,
    /// Runtime owner of `mint` is the SPL Token program
    pub mint_owned_by_token_program: bool,
    pub authority: &'a Address,
    pub authority_signed: bool,
}

/// Inputs of `insecure_withdraw` / `secure_withdraw`.
pub struct WithdrawalRequest<'a> {
    pub vault: AccountSnapshot<'a>,
    /// Runtime owner of `vault` is the executing program
    pub vault_owned_by_program: bool,
    /// Token account to debit, as supplied by the caller
    pub token_account: AccountSnapshot<'a>,
    pub destination: &'a Address,
    pub signer: &'a Address,
    pub signer_signed: bool,
    /// `None` withdraws the full balance
    pub amount: Option<u64>,
}

/// A transfer the engine has approved.
#[derive(Debug, PartialEq, Eq)]
pub struct Authorization {
    pub source: Address,
    pub destination: Address,
    pub amount: u64,
}

/// Validates an initialization and returns the record to write.
///
/// The token account is always the PDA `["token", vault]`; a caller cannot
/// bind the vault to an account of their choosing.
pub fn plan_initialize(
    program_id: &Address,
    request: &InitializeRequest,
) -> Result<VaultRecord, OwnerCheckError> {
    if !request.authority_signed {
        log!("SECURITY REJECTION: Authority must be a signer");
        return Err(OwnerCheckError::MissingSignature);
    }

    if !request.vault_owned_by_program {
        log!("SECURITY REJECTION: Vault not owned by this program");
        return Err(OwnerCheckError::MalformedRecord);
    }

    if request.vault.data.len() < VAULT_SIZE {
        log!("SECURITY REJECTION: Vault account too small");
        return Err(OwnerCheckError::MalformedRecord);
    }

    if !is_empty_slot(request.vault.data) {
        log!("SECURITY REJECTION: Vault already initialized");
        return Err(OwnerCheckError::SlotOccupied);
    }

    if !request.mint_owned_by_token_program || !is_initialized_mint(request.mint.data) {
        log!("SECURITY REJECTION: Mint is not an initialized SPL mint");
        return Err(OwnerCheckError::InvalidMint);
    }

    let (expected_token_account, bump) =
        derive_token_account(request.vault.address, program_id);
    if request.token_account != &expected_token_account {
        log!("SECURITY REJECTION: Token account is not the vault PDA");
        return Err(OwnerCheckError::AccountMismatch);
    }

    Ok(VaultRecord {
        owner_program: copy_address(program_id),
        token_account: expected_token_account,
        authority: copy_address(request.authority),
        mint: copy_address(request.mint.address),
        token_account_bump: bump,
    })
}

/// Decides a withdrawal under `policy`.
///
/// Stateless: the same request against the same ledger state always yields
/// the same decision.
pub fn authorize_withdrawal(
    policy: WithdrawPolicy,
    program_id: &Address,
    request: &WithdrawalRequest,
) -> Result<Authorization, OwnerCheckError> {
    if !request.signer_signed {
        log!("SECURITY REJECTION: Withdrawal must be signed");
        return Err(OwnerCheckError::MissingSignature);
    }

    match policy {
        WithdrawPolicy::Insecure => check_insecure(request)?,
        WithdrawPolicy::Secure => check_secure(program_id, request)?,
    }

    let balance = parse_token_account_amount(request.token_account.data)?;
    let amount = request.amount.unwrap_or(balance);
    if amount > balance {
        log!("SECURITY REJECTION: Insufficient funds");
        log!("  Available: {}, Requested: {}", balance, amount);
        return Err(OwnerCheckError::InsufficientFunds);
    }

    Ok(Authorization {
        source: copy_address(request.token_account.address),
        destination: copy_address(request.destination),
        amount,
    })
}

/// VULNERABLE: the record only has to look like a vault.
///
/// No owner check, no authority check, no token account check. Any program
/// can write bytes that decode here, and whichever token account the caller
/// passes is debited by the program signer.
fn check_insecure(request: &WithdrawalRequest) -> Result<(), OwnerCheckError> {
    VaultRecord::try_from_slice(request.vault.data)?;
    log!("INSECURE: Vault record accepted without owner check");
    Ok(())
}

fn check_secure(program_id: &Address, request: &WithdrawalRequest) -> Result<(), OwnerCheckError> {
    // ==========================================================================
    // SECURITY CHECK 1: Program ownership
    // Anchor equivalent: Account<'info, Vault>
    // ==========================================================================
    if !request.vault_owned_by_program {
        log!("SECURITY REJECTION: Vault not owned by this program");
        return Err(OwnerCheckError::MalformedRecord);
    }

    // ==========================================================================
    // SECURITY CHECK 2: Embedded owner tag
    // ==========================================================================
    let vault =
        VaultRecord::try_from_slice_owned(request.vault.data, program_id).map_err(|e| {
            log!("SECURITY REJECTION: Vault record not written by this program");
            e
        })?;

    // ==========================================================================
    // SECURITY CHECK 3: Authority
    // Anchor equivalent: has_one = authority
    // ==========================================================================
    if request.signer != &vault.authority {
        log!("SECURITY REJECTION: Signer is not the vault authority");
        return Err(OwnerCheckError::UnauthorizedSigner);
    }

    // ==========================================================================
    // SECURITY CHECK 4: Token account re-derivation
    // Anchor equivalent: has_one = token_account + seeds = [b"token", vault]
    // ==========================================================================
    let (expected_token_account, expected_bump) =
        derive_token_account(request.vault.address, program_id);

    if request.token_account.address != &expected_token_account
        || vault.token_account != expected_token_account
        || vault.token_account_bump != expected_bump
    {
        log!("SECURITY REJECTION: Token account does not belong to this vault");
        return Err(OwnerCheckError::AccountMismatch);
    }

    // ==========================================================================
    // SECURITY CHECK 5: Token account contents
    // Anchor equivalent: token::mint = vault.mint, token::authority = vault_signer
    // ==========================================================================
    let token_mint = parse_token_account_mint(request.token_account.data)?;
    let token_owner = parse_token_account_owner(request.token_account.data)?;
    let (vault_signer, _) = derive_vault_signer(program_id);

    if token_mint != vault.mint || token_owner != vault_signer {
        log!("SECURITY REJECTION: Token account mint or owner does not match the vault");
        return Err(OwnerCheckError::AccountMismatch);
    }

    log!("SECURE: Owner, authority and token account verified");
    Ok(())
}

#[inline]
fn copy_address(address: &Address) -> Address {
    Address::new_from_array(*address.as_array())
}
