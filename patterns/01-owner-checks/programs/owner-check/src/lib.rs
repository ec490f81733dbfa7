#![allow(unexpected_cfgs)]

//! # Owner Check Pattern
//!
//! A token vault whose withdrawal authority is fixed at creation time. The
//! program exposes two withdrawal paths over the same vault:
//!
//! - `insecure_withdraw` reads the vault record without checking which program
//!   owns it, trusts whatever token account the caller passes, and never
//!   compares the signer to the stored authority.
//! - `secure_withdraw` only accepts a `Vault` owned by this program, requires
//!   the signer to be the stored authority, and re-derives the vault token
//!   account from `["token", vault]`.
//!
//! Every vault token account is owned by one program-wide PDA (`["signer"]`),
//! so the program can sign for all of them. That is exactly what makes the
//! insecure path exploitable: a look-alike `Vault` created by another program
//! (see `clone-owner-check`) that points at a real vault token account is
//! enough to drain it.
//!
//! ## Security Checks
//!
//! | Check | insecure_withdraw | secure_withdraw |
//! |-------|-------------------|-----------------|
//! | Vault owned by this program | ❌ `UncheckedAccount` | ✅ `Account<'info, Vault>` |
//! | Signer is vault authority | ❌ any `Signer` | ✅ `has_one = authority` |
//! | Token account belongs to vault | ❌ caller-supplied | ✅ `has_one` + `seeds` |
//! | Amount within balance | ✅ | ✅ |

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Mint, Token, TokenAccount, Transfer};

declare_id!("C8H4v4c2eA6njjgzvWSrCpLdYg3hWSygoVsi4RkUrzjV");

// ============================================================================
// Constants
// ============================================================================

/// Anchor account discriminator length
pub const DISCRIMINATOR_SIZE: usize = 8;

/// Seed prefix for the per-vault token account PDA: `["token", vault]`
pub const TOKEN_SEED: &[u8] = b"token";

/// Seed for the program-wide signing PDA that owns every vault token account
pub const SIGNER_SEED: &[u8] = b"signer";

// ============================================================================
// Program Entry Point
// ============================================================================

#[program]
pub mod owner_check {
    use super::*;

    /// Creates a vault bound to `authority` and a fresh token account at
    /// `["token", vault]` owned by the program signer PDA.
    pub fn initialize_vault(ctx: Context<InitializeVault>) -> Result<()> {
        let vault = &mut ctx.accounts.vault;
        vault.token_account = ctx.accounts.token_account.key();
        vault.authority = ctx.accounts.authority.key();
        vault.mint = ctx.accounts.mint.key();

        msg!("Vault initialized: {}", ctx.accounts.vault.key());
        msg!("Vault authority: {}", ctx.accounts.authority.key());
        msg!("Vault token account: {}", ctx.accounts.token_account.key());

        Ok(())
    }

    /// VULNERABLE: withdraws from whatever token account the caller passes.
    ///
    /// The vault is an `UncheckedAccount` deserialized by hand. Deserializing
    /// checks the discriminator, but a clone program declaring the same
    /// `Vault` struct produces the same discriminator. Nothing ties the
    /// signer, the vault, and the token account together.
    ///
    /// `amount` defaults to the full token account balance.
    pub fn insecure_withdraw(ctx: Context<InsecureWithdraw>, amount: Option<u64>) -> Result<()> {
        let vault_data = ctx.accounts.vault.try_borrow_data()?;
        let vault = Vault::try_deserialize(&mut &vault_data[..])
            .map_err(|_| error!(OwnerCheckError::MalformedRecord))?;
        drop(vault_data);

        let balance = ctx.accounts.token_account.amount;
        let amount = amount.unwrap_or(balance);
        require!(amount <= balance, OwnerCheckError::InsufficientFunds);

        msg!("INSECURE: Withdrawing {} tokens", amount);
        msg!("INSECURE: Vault record claims authority {}", vault.authority);

        transfer_from_vault(
            &ctx.accounts.token_program,
            &ctx.accounts.token_account,
            &ctx.accounts.withdraw_destination,
            &ctx.accounts.vault_signer,
            ctx.bumps.vault_signer,
            amount,
        )
    }

    /// SECURE: withdraws only from the token account derived for this vault,
    /// and only when the vault's authority signs.
    ///
    /// `amount` defaults to the full token account balance.
    pub fn secure_withdraw(ctx: Context<SecureWithdraw>, amount: Option<u64>) -> Result<()> {
        let balance = ctx.accounts.token_account.amount;
        let amount = amount.unwrap_or(balance);
        require!(amount <= balance, OwnerCheckError::InsufficientFunds);

        msg!("SECURE: Withdrawing {} tokens (owner, authority, PDA verified)", amount);

        transfer_from_vault(
            &ctx.accounts.token_program,
            &ctx.accounts.token_account,
            &ctx.accounts.withdraw_destination,
            &ctx.accounts.vault_signer,
            ctx.bumps.vault_signer,
            amount,
        )
    }
}

/// Moves `amount` out of a vault token account, signing as the program PDA.
fn transfer_from_vault<'info>(
    token_program: &Program<'info, Token>,
    from: &Account<'info, TokenAccount>,
    to: &Account<'info, TokenAccount>,
    vault_signer: &UncheckedAccount<'info>,
    bump: u8,
    amount: u64,
) -> Result<()> {
    let seeds = &[SIGNER_SEED, &[bump]];
    let signer_seeds = &[&seeds[..]];

    let cpi_accounts = Transfer {
        from: from.to_account_info(),
        to: to.to_account_info(),
        authority: vault_signer.to_account_info(),
    };
    let cpi_ctx =
        CpiContext::new_with_signer(token_program.to_account_info(), cpi_accounts, signer_seeds);
    token::transfer(cpi_ctx, amount)
}

// ============================================================================
// Account Structures
// ============================================================================

/// Custody metadata for one vault.
///
/// The owning program is not a field: it is the runtime owner of the account,
/// which `Account<'info, Vault>` checks against this program's id.
#[account]
#[derive(InitSpace)]
pub struct Vault {
    /// Token account holding the vault's funds, PDA `["token", vault]`
    pub token_account: Pubkey,
    /// Only key allowed to withdraw
    pub authority: Pubkey,
    /// Asset held by the vault
    pub mint: Pubkey,
}

// ============================================================================
// Instruction Contexts
// ============================================================================

#[derive(Accounts)]
pub struct InitializeVault<'info> {
    /// Fresh keypair account; `init` fails if the slot is already in use
    #[account(
        init,
        payer = authority,
        space = DISCRIMINATOR_SIZE + Vault::INIT_SPACE,
    )]
    pub vault: Account<'info, Vault>,

    /// Vault token account, owned by the program signer rather than by `authority`
    #[account(
        init,
        payer = authority,
        token::mint = mint,
        token::authority = vault_signer,
        seeds = [TOKEN_SEED, vault.key().as_ref()],
        bump,
    )]
    pub token_account: Account<'info, TokenAccount>,

    /// CHECK: program-wide signing PDA, holds no data
    #[account(seeds = [SIGNER_SEED], bump)]
    pub vault_signer: UncheckedAccount<'info>,

    pub mint: Account<'info, Mint>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

/// VULNERABLE: nothing links these accounts to each other.
#[derive(Accounts)]
pub struct InsecureWithdraw<'info> {
    /// CHECK: deserialized in the handler without an owner check
    pub vault: UncheckedAccount<'info>,

    /// Any token account the program signer controls
    #[account(mut)]
    pub token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub withdraw_destination: Account<'info, TokenAccount>,

    /// CHECK: program-wide signing PDA, holds no data
    #[account(seeds = [SIGNER_SEED], bump)]
    pub vault_signer: UncheckedAccount<'info>,

    pub token_program: Program<'info, Token>,

    /// Any signer at all
    pub authority: Signer<'info>,
}

#[derive(Accounts)]
pub struct SecureWithdraw<'info> {
    // SECURITY: Account<'info, Vault> rejects vaults owned by any other program
    #[account(
        has_one = token_account @ OwnerCheckError::AccountMismatch,
        has_one = authority @ OwnerCheckError::UnauthorizedSigner,
    )]
    pub vault: Account<'info, Vault>,

    // SECURITY: re-derived from the vault address, never taken on trust
    #[account(
        mut,
        seeds = [TOKEN_SEED, vault.key().as_ref()],
        bump,
    )]
    pub token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub withdraw_destination: Account<'info, TokenAccount>,

    /// CHECK: program-wide signing PDA, holds no data
    #[account(seeds = [SIGNER_SEED], bump)]
    pub vault_signer: UncheckedAccount<'info>,

    pub token_program: Program<'info, Token>,

    pub authority: Signer<'info>,
}

// ============================================================================
// Error Codes
// ============================================================================

#[error_code]
pub enum OwnerCheckError {
    /// Reserved so codes line up with the Pinocchio program, which raises it
    /// for an occupied vault slot. Here `init` rejects an occupied slot first,
    /// through the System program's "already in use" error, so this variant is
    /// never returned.
    #[msg("Vault account is already initialized")]
    SlotOccupied,

    /// Triggered when: vault data fails to decode or belongs to another program
    #[msg("Vault record is malformed or owned by another program")]
    MalformedRecord,

    /// Triggered when: signer is not the vault authority
    #[msg("Signer is not the vault authority")]
    UnauthorizedSigner,

    /// Triggered when: token account is not the one derived for the vault
    #[msg("Token account does not belong to this vault")]
    AccountMismatch,

    /// Triggered when: requested amount exceeds the token account balance
    #[msg("Insufficient funds in vault token account")]
    InsufficientFunds,
}
