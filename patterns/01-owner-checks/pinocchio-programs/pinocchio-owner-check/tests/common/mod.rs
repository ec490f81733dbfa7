//! In-memory ledger used by the integration tests.
//!
//! Instructions run through the programs' real `process_instruction` over
//! `AccountView`s built from ledger state. Off-chain CPIs are validated but
//! not executed, so the ledger applies the System and Token program effects
//! itself: account creation, SPL token account layout, and the Token
//! program's rule that only a token account's owner may move its funds.

#![allow(dead_code)]


use std::collections::HashMap;

use pinocchio::{error::ProgramError, AccountView, Address, ProgramResult};
use pinocchio_clone_owner_check as clone;
use pinocchio_owner_check::{
    authorize::WithdrawPolicy,
    error::OwnerCheckError,
    pda::{derive_token_account, derive_vault_signer},
    state::VAULT_SIZE,
    token::{
        parse_token_account_amount, parse_token_account_mint, parse_token_account_owner,
        MINT_LEN, TOKEN_ACCOUNT_LEN,
    },
    ID, INITIALIZE_VAULT_DISCRIMINATOR, INSECURE_WITHDRAW_DISCRIMINATOR,
    SECURE_WITHDRAW_DISCRIMINATOR, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID,
};

use runtime::TestAccount;

/// Rent-exempt minimum for a 165-byte token account
pub const TOKEN_ACCOUNT_RENT: u64 = 2_039_280;

pub type Entrypoint = fn(&Address, &[AccountView], &[u8]) -> ProgramResult;

const PROGRAM_ERRORS: [OwnerCheckError; 7] = [
    OwnerCheckError::SlotOccupied,
    OwnerCheckError::MalformedRecord,
    OwnerCheckError::UnauthorizedSigner,
    OwnerCheckError::AccountMismatch,
    OwnerCheckError::InsufficientFunds,
    OwnerCheckError::MissingSignature,
    OwnerCheckError::InvalidMint,
];

pub fn copy(address: &Address) -> Address {
    Address::new_from_array(*address.as_array())
}

pub struct LedgerAccount {
    pub owner: Address,
    pub data: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum LedgerError {
    /// Rejected by the owner check program with one of its own codes
    Program(OwnerCheckError),
    /// Rejected by a program with a builtin error
    Rejected(ProgramError),
    /// Rejected by the simulated System or Token program
    Runtime(&'static str),
}

impl From<ProgramError> for LedgerError {
    fn from(e: ProgramError) -> Self {
        PROGRAM_ERRORS
            .iter()
            .find(|code| ProgramError::from(**code) == e)
            .map_or(LedgerError::Rejected(e), |code| LedgerError::Program(*code))
    }
}

impl From<OwnerCheckError> for LedgerError {
    fn from(e: OwnerCheckError) -> Self {
        LedgerError::Program(e)
    }
}

/// Position of an account in an instruction.
pub struct Meta<'a> {
    pub address: &'a Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl<'a> Meta<'a> {
    pub fn readonly(address: &'a Address) -> Self {
        Self { address, is_signer: false, is_writable: false }
    }

    pub fn writable(address: &'a Address) -> Self {
        Self { address, is_signer: false, is_writable: true }
    }
}

/// Arguments of a withdrawal, named the way the instruction names its accounts.
pub struct Withdraw<'a> {
    pub vault: &'a Address,
    pub token_account: &'a Address,
    pub destination: &'a Address,
    pub signer: &'a Address,
    pub signed: bool,
    pub amount: Option<u64>,
}

/// A legitimately initialized vault and its participants.
pub struct VaultFixture {
    pub mint: Address,
    pub authority: Address,
    pub authority_destination: Address,
    pub vault: Address,
    pub token_account: Address,
}

#[derive(Default)]
pub struct Ledger {
    accounts: HashMap<[u8; 32], LedgerAccount>,
    next_address: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh address never produced by PDA derivation.
    pub fn new_address(&mut self) -> Address {
        self.next_address += 1;
        let mut bytes = [0xaau8; 32];
        bytes[24..32].copy_from_slice(&self.next_address.to_le_bytes());
        Address::new_from_array(bytes)
    }

    pub fn account(&self, address: &Address) -> Option<&LedgerAccount> {
        self.accounts.get(address.as_array())
    }

    fn insert(&mut self, address: &Address, owner: &Address, data: Vec<u8>) {
        self.accounts.insert(*address.as_array(), LedgerAccount { owner: copy(owner), data });
    }

    /// Zeroed account of `space` bytes owned by `owner`.
    pub fn allocate(&mut self, owner: &Address, space: usize) -> Address {
        let address = self.new_address();
        self.insert(&address, owner, vec![0u8; space]);
        address
    }

    /// Overwrites an account's data without going through any program.
    pub fn write_data(&mut self, address: &Address, data: &[u8]) {
        if let Some(account) = self.accounts.get_mut(address.as_array()) {
            account.data = data.to_vec();
        }
    }

    pub fn create_mint(&mut self) -> Address {
        let mut data = vec![0u8; MINT_LEN];
        data[45] = 1;
        let address = self.new_address();
        self.insert(&address, &TOKEN_PROGRAM_ID, data);
        address
    }

    pub fn create_token_account(&mut self, mint: &Address, owner: &Address) -> Address {
        let address = self.new_address();
        self.insert(&address, &TOKEN_PROGRAM_ID, token_account_data(mint, owner, 0));
        address
    }

    pub fn mint_to(&mut self, token_account: &Address, amount: u64) {
        let balance = self.balance(token_account);
        if let Some(account) = self.accounts.get_mut(token_account.as_array()) {
            set_amount(&mut account.data, balance + amount);
        }
    }

    pub fn balance(&self, token_account: &Address) -> u64 {
        self.account(token_account)
            .and_then(|account| parse_token_account_amount(&account.data).ok())
            .unwrap_or(0)
    }

    /// Sum of every token account balance for `mint`.
    pub fn supply(&self, mint: &Address) -> u64 {
        self.accounts
            .values()
            .filter(|account| is_token_account(account))
            .filter(|account| parse_token_account_mint(&account.data).ok().as_ref() == Some(mint))
            .filter_map(|account| parse_token_account_amount(&account.data).ok())
            .sum()
    }

    /// Runs `entrypoint` over views of the named accounts.
    ///
    /// Accounts missing from the ledger are presented as empty and owned by
    /// the System program. On success the data of every writable account is
    /// returned for [`Ledger::commit`]; the ledger itself is untouched.
    pub fn execute(
        &self,
        entrypoint: Entrypoint,
        program_id: &Address,
        metas: &[Meta],
        data: &[u8],
    ) -> Result<Vec<(Address, Vec<u8>)>, LedgerError> {
        let mut accounts: Vec<TestAccount> = metas
            .iter()
            .map(|meta| {
                let (owner, data) = match self.account(meta.address) {
                    Some(account) => (copy(&account.owner), account.data.as_slice()),
                    None => (copy(&SYSTEM_PROGRAM_ID), &[][..]),
                };
                TestAccount::new(meta.address, &owner, data, meta.is_signer, meta.is_writable)
            })
            .collect();

        let views = runtime::views(&mut accounts);
        entrypoint(program_id, &views, data)?;

        Ok(metas
            .iter()
            .zip(&accounts)
            .filter(|(meta, _)| meta.is_writable)
            .map(|(meta, account)| (copy(meta.address), account.data().to_vec()))
            .collect())
    }

    /// Applies writes returned by [`Ledger::execute`] to accounts that exist.
    pub fn commit(&mut self, writes: Vec<(Address, Vec<u8>)>) {
        for (address, data) in writes {
            if let Some(account) = self.accounts.get_mut(address.as_array()) {
                account.data = data;
            }
        }
    }

    /// Runs `initialize_vault`, then creates the token account the program's
    /// CreateAccount + InitializeAccount3 CPIs describe.
    pub fn initialize_vault(
        &mut self,
        vault: &Address,
        token_account: &Address,
        mint: &Address,
        authority: &Address,
        authority_signed: bool,
    ) -> Result<(), LedgerError> {
        let mut data = vec![INITIALIZE_VAULT_DISCRIMINATOR];
        data.extend_from_slice(&TOKEN_ACCOUNT_RENT.to_le_bytes());

        let writes = self.execute(
            pinocchio_owner_check::process_instruction,
            &ID,
            &[
                Meta::writable(vault),
                Meta::writable(token_account),
                Meta::readonly(mint),
                Meta { address: authority, is_signer: authority_signed, is_writable: true },
                Meta::readonly(&SYSTEM_PROGRAM_ID),
                Meta::readonly(&TOKEN_PROGRAM_ID),
            ],
            &data,
        )?;

        if self.account(token_account).is_some() {
            return Err(LedgerError::Runtime("token account address already in use"));
        }

        self.commit(writes);
        let (vault_signer, _) = derive_vault_signer(&ID);
        self.insert(token_account, &TOKEN_PROGRAM_ID, token_account_data(mint, &vault_signer, 0));

        Ok(())
    }

    /// Runs the clone program's initializer against a vault it owns.
    ///
    /// `spoof_owner_tag` writes the owner check program's id into the record.
    pub fn clone_initialize_vault(
        &mut self,
        vault: &Address,
        token_account: &Address,
        mint: &Address,
        authority: &Address,
        spoof_owner_tag: bool,
    ) -> Result<(), LedgerError> {
        let discriminator = if spoof_owner_tag {
            clone::INITIALIZE_SPOOFED_VAULT_DISCRIMINATOR
        } else {
            clone::INITIALIZE_VAULT_DISCRIMINATOR
        };

        let writes = self.execute(
            clone::process_instruction,
            &clone::ID,
            &[
                Meta::writable(vault),
                Meta::readonly(token_account),
                Meta::readonly(mint),
                Meta { address: authority, is_signer: true, is_writable: false },
            ],
            &[discriminator],
        )?;
        self.commit(writes);

        Ok(())
    }

    /// Runs a withdrawal end to end and returns the amount moved.
    ///
    /// Nothing changes unless both the owner check program and the Token
    /// program accept.
    pub fn withdraw(&mut self, policy: WithdrawPolicy, args: Withdraw) -> Result<u64, LedgerError> {
        let (vault_signer, _) = derive_vault_signer(&ID);
        self.withdraw_signed_by(policy, args, &vault_signer)
    }

    /// Same as [`Ledger::withdraw`] with an arbitrary `vault_signer` account.
    pub fn withdraw_signed_by(
        &mut self,
        policy: WithdrawPolicy,
        args: Withdraw,
        vault_signer: &Address,
    ) -> Result<u64, LedgerError> {
        let discriminator = match policy {
            WithdrawPolicy::Insecure => INSECURE_WITHDRAW_DISCRIMINATOR,
            WithdrawPolicy::Secure => SECURE_WITHDRAW_DISCRIMINATOR,
        };
        let mut data = vec![discriminator];
        if let Some(amount) = args.amount {
            data.extend_from_slice(&amount.to_le_bytes());
        }

        let writes = self.execute(
            pinocchio_owner_check::process_instruction,
            &ID,
            &[
                Meta::readonly(args.vault),
                Meta::writable(args.token_account),
                Meta::writable(args.destination),
                Meta::readonly(vault_signer),
                Meta { address: args.signer, is_signer: args.signed, is_writable: false },
                Meta::readonly(&TOKEN_PROGRAM_ID),
            ],
            &data,
        )?;

        let amount = args.amount.unwrap_or_else(|| self.balance(args.token_account));
        self.token_transfer(args.token_account, args.destination, vault_signer, amount)?;
        self.commit(writes);

        Ok(amount)
    }

    /// SPL Token `Transfer` as executed by the Token program.
    fn token_transfer(
        &mut self,
        source: &Address,
        destination: &Address,
        authority: &Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let source_data = &self.token_account(source)?.data;
        let destination_data = &self.token_account(destination)?.data;

        let source_owner = parse_token_account_owner(source_data)?;
        if &source_owner != authority {
            return Err(LedgerError::Runtime("owner does not match"));
        }
        if parse_token_account_mint(source_data)? != parse_token_account_mint(destination_data)? {
            return Err(LedgerError::Runtime("mint mismatch"));
        }

        let source_balance = parse_token_account_amount(source_data)?;
        let destination_balance = parse_token_account_amount(destination_data)?;
        if source_balance < amount {
            return Err(LedgerError::Runtime("insufficient funds"));
        }

        if source == destination {
            return Ok(());
        }

        if let Some(account) = self.accounts.get_mut(source.as_array()) {
            set_amount(&mut account.data, source_balance - amount);
        }
        if let Some(account) = self.accounts.get_mut(destination.as_array()) {
            set_amount(&mut account.data, destination_balance + amount);
        }

        Ok(())
    }

    fn token_account(&self, address: &Address) -> Result<&LedgerAccount, LedgerError> {
        self.account(address)
            .filter(|account| is_token_account(account))
            .ok_or(LedgerError::Runtime("not a token account"))
    }

    /// Mint, authority, and a vault holding `deposit` tokens.
    pub fn setup_vault(&mut self, deposit: u64) -> VaultFixture {
        let mint = self.create_mint();
        let authority = self.new_address();
        let authority_destination = self.create_token_account(&mint, &authority);
        let vault = self.allocate(&ID, VAULT_SIZE);
        let (token_account, _) = derive_token_account(&vault, &ID);

        self.initialize_vault(&vault, &token_account, &mint, &authority, true)
            .expect("vault initialization");
        self.mint_to(&token_account, deposit);

        VaultFixture { mint, authority, authority_destination, vault, token_account }
    }
}

fn is_token_account(account: &LedgerAccount) -> bool {
    account.owner == TOKEN_PROGRAM_ID && account.data.len() == TOKEN_ACCOUNT_LEN
}

pub fn token_account_data(mint: &Address, owner: &Address, amount: u64) -> Vec<u8> {
    let mut data = vec![0u8; TOKEN_ACCOUNT_LEN];
    data[0..32].copy_from_slice(mint.as_ref());
    data[32..64].copy_from_slice(owner.as_ref());
    data[64..72].copy_from_slice(&amount.to_le_bytes());
    data[108] = 1;
    data
}

fn set_amount(data: &mut [u8], amount: u64) {
    data[64..72].copy_from_slice(&amount.to_le_bytes());
}
