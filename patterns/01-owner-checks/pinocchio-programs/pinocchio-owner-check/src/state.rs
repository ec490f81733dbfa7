//! Vault record layout.
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 8 | discriminator `b"ownrvlt1"` |
//! | 8 | 32 | owner program tag |
//! | 40 | 32 | token account |
//! | 72 | 32 | authority |
//! | 104 | 32 | mint |
//! | 136 | 1 | token account bump |

use pinocchio::Address;

use crate::error::OwnerCheckError;

/// Record type tag written at offset 0
pub const VAULT_DISCRIMINATOR: [u8; 8] = *b"ownrvlt1";

/// Vault account size: 8 + 32 + 32 + 32 + 32 + 1 = 137 bytes
pub const VAULT_SIZE: usize = 8 + 32 + 32 + 32 + 32 + 1;

/// Custody metadata for one vault.
#[derive(Debug, PartialEq, Eq)]
pub struct VaultRecord {
    /// Program that wrote the record.
    /// // SECURITY: compared against the executing program on secure reads
    pub owner_program: Address,
    /// Token account holding the vault's funds (PDA `["token", vault]`)
    pub token_account: Address,
    /// Only key allowed to withdraw
    pub authority: Address,
    /// Asset held by the vault
    pub mint: Address,
    /// Canonical bump of `token_account`
    pub token_account_bump: u8,
}

impl VaultRecord {
    /// Decodes a record, checking only length and discriminator.
    ///
    /// Any program can produce bytes that pass this; callers that trust the
    /// result must use [`VaultRecord::try_from_slice_owned`].
    pub fn try_from_slice(data: &[u8]) -> Result<Self, OwnerCheckError> {
        if data.len() < VAULT_SIZE || data[0..8] != VAULT_DISCRIMINATOR {
            return Err(OwnerCheckError::MalformedRecord);
        }

        Ok(Self {
            owner_program: read_address(data, 8)?,
            token_account: read_address(data, 40)?,
            authority: read_address(data, 72)?,
            mint: read_address(data, 104)?,
            token_account_bump: data[136],
        })
    }

    /// Decodes a record and rejects it unless its owner tag is `expected_program`.
    pub fn try_from_slice_owned(
        data: &[u8],
        expected_program: &Address,
    ) -> Result<Self, OwnerCheckError> {
        let record = Self::try_from_slice(data)?;
        if &record.owner_program != expected_program {
            return Err(OwnerCheckError::MalformedRecord);
        }
        Ok(record)
    }

    pub fn serialize(&self, data: &mut [u8]) -> Result<(), OwnerCheckError> {
        if data.len() < VAULT_SIZE {
            return Err(OwnerCheckError::MalformedRecord);
        }

        data[0..8].copy_from_slice(&VAULT_DISCRIMINATOR);
        data[8..40].copy_from_slice(self.owner_program.as_ref());
        data[40..72].copy_from_slice(self.token_account.as_ref());
        data[72..104].copy_from_slice(self.authority.as_ref());
        data[104..136].copy_from_slice(self.mint.as_ref());
        data[136] = self.token_account_bump;

        Ok(())
    }
}

/// True when the account has never been written.
pub fn is_empty_slot(data: &[u8]) -> bool {
    data.iter().all(|b| *b == 0)
}

fn read_address(data: &[u8], offset: usize) -> Result<Address, OwnerCheckError> {
    let bytes: [u8; 32] = data[offset..offset + 32]
        .try_into()
        .map_err(|_| OwnerCheckError::MalformedRecord)?;
    Ok(Address::new_from_array(bytes))
}
