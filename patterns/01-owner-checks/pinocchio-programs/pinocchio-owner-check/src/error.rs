use pinocchio::error::ProgramError;

/// Custom error codes for the owner check vault.
///
/// Codes start at 6000 so they line up with the Anchor rendition's
/// `#[error_code]` numbering.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerCheckError {
    /// Initialization targets an account that already holds data
    SlotOccupied = 0x1770, // 6000
    /// Vault data fails to decode, or the record belongs to another program
    MalformedRecord = 0x1771, // 6001
    /// Signer is not the authority stored in the vault
    UnauthorizedSigner = 0x1772, // 6002
    /// Token account is not the one derived for this vault
    AccountMismatch = 0x1773, // 6003
    /// Requested amount exceeds the token account balance
    InsufficientFunds = 0x1774, // 6004
    /// A required signature is missing
    MissingSignature = 0x1775, // 6005
    /// Mint account is not an initialized SPL Token mint
    InvalidMint = 0x1776, // 6006
}

impl From<OwnerCheckError> for ProgramError {
    fn from(e: OwnerCheckError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
