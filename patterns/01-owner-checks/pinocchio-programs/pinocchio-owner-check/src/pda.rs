//! Program derived addresses used by the vault.
//!
//! | PDA | Seeds | Role |
//! |-----|-------|------|
//! | Vault token account | `["token", vault]` | Holds the vault's funds |
//! | Vault signer | `["signer"]` | SPL owner of every vault token account |

use pinocchio::Address;

#[cfg(target_os = "solana")]
use pinocchio::syscalls;

/// Seed prefix for the per-vault token account PDA
pub const TOKEN_SEED: &[u8] = b"token";

/// Seed for the program-wide signing PDA
pub const SIGNER_SEED: &[u8] = b"signer";

/// Find a valid program derived address and its canonical bump seed.
///
/// Wraps the `sol_try_find_program_address` syscall, which returns the
/// highest bump producing an off-curve address.
#[cfg(target_os = "solana")]
#[inline]
pub fn find_program_address(seeds: &[&[u8]], program_id: &Address) -> (Address, u8) {
    let mut pda_bytes = core::mem::MaybeUninit::<[u8; 32]>::uninit();
    let mut bump_seed = u8::MAX;

    let result = unsafe {
        syscalls::sol_try_find_program_address(
            seeds as *const _ as *const u8,
            seeds.len() as u64,
            program_id as *const _ as *const u8,
            pda_bytes.as_mut_ptr() as *mut u8,
            &mut bump_seed as *mut u8,
        )
    };

    if result == 0 {
        (Address::new_from_array(unsafe { pda_bytes.assume_init() }), bump_seed)
    } else {
        panic!("Unable to find a viable program address bump seed")
    }
}

/// Off-chain rendition of `find_program_address`.
///
/// Hashes `seeds || [bump] || program_id || "ProgramDerivedAddress"` exactly
/// like the runtime, but skips the off-curve test and always reports bump 255.
/// Addresses are deterministic and distinct per seed set, which is all the
/// off-chain callers rely on; they are not guaranteed to match on-chain PDAs.
#[cfg(not(target_os = "solana"))]
pub fn find_program_address(seeds: &[&[u8]], program_id: &Address) -> (Address, u8) {
    use sha2::{Digest, Sha256};

    let bump = u8::MAX;
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update([bump]);
    hasher.update(program_id.as_ref());
    hasher.update(b"ProgramDerivedAddress");

    let hash: [u8; 32] = hasher.finalize().into();
    (Address::new_from_array(hash), bump)
}

/// Token account PDA for `vault`: `["token", vault]`.
#[inline]
pub fn derive_token_account(vault: &Address, program_id: &Address) -> (Address, u8) {
    find_program_address(&[TOKEN_SEED, vault.as_ref()], program_id)
}

/// Program-wide signing PDA: `["signer"]`.
#[inline]
pub fn derive_vault_signer(program_id: &Address) -> (Address, u8) {
    find_program_address(&[SIGNER_SEED], program_id)
}
