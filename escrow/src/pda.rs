//! Program-derived addresses used by the escrow.
//!
//! - [`find_escrow_address`] derives the escrow state account from
//!   `["escrow", maker, seed_le]`.
//! - [`associated_token_address`] derives token accounts, including the
//!   vault, which is the escrow's own associated token account for mint A.

use solana_program::pubkey::Pubkey;

use crate::error::EscrowError;

pub const PUBKEY_BYTES: usize = 32;

pub const ESCROW_SEED: &[u8] = b"escrow";

/// Searches bump seeds from 255 down to 0 and returns the first off-curve
/// address.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), EscrowError> {
    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump = seeds.to_vec();
        with_bump.push(&bump_seed);
        if let Ok(address) = Pubkey::create_program_address(&with_bump, program_id) {
            return Ok((address, bump));
        }
    }
    Err(EscrowError::DerivationExhausted)
}

pub fn find_escrow_address(
    maker: &Pubkey,
    seed: u64,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), EscrowError> {
    find_program_address(
        &[ESCROW_SEED, maker.as_ref(), &seed.to_le_bytes()],
        program_id,
    )
}

/// Derives the associated token account of `owner` for `mint`.
///
/// `allow_owner_off_curve` must be set when the owner is itself a derived
/// address, as it is for the vault.
pub fn associated_token_address(
    mint: &Pubkey,
    owner: &Pubkey,
    allow_owner_off_curve: bool,
    token_program: &Pubkey,
) -> Result<Pubkey, EscrowError> {
    if !allow_owner_off_curve && !owner.is_on_curve() {
        return Err(EscrowError::OwnerOffCurve(*owner));
    }
    find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &spl_associated_token_account::id(),
    )
    .map(|(address, _)| address)
}
