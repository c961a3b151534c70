// Escrow account layout as written by the on-chain program
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::pubkey::Pubkey;

use crate::{
    amount::format_amount,
    error::EscrowError,
    pda::{find_escrow_address, PUBKEY_BYTES},
};

/// `sha256("account:Escrow")[..8]`
pub const ESCROW_DISCRIMINATOR: [u8; 8] = [31, 213, 123, 187, 186, 22, 218, 155];

pub const DISCRIMINATOR_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowAccount {
    pub seed: u64,
    pub maker: Pubkey,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub deposit: u64,
    pub receive: u64,
    pub bump: u8,
}

impl EscrowAccount {
    /// 8 (discriminator) + 8 (seed) + 32 (maker) + 32 (mint_a) + 32 (mint_b)
    /// + 8 (deposit) + 8 (receive) + 1 (bump) = 129
    pub const LEN: usize = DISCRIMINATOR_LEN + 8 + PUBKEY_BYTES * 3 + 8 + 8 + 1;

    /// Decodes the leading `LEN` bytes of an account buffer.
    ///
    /// The discriminator is skipped, not checked. Trailing bytes past `LEN`
    /// are ignored.
    pub fn unpack(data: &[u8]) -> Result<Self, EscrowError> {
        if data.len() < Self::LEN {
            return Err(EscrowError::MalformedAccount {
                expected: Self::LEN,
                actual: data.len(),
            });
        }
        let src = array_ref![data, 0, EscrowAccount::LEN];
        let (_discriminator, seed, maker, mint_a, mint_b, deposit, receive, bump) =
            array_refs![src, DISCRIMINATOR_LEN, 8, 32, 32, 32, 8, 8, 1];

        Ok(EscrowAccount {
            seed: u64::from_le_bytes(*seed),
            maker: Pubkey::new_from_array(*maker),
            mint_a: Pubkey::new_from_array(*mint_a),
            mint_b: Pubkey::new_from_array(*mint_b),
            deposit: u64::from_le_bytes(*deposit),
            receive: u64::from_le_bytes(*receive),
            bump: bump[0],
        })
    }

    pub fn pack(&self) -> [u8; EscrowAccount::LEN] {
        let mut data = [0u8; EscrowAccount::LEN];
        let dst = array_mut_ref![data, 0, EscrowAccount::LEN];
        let (discriminator, seed, maker, mint_a, mint_b, deposit, receive, bump) =
            mut_array_refs![dst, DISCRIMINATOR_LEN, 8, 32, 32, 32, 8, 8, 1];

        *discriminator = ESCROW_DISCRIMINATOR;
        *seed = self.seed.to_le_bytes();
        maker.copy_from_slice(self.maker.as_ref());
        mint_a.copy_from_slice(self.mint_a.as_ref());
        mint_b.copy_from_slice(self.mint_b.as_ref());
        *deposit = self.deposit.to_le_bytes();
        *receive = self.receive.to_le_bytes();
        bump[0] = self.bump;
        data
    }

    /// Recomputes the escrow address from `maker` and `seed`.
    pub fn address(&self, program_id: &Pubkey) -> Result<Pubkey, EscrowError> {
        find_escrow_address(&self.maker, self.seed, program_id).map(|(address, _)| address)
    }

    /// Renders `deposit` and `receive` for display. Never feed the result back
    /// into amount arithmetic.
    pub fn display_amounts(&self, decimals_a: u8, decimals_b: u8) -> (String, String) {
        (
            format_amount(self.deposit, decimals_a),
            format_amount(self.receive, decimals_b),
        )
    }
}

pub fn has_escrow_discriminator(data: &[u8]) -> bool {
    data.len() >= DISCRIMINATOR_LEN && data[..DISCRIMINATOR_LEN] == ESCROW_DISCRIMINATOR
}

/// A decoded escrow together with what a listing needs to show it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowRecord {
    pub address: Pubkey,
    pub account: EscrowAccount,
    pub decimals_a: u8,
    pub decimals_b: u8,
    pub deposit_display: String,
    pub receive_display: String,
}

impl EscrowRecord {
    pub fn new(address: Pubkey, account: EscrowAccount, decimals_a: u8, decimals_b: u8) -> Self {
        let (deposit_display, receive_display) = account.display_amounts(decimals_a, decimals_b);
        EscrowRecord {
            address,
            account,
            decimals_a,
            decimals_b,
            deposit_display,
            receive_display,
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "Swap {} {} for {} {}",
            self.receive_display, self.account.mint_b, self.deposit_display, self.account.mint_a
        )
    }
}
