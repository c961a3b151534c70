// Instruction builders for the escrow program
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};
use spl_associated_token_account::instruction::create_associated_token_account;

use crate::{
    config::EscrowConfig,
    error::EscrowError,
    pda::{associated_token_address, find_escrow_address},
    state::EscrowAccount,
};

/// `sha256("global:make")[..8]`
pub const MAKE_DISCRIMINATOR: [u8; 8] = [138, 227, 232, 77, 223, 166, 96, 197];
/// `sha256("global:take")[..8]`
pub const TAKE_DISCRIMINATOR: [u8; 8] = [149, 226, 52, 104, 6, 142, 230, 39];
/// `sha256("global:refund")[..8]`
pub const REFUND_DISCRIMINATOR: [u8; 8] = [2, 96, 183, 251, 63, 208, 46, 46];

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MakeArgs {
    pub seed: u64,
    pub deposit: u64,
    pub receive: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowInstruction {
    Make(MakeArgs),
    Take,
    Refund,
}

impl EscrowInstruction {
    pub fn pack(&self) -> Result<Vec<u8>, EscrowError> {
        match self {
            EscrowInstruction::Make(args) => {
                let mut data = MAKE_DISCRIMINATOR.to_vec();
                args.serialize(&mut data)
                    .map_err(|e| EscrowError::Encoding(e.to_string()))?;
                Ok(data)
            }
            EscrowInstruction::Take => Ok(TAKE_DISCRIMINATOR.to_vec()),
            EscrowInstruction::Refund => Ok(REFUND_DISCRIMINATOR.to_vec()),
        }
    }

    pub fn unpack(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }
        let (discriminator, rest) = data.split_at(8);
        let discriminator: [u8; 8] = discriminator.try_into().ok()?;
        match discriminator {
            MAKE_DISCRIMINATOR => MakeArgs::try_from_slice(rest).ok().map(EscrowInstruction::Make),
            TAKE_DISCRIMINATOR => Some(EscrowInstruction::Take),
            REFUND_DISCRIMINATOR => Some(EscrowInstruction::Refund),
            _ => None,
        }
    }
}

/// Accounts of the `make` instruction, in program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MakeAccounts {
    pub maker: Pubkey,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub maker_ata_a: Pubkey,
    pub escrow: Pubkey,
    pub vault: Pubkey,
    pub token_program: Pubkey,
}

impl MakeAccounts {
    pub fn resolve(
        config: &EscrowConfig,
        maker: &Pubkey,
        mint_a: &Pubkey,
        mint_b: &Pubkey,
        seed: u64,
    ) -> Result<Self, EscrowError> {
        let (escrow, _) = find_escrow_address(maker, seed, &config.program_id)?;
        Ok(MakeAccounts {
            maker: *maker,
            mint_a: *mint_a,
            mint_b: *mint_b,
            maker_ata_a: associated_token_address(mint_a, maker, false, &config.token_program)?,
            escrow,
            vault: associated_token_address(mint_a, &escrow, true, &config.token_program)?,
            token_program: config.token_program,
        })
    }

    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.maker, true),
            AccountMeta::new_readonly(self.mint_a, false),
            AccountMeta::new_readonly(self.mint_b, false),
            AccountMeta::new(self.maker_ata_a, false),
            AccountMeta::new(self.escrow, false),
            AccountMeta::new(self.vault, false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            AccountMeta::new_readonly(self.token_program, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ]
    }
}

/// Accounts of the `take` instruction, in program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TakeAccounts {
    pub taker: Pubkey,
    pub maker: Pubkey,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub taker_ata_a: Pubkey,
    pub taker_ata_b: Pubkey,
    pub maker_ata_b: Pubkey,
    pub escrow: Pubkey,
    pub vault: Pubkey,
    pub token_program: Pubkey,
}

impl TakeAccounts {
    pub fn resolve(
        config: &EscrowConfig,
        taker: &Pubkey,
        escrow: &EscrowAccount,
    ) -> Result<Self, EscrowError> {
        let address = escrow.address(&config.program_id)?;
        let token_program = &config.token_program;
        Ok(TakeAccounts {
            taker: *taker,
            maker: escrow.maker,
            mint_a: escrow.mint_a,
            mint_b: escrow.mint_b,
            taker_ata_a: associated_token_address(&escrow.mint_a, taker, false, token_program)?,
            taker_ata_b: associated_token_address(&escrow.mint_b, taker, false, token_program)?,
            maker_ata_b: associated_token_address(
                &escrow.mint_b,
                &escrow.maker,
                false,
                token_program,
            )?,
            escrow: address,
            vault: associated_token_address(&escrow.mint_a, &address, true, token_program)?,
            token_program: *token_program,
        })
    }

    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.taker, true),
            AccountMeta::new(self.maker, false),
            AccountMeta::new_readonly(self.mint_a, false),
            AccountMeta::new_readonly(self.mint_b, false),
            AccountMeta::new(self.taker_ata_a, false),
            AccountMeta::new(self.taker_ata_b, false),
            AccountMeta::new(self.maker_ata_b, false),
            AccountMeta::new(self.escrow, false),
            AccountMeta::new(self.vault, false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            AccountMeta::new_readonly(self.token_program, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ]
    }
}

/// Accounts of the `refund` instruction, in program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundAccounts {
    pub maker: Pubkey,
    pub mint_a: Pubkey,
    pub maker_ata_a: Pubkey,
    pub escrow: Pubkey,
    pub vault: Pubkey,
    pub token_program: Pubkey,
}

impl RefundAccounts {
    pub fn resolve(config: &EscrowConfig, escrow: &EscrowAccount) -> Result<Self, EscrowError> {
        let address = escrow.address(&config.program_id)?;
        let token_program = &config.token_program;
        Ok(RefundAccounts {
            maker: escrow.maker,
            mint_a: escrow.mint_a,
            maker_ata_a: associated_token_address(
                &escrow.mint_a,
                &escrow.maker,
                false,
                token_program,
            )?,
            escrow: address,
            vault: associated_token_address(&escrow.mint_a, &address, true, token_program)?,
            token_program: *token_program,
        })
    }

    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.maker, true),
            AccountMeta::new_readonly(self.mint_a, false),
            AccountMeta::new(self.maker_ata_a, false),
            AccountMeta::new(self.escrow, false),
            AccountMeta::new(self.vault, false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            AccountMeta::new_readonly(self.token_program, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ]
    }
}

/// Builds `make`. `deposit` and `receive` are base units; convert decimal
/// input with [`crate::amount::parse_amount`] first.
pub fn make(
    config: &EscrowConfig,
    maker: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
    seed: u64,
    deposit: u64,
    receive: u64,
) -> Result<Instruction, EscrowError> {
    let accounts = MakeAccounts::resolve(config, maker, mint_a, mint_b, seed)?;
    Ok(Instruction {
        program_id: config.program_id,
        accounts: accounts.to_account_metas(),
        data: EscrowInstruction::Make(MakeArgs {
            seed,
            deposit,
            receive,
        })
        .pack()?,
    })
}

pub fn take(
    config: &EscrowConfig,
    taker: &Pubkey,
    escrow: &EscrowAccount,
) -> Result<Instruction, EscrowError> {
    let accounts = TakeAccounts::resolve(config, taker, escrow)?;
    Ok(Instruction {
        program_id: config.program_id,
        accounts: accounts.to_account_metas(),
        data: EscrowInstruction::Take.pack()?,
    })
}

pub fn refund(config: &EscrowConfig, escrow: &EscrowAccount) -> Result<Instruction, EscrowError> {
    let accounts = RefundAccounts::resolve(config, escrow)?;
    Ok(Instruction {
        program_id: config.program_id,
        accounts: accounts.to_account_metas(),
        data: EscrowInstruction::Refund.pack()?,
    })
}

/// Creates the maker's mint B token account, paid for by the taker.
pub fn create_maker_receive_account(
    config: &EscrowConfig,
    payer: &Pubkey,
    escrow: &EscrowAccount,
) -> Instruction {
    create_associated_token_account(payer, &escrow.maker, &escrow.mint_b, &config.token_program)
}

/// Builds the fulfillment sequence. When the maker has no mint B account yet,
/// its creation goes first so both land in one transaction.
pub fn fulfill(
    config: &EscrowConfig,
    taker: &Pubkey,
    escrow: &EscrowAccount,
    maker_receive_exists: bool,
) -> Result<Vec<Instruction>, EscrowError> {
    let mut instructions = Vec::with_capacity(2);
    if !maker_receive_exists {
        instructions.push(create_maker_receive_account(config, taker, escrow));
    }
    instructions.push(take(config, taker, escrow)?);
    Ok(instructions)
}
