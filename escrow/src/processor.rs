// Escrow pipelines: derive -> build -> submit -> confirm -> index update
use log::{debug, info, warn};
use solana_program::{instruction::Instruction, pubkey::Pubkey};
use solana_sdk::{signature::Signature, signer::Signer, transaction::Transaction};

use crate::{
    amount::parse_amount,
    config::EscrowConfig,
    error::EscrowError,
    index::{EscrowIndex, IndexError},
    instruction::{self, TakeAccounts},
    ledger::{mint_decimals, require_account, Checkpoint, Ledger},
    pda::find_escrow_address,
    state::{EscrowAccount, EscrowRecord},
    transaction::PendingTransaction,
};

/// Terms of a new escrow, amounts in base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MakeParams {
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub seed: u64,
    pub deposit: u64,
    pub receive: u64,
}

/// Result of a confirmed pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub signature: Signature,
    pub escrow: Pubkey,
    /// Set when the index could not be updated. The on-chain effect stands.
    pub index_warning: Option<EscrowError>,
}

/// Reads and decodes an escrow owned by the configured program.
pub fn fetch_escrow<L: Ledger + ?Sized>(
    config: &EscrowConfig,
    ledger: &L,
    address: &Pubkey,
) -> Result<EscrowAccount, EscrowError> {
    let account = require_account(ledger, address)?;
    if account.owner != config.program_id {
        return Err(EscrowError::NotOwnedByProgram {
            address: *address,
            owner: account.owner,
        });
    }
    EscrowAccount::unpack(&account.data)
}

pub fn fetch_record<L: Ledger + ?Sized>(
    config: &EscrowConfig,
    ledger: &L,
    address: &Pubkey,
) -> Result<EscrowRecord, EscrowError> {
    let escrow = fetch_escrow(config, ledger, address)?;
    let decimals_a = mint_decimals(ledger, &escrow.mint_a)?;
    let decimals_b = mint_decimals(ledger, &escrow.mint_b)?;
    Ok(EscrowRecord::new(*address, escrow, decimals_a, decimals_b))
}

/// Escrows the index lists for `owner`, read fresh from the ledger. Entries
/// whose account is already closed are skipped.
pub fn list_escrows<L: Ledger + ?Sized, I: EscrowIndex + ?Sized>(
    config: &EscrowConfig,
    ledger: &L,
    index: &I,
    owner: &Pubkey,
) -> Result<Vec<EscrowRecord>, EscrowError> {
    let addresses = index
        .get(owner)
        .map_err(|e| EscrowError::Index(e.to_string()))?;

    let mut records = Vec::with_capacity(addresses.len());
    for address in addresses {
        match fetch_record(config, ledger, &address) {
            Ok(record) => records.push(record),
            Err(EscrowError::AccountNotFound(missing)) if missing == address => {
                debug!("escrow {} is indexed for {} but closed", address, owner);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(records)
}

/// Converts decimal user input into base units of `mint`.
pub fn base_units<L: Ledger + ?Sized>(
    ledger: &L,
    mint: &Pubkey,
    amount: &str,
) -> Result<u64, EscrowError> {
    let decimals = mint_decimals(ledger, mint)?;
    parse_amount(amount, decimals)
}

/// Builds the fulfillment instructions, creating the maker's mint B account
/// first when it does not exist yet.
pub fn build_fulfill<L: Ledger + ?Sized>(
    config: &EscrowConfig,
    ledger: &L,
    taker: &Pubkey,
    escrow: &EscrowAccount,
) -> Result<Vec<Instruction>, EscrowError> {
    let accounts = TakeAccounts::resolve(config, taker, escrow)?;
    let maker_receive_exists = ledger.account_exists(&accounts.maker_ata_b)?;
    if !maker_receive_exists {
        debug!(
            "maker {} has no account for {}, creating {}",
            escrow.maker, escrow.mint_b, accounts.maker_ata_b
        );
    }
    instruction::fulfill(config, taker, escrow, maker_receive_exists)
}

/// Signs `instructions` as one transaction bound to `checkpoint` and drives
/// it to a final state.
pub fn execute<L: Ledger + ?Sized>(
    config: &EscrowConfig,
    ledger: &L,
    instructions: &[Instruction],
    payer: &dyn Signer,
    checkpoint: Checkpoint,
) -> Result<Signature, EscrowError> {
    let mut pending = PendingTransaction::new(instructions, &payer.pubkey(), checkpoint);
    pending.sign(&[payer])?;
    pending.send_and_confirm(ledger, config.poll_interval)
}

pub fn make<L: Ledger + ?Sized, I: EscrowIndex + ?Sized>(
    config: &EscrowConfig,
    ledger: &L,
    index: &I,
    maker: &dyn Signer,
    params: MakeParams,
) -> Result<Outcome, EscrowError> {
    if params.deposit == 0 || params.receive == 0 {
        return Err(EscrowError::InvalidAmount(
            "deposit and receive must be greater than zero".to_string(),
        ));
    }

    let maker_key = maker.pubkey();
    let (escrow, _) = find_escrow_address(&maker_key, params.seed, &config.program_id)?;
    if ledger.account_exists(&escrow)? {
        return Err(EscrowError::EscrowExists(escrow));
    }

    let ix = instruction::make(
        config,
        &maker_key,
        &params.mint_a,
        &params.mint_b,
        params.seed,
        params.deposit,
        params.receive,
    )?;
    let checkpoint = ledger.latest_checkpoint()?;
    let signature = execute(config, ledger, &[ix], maker, checkpoint)?;
    info!("escrow {} created by {}", escrow, maker_key);

    Ok(Outcome {
        signature,
        escrow,
        index_warning: sync_index(index.put(&maker_key, &escrow), "record", &escrow),
    })
}

pub fn take<L: Ledger + ?Sized, I: EscrowIndex + ?Sized>(
    config: &EscrowConfig,
    ledger: &L,
    index: &I,
    taker: &dyn Signer,
    escrow_address: &Pubkey,
) -> Result<Outcome, EscrowError> {
    let escrow = fetch_escrow(config, ledger, escrow_address)?;
    let instructions = build_fulfill(config, ledger, &taker.pubkey(), &escrow)?;
    let checkpoint = ledger.latest_checkpoint()?;
    let signature = execute(config, ledger, &instructions, taker, checkpoint)?;
    info!("escrow {} taken by {}", escrow_address, taker.pubkey());

    Ok(Outcome {
        signature,
        escrow: *escrow_address,
        index_warning: sync_index(
            index.delete(&escrow.maker, escrow_address),
            "remove",
            escrow_address,
        ),
    })
}

pub fn refund<L: Ledger + ?Sized, I: EscrowIndex + ?Sized>(
    config: &EscrowConfig,
    ledger: &L,
    index: &I,
    maker: &dyn Signer,
    escrow_address: &Pubkey,
) -> Result<Outcome, EscrowError> {
    let escrow = fetch_escrow(config, ledger, escrow_address)?;
    let ix = instruction::refund(config, &escrow)?;
    let checkpoint = ledger.latest_checkpoint()?;
    let signature = execute(config, ledger, &[ix], maker, checkpoint)?;
    info!("escrow {} refunded to {}", escrow_address, escrow.maker);

    Ok(Outcome {
        signature,
        escrow: *escrow_address,
        index_warning: sync_index(
            index.delete(&escrow.maker, escrow_address),
            "remove",
            escrow_address,
        ),
    })
}

/// Builds an unsigned fulfillment with `taker` as fee payer, for a wallet to
/// sign and send. The index is left alone because nothing has landed.
pub fn prepare_take<L: Ledger + ?Sized>(
    config: &EscrowConfig,
    ledger: &L,
    taker: &Pubkey,
    escrow_address: &Pubkey,
) -> Result<Transaction, EscrowError> {
    let escrow = fetch_escrow(config, ledger, escrow_address)?;
    let instructions = build_fulfill(config, ledger, taker, &escrow)?;
    let checkpoint = ledger.latest_checkpoint()?;
    Ok(PendingTransaction::new(&instructions, taker, checkpoint).into_transaction())
}

fn sync_index(
    result: Result<(), IndexError>,
    action: &str,
    escrow: &Pubkey,
) -> Option<EscrowError> {
    match result {
        Ok(()) => None,
        Err(e) => {
            warn!("could not {} escrow {} in the index: {}", action, escrow, e);
            Some(EscrowError::IndexSyncFailed(e.to_string()))
        }
    }
}
