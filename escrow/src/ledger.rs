//! The network side of the client.
//!
//! [`Ledger`] is the seam between the orchestrator and whatever RPC
//! connection the caller already has. It is implemented for the blocking
//! [`RpcClient`].

use solana_client::rpc_client::RpcClient;
use solana_program::{hash::Hash, program_pack::Pack, pubkey::Pubkey};
use solana_sdk::{account::Account, signature::Signature, transaction::Transaction};
use spl_token::state::Mint;

use crate::{config::EscrowConfig, error::EscrowError};

/// A recent blockhash and the last block height at which a transaction
/// referencing it can still land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

impl Checkpoint {
    pub fn is_expired_at(&self, block_height: u64) -> bool {
        block_height > self.last_valid_block_height
    }
}

pub trait Ledger {
    /// Returns `None` when the account does not exist.
    fn account(&self, address: &Pubkey) -> Result<Option<Account>, EscrowError>;

    fn latest_checkpoint(&self) -> Result<Checkpoint, EscrowError>;

    fn block_height(&self) -> Result<u64, EscrowError>;

    /// Sends a signed transaction without waiting for it to land.
    fn submit(&self, transaction: &Transaction) -> Result<Signature, EscrowError>;

    /// `None` while the signature is unknown to the cluster, otherwise the
    /// execution result with the failure rendered as text.
    fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), String>>, EscrowError>;

    fn account_exists(&self, address: &Pubkey) -> Result<bool, EscrowError> {
        Ok(self.account(address)?.is_some())
    }
}

/// Opens a blocking RPC connection at the session's commitment level.
pub fn connect(config: &EscrowConfig, url: impl ToString) -> RpcClient {
    RpcClient::new_with_commitment(url.to_string(), config.commitment)
}

impl Ledger for RpcClient {
    fn account(&self, address: &Pubkey) -> Result<Option<Account>, EscrowError> {
        self.get_account_with_commitment(address, self.commitment())
            .map(|response| response.value)
            .map_err(|e| EscrowError::Rpc(e.to_string()))
    }

    fn latest_checkpoint(&self) -> Result<Checkpoint, EscrowError> {
        let (blockhash, last_valid_block_height) = self
            .get_latest_blockhash_with_commitment(self.commitment())
            .map_err(|e| EscrowError::Rpc(e.to_string()))?;
        Ok(Checkpoint {
            blockhash,
            last_valid_block_height,
        })
    }

    fn block_height(&self) -> Result<u64, EscrowError> {
        self.get_block_height_with_commitment(self.commitment())
            .map_err(|e| EscrowError::Rpc(e.to_string()))
    }

    fn submit(&self, transaction: &Transaction) -> Result<Signature, EscrowError> {
        self.send_transaction(transaction)
            .map_err(|e| EscrowError::SubmissionRejected(e.to_string()))
    }

    fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), String>>, EscrowError> {
        self.get_signature_status_with_commitment(signature, self.commitment())
            .map(|status| status.map(|result| result.map_err(|e| e.to_string())))
            .map_err(|e| EscrowError::Rpc(e.to_string()))
    }
}

/// Fetches an account, turning absence into [`EscrowError::AccountNotFound`].
pub fn require_account<L: Ledger + ?Sized>(
    ledger: &L,
    address: &Pubkey,
) -> Result<Account, EscrowError> {
    ledger
        .account(address)?
        .ok_or(EscrowError::AccountNotFound(*address))
}

/// Reads a mint's decimal precision. Only display and input scaling use it.
pub fn mint_decimals<L: Ledger + ?Sized>(ledger: &L, mint: &Pubkey) -> Result<u8, EscrowError> {
    let account = require_account(ledger, mint)?;
    if account.data.len() < Mint::LEN {
        return Err(EscrowError::MalformedAccount {
            expected: Mint::LEN,
            actual: account.data.len(),
        });
    }
    // Token-2022 mints carry extensions after the base layout
    let state = Mint::unpack_from_slice(&account.data[..Mint::LEN]).map_err(|_| {
        EscrowError::MalformedAccount {
            expected: Mint::LEN,
            actual: account.data.len(),
        }
    })?;
    Ok(state.decimals)
}
