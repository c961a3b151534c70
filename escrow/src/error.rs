use solana_program::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("Account data is malformed: expected at least {expected} bytes, got {actual}")]
    MalformedAccount { expected: usize, actual: usize },
    #[error("No valid bump seed found for the program address")]
    DerivationExhausted,
    #[error("Owner {0} is not on the ed25519 curve")]
    OwnerOffCurve(Pubkey),
    #[error("Account {0} does not exist")]
    AccountNotFound(Pubkey),
    #[error("Account {address} is owned by {owner}, not the escrow program")]
    NotOwnedByProgram { address: Pubkey, owner: Pubkey },
    #[error("An escrow already exists at {0}")]
    EscrowExists(Pubkey),
    #[error("Invalid token amount: {0}")]
    InvalidAmount(String),
    #[error("Transaction rejected: {0}")]
    SubmissionRejected(String),
    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: Signature, reason: String },
    #[error("Transaction {signature} expired after block height {last_valid_block_height}")]
    Expired {
        signature: Signature,
        last_valid_block_height: u64,
    },
    #[error("Escrow index update failed: {0}")]
    IndexSyncFailed(String),
    #[error("Escrow index unavailable: {0}")]
    Index(String),
    #[error("RPC request failed: {0}")]
    Rpc(String),
    #[error("Signing failed: {0}")]
    Signing(String),
    #[error("Transaction encoding failed: {0}")]
    Encoding(String),
}

impl EscrowError {
    /// Whether replaying the whole pipeline can change the outcome.
    ///
    /// Decoding and derivation are deterministic, so their errors never
    /// retry. Network-side errors are surfaced with a user-driven retry;
    /// after `Expired` the caller should re-read the escrow first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EscrowError::AccountNotFound(_)
                | EscrowError::SubmissionRejected(_)
                | EscrowError::Expired { .. }
                | EscrowError::Rpc(_)
                | EscrowError::Index(_)
        )
    }
}
