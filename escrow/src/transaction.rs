//! Drives one transaction from assembly to a final state.
//!
//! ```text
//! Built -> Submitted -> Confirmed
//!   |          |-----> Failed
//!   |          `-----> Expired
//!   `----------------> Expired   (checkpoint already stale at submission)
//! ```
//!
//! Nothing here retries. An expired transaction has an unknown outcome until
//! the affected accounts are read again; the caller rebuilds with a fresh
//! checkpoint if it still wants the effect.

use std::{fmt, thread, time::Duration};

use base64::{engine::general_purpose::STANDARD, Engine};
use log::{debug, info, warn};
use solana_program::{instruction::Instruction, message::Message, pubkey::Pubkey};
use solana_sdk::{signature::Signature, signer::Signer, transaction::Transaction};

use crate::{
    error::EscrowError,
    ledger::{Checkpoint, Ledger},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionState {
    Built,
    Submitted,
    Confirmed,
    Failed(String),
    Expired,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Built => write!(f, "built"),
            TransactionState::Submitted => write!(f, "submitted"),
            TransactionState::Confirmed => write!(f, "confirmed"),
            TransactionState::Failed(_) => write!(f, "failed"),
            TransactionState::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PendingTransaction {
    transaction: Transaction,
    checkpoint: Checkpoint,
    state: TransactionState,
}

impl PendingTransaction {
    /// Assembles `instructions` into one atomic transaction bound to
    /// `checkpoint`.
    pub fn new(instructions: &[Instruction], payer: &Pubkey, checkpoint: Checkpoint) -> Self {
        let message = Message::new_with_blockhash(instructions, Some(payer), &checkpoint.blockhash);
        PendingTransaction {
            transaction: Transaction::new_unsigned(message),
            checkpoint,
            state: TransactionState::Built,
        }
    }

    pub fn state(&self) -> &TransactionState {
        &self.state
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn into_transaction(self) -> Transaction {
        self.transaction
    }

    /// The fee payer's signature, which identifies the transaction. Default
    /// until signed.
    pub fn signature(&self) -> Signature {
        self.transaction
            .signatures
            .first()
            .copied()
            .unwrap_or_default()
    }

    pub fn sign(&mut self, signers: &[&dyn Signer]) -> Result<(), EscrowError> {
        if self.state != TransactionState::Built {
            return Err(EscrowError::Signing(format!(
                "cannot sign a {} transaction",
                self.state
            )));
        }
        let signers: Vec<&dyn Signer> = signers.to_vec();
        self.transaction
            .try_sign(&signers, self.checkpoint.blockhash)
            .map_err(|e| EscrowError::Signing(e.to_string()))
    }

    pub fn submit<L: Ledger + ?Sized>(&mut self, ledger: &L) -> Result<Signature, EscrowError> {
        if self.state != TransactionState::Built {
            return Err(EscrowError::SubmissionRejected(format!(
                "cannot submit a {} transaction",
                self.state
            )));
        }

        let block_height = ledger.block_height()?;
        if self.checkpoint.is_expired_at(block_height) {
            self.advance(TransactionState::Expired);
            return Err(self.expired());
        }

        match ledger.submit(&self.transaction) {
            Ok(signature) => {
                self.advance(TransactionState::Submitted);
                Ok(signature)
            }
            Err(e) => {
                self.advance(TransactionState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Polls until the transaction lands, fails, or outlives its checkpoint.
    pub fn confirm<L: Ledger + ?Sized>(
        &mut self,
        ledger: &L,
        poll_interval: Duration,
    ) -> Result<Signature, EscrowError> {
        if self.state != TransactionState::Submitted {
            return Err(EscrowError::SubmissionRejected(format!(
                "cannot confirm a {} transaction",
                self.state
            )));
        }

        let signature = self.signature();
        loop {
            // height first, so a status read afterwards cannot miss a landing
            let block_height = ledger.block_height()?;
            match ledger.signature_status(&signature)? {
                Some(Ok(())) => {
                    self.advance(TransactionState::Confirmed);
                    return Ok(signature);
                }
                Some(Err(reason)) => {
                    self.advance(TransactionState::Failed(reason.clone()));
                    return Err(EscrowError::TransactionFailed { signature, reason });
                }
                None if self.checkpoint.is_expired_at(block_height) => {
                    self.advance(TransactionState::Expired);
                    return Err(self.expired());
                }
                None => thread::sleep(poll_interval),
            }
        }
    }

    pub fn send_and_confirm<L: Ledger + ?Sized>(
        &mut self,
        ledger: &L,
        poll_interval: Duration,
    ) -> Result<Signature, EscrowError> {
        self.submit(ledger)?;
        self.confirm(ledger, poll_interval)
    }

    fn expired(&self) -> EscrowError {
        EscrowError::Expired {
            signature: self.signature(),
            last_valid_block_height: self.checkpoint.last_valid_block_height,
        }
    }

    fn advance(&mut self, next: TransactionState) {
        match &next {
            TransactionState::Confirmed => info!("transaction {} confirmed", self.signature()),
            TransactionState::Failed(reason) => {
                warn!("transaction {} failed: {}", self.signature(), reason)
            }
            TransactionState::Expired => warn!(
                "transaction {} expired after block height {}",
                self.signature(),
                self.checkpoint.last_valid_block_height
            ),
            _ => debug!("transaction {}: {} -> {}", self.signature(), self.state, next),
        }
        self.state = next;
    }
}

/// Serializes a (possibly partially signed) transaction for a wallet.
pub fn encode_transaction(transaction: &Transaction) -> Result<String, EscrowError> {
    let bytes = bincode::serialize(transaction).map_err(|e| EscrowError::Encoding(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use solana_program::{hash::Hash, system_instruction};
    use solana_sdk::signature::Keypair;

    use super::*;

    fn transfer(payer: &Keypair) -> PendingTransaction {
        let checkpoint = Checkpoint {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 100,
        };
        let ix = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1);
        PendingTransaction::new(&[ix], &payer.pubkey(), checkpoint)
    }

    #[test]
    fn new_transactions_are_built_and_unsigned() {
        let payer = Keypair::new();
        let pending = transfer(&payer);
        assert_eq!(pending.state(), &TransactionState::Built);
        assert_eq!(pending.signature(), Signature::default());
        assert_eq!(
            pending.transaction().message.recent_blockhash,
            pending.checkpoint().blockhash
        );
        assert_eq!(pending.transaction().message.account_keys[0], payer.pubkey());
    }

    #[test]
    fn signing_fills_the_payer_signature() {
        let payer = Keypair::new();
        let mut pending = transfer(&payer);
        pending.sign(&[&payer]).unwrap();
        assert_ne!(pending.signature(), Signature::default());
        assert!(pending.transaction().verify().is_ok());
    }

    #[test]
    fn signing_without_the_payer_fails() {
        let payer = Keypair::new();
        let mut pending = transfer(&payer);
        let stranger = Keypair::new();
        assert!(matches!(
            pending.sign(&[&stranger]),
            Err(EscrowError::Signing(_))
        ));
    }

    #[test]
    fn encoded_transaction_is_base64_bincode() {
        let payer = Keypair::new();
        let pending = transfer(&payer);
        let encoded = encode_transaction(pending.transaction()).unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        let decoded: Transaction = bincode::deserialize(&bytes).unwrap();
        assert_eq!(&decoded, pending.transaction());
    }
}
