//! Side table from an owner to the escrows it created.
//!
//! The index is advisory. The ledger is authoritative, and the two may
//! disagree for a while after a failed bookkeeping write.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use solana_program::pubkey::Pubkey;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct IndexError(pub String);

pub trait EscrowIndex {
    /// Escrows recorded for `owner`, oldest first. Unknown owners have none.
    fn get(&self, owner: &Pubkey) -> Result<Vec<Pubkey>, IndexError>;

    /// Records `escrow` under `owner`, creating the owner if needed.
    fn put(&self, owner: &Pubkey, escrow: &Pubkey) -> Result<(), IndexError>;

    /// Removes `escrow` from `owner`. Absent owners and addresses are a no-op.
    fn delete(&self, owner: &Pubkey, escrow: &Pubkey) -> Result<(), IndexError>;
}

#[derive(Debug, Default)]
pub struct MemoryIndex {
    escrows: RwLock<HashMap<Pubkey, Vec<Pubkey>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> IndexError {
    IndexError("index lock poisoned".to_string())
}

impl EscrowIndex for MemoryIndex {
    fn get(&self, owner: &Pubkey) -> Result<Vec<Pubkey>, IndexError> {
        let escrows = self.escrows.read().map_err(poisoned)?;
        Ok(escrows.get(owner).cloned().unwrap_or_default())
    }

    fn put(&self, owner: &Pubkey, escrow: &Pubkey) -> Result<(), IndexError> {
        let mut escrows = self.escrows.write().map_err(poisoned)?;
        let list = escrows.entry(*owner).or_default();
        // writes may be replayed
        if !list.contains(escrow) {
            list.push(*escrow);
        }
        Ok(())
    }

    fn delete(&self, owner: &Pubkey, escrow: &Pubkey) -> Result<(), IndexError> {
        let mut escrows = self.escrows.write().map_err(poisoned)?;
        if let Some(list) = escrows.get_mut(owner) {
            list.retain(|address| address != escrow);
        }
        Ok(())
    }
}
