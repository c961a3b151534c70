//! Client for the token-swap escrow program.
//!
//! A maker locks `deposit` of mint A in a vault owned by a program-derived
//! escrow account and asks for `receive` of mint B. A taker settles the whole
//! swap in one transaction, or the maker refunds.
//!
//! Layers, leaves first: [`state`] and [`amount`] decode and format,
//! [`pda`] derives addresses, [`instruction`] builds instructions,
//! [`transaction`] and [`processor`] drive them through a [`ledger::Ledger`],
//! and [`index`] keeps the advisory owner-to-escrow table.

pub mod amount;
pub mod config;
pub mod error;
pub mod index;
pub mod instruction;
pub mod ledger;
pub mod pda;
pub mod processor;
pub mod state;
pub mod transaction;

pub use config::{EscrowConfig, ESCROW_PROGRAM_ID};
pub use error::EscrowError;
pub use index::{EscrowIndex, IndexError, MemoryIndex};
pub use ledger::{Checkpoint, Ledger};
pub use processor::{MakeParams, Outcome};
pub use state::{EscrowAccount, EscrowRecord};
pub use transaction::{PendingTransaction, TransactionState};
