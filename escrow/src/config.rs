use std::time::Duration;

use solana_program::{pubkey, pubkey::Pubkey};
use solana_sdk::commitment_config::CommitmentConfig;

/// Deployed token-swap escrow program.
pub const ESCROW_PROGRAM_ID: Pubkey = pubkey!("6U2q3J5Ubi7gdboM1baGiz51kam7puCRo3QyztpEZ4FY");

/// Per-session settings threaded through every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowConfig {
    pub program_id: Pubkey,
    /// Token program that owns both mints and every token account involved.
    pub token_program: Pubkey,
    pub commitment: CommitmentConfig,
    /// Delay between signature status polls while confirming.
    pub poll_interval: Duration,
}

impl EscrowConfig {
    pub fn new(program_id: Pubkey) -> Self {
        EscrowConfig {
            program_id,
            ..Default::default()
        }
    }

    pub fn with_token_program(mut self, token_program: Pubkey) -> Self {
        self.token_program = token_program;
        self
    }

    pub fn with_commitment(mut self, commitment: CommitmentConfig) -> Self {
        self.commitment = commitment;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for EscrowConfig {
    fn default() -> Self {
        EscrowConfig {
            program_id: ESCROW_PROGRAM_ID,
            token_program: spl_token::id(),
            commitment: CommitmentConfig::confirmed(),
            poll_interval: Duration::from_millis(500),
        }
    }
}
