use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};

use escrow_client::{
    instruction::EscrowInstruction, pda::find_escrow_address, Checkpoint, EscrowAccount,
    EscrowError, EscrowIndex, IndexError, Ledger,
};
use solana_program::{
    hash::Hash, instruction::Instruction, program_option::COption, program_pack::Pack,
    pubkey::Pubkey,
};
use solana_sdk::{account::Account, signature::Signature, transaction::Transaction};
use spl_token::state::{Account as TokenAccount, Mint};

/// Blocks a fresh checkpoint stays valid for.
pub const VALIDITY_WINDOW: u64 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Landing {
    Normal,
    Fail,
    Drop,
}

/// In-memory cluster running a model of the escrow program.
///
/// Every `block_height` query advances the chain by one block so confirmation
/// loops make progress.
pub struct TestLedger {
    program_id: Pubkey,
    accounts: RefCell<HashMap<Pubkey, Account>>,
    block_height: Cell<u64>,
    blockhashes: RefCell<HashMap<Hash, u64>>,
    statuses: RefCell<HashMap<Signature, Result<(), String>>>,
    next_landing: Cell<Landing>,
    pub submitted: RefCell<Vec<Transaction>>,
}

impl TestLedger {
    pub fn new(program_id: Pubkey) -> Self {
        TestLedger {
            program_id,
            accounts: RefCell::new(HashMap::new()),
            block_height: Cell::new(1_000),
            blockhashes: RefCell::new(HashMap::new()),
            statuses: RefCell::new(HashMap::new()),
            next_landing: Cell::new(Landing::Normal),
            submitted: RefCell::new(Vec::new()),
        }
    }

    pub fn create_mint(&self, decimals: u8) -> Pubkey {
        let mint = Pubkey::new_unique();
        let state = Mint {
            mint_authority: COption::None,
            supply: 0,
            decimals,
            is_initialized: true,
            freeze_authority: COption::None,
        };
        let mut data = vec![0u8; Mint::LEN];
        Mint::pack(state, &mut data).unwrap();
        self.set_account(mint, data, spl_token::id());
        mint
    }

    pub fn create_token_account(&self, address: &Pubkey) {
        self.set_account(*address, vec![0u8; TokenAccount::LEN], spl_token::id());
    }

    pub fn set_account(&self, address: Pubkey, data: Vec<u8>, owner: Pubkey) {
        self.accounts.borrow_mut().insert(
            address,
            Account {
                lamports: 1_000_000,
                data,
                owner,
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    pub fn exists(&self, address: &Pubkey) -> bool {
        self.accounts.borrow().contains_key(address)
    }

    /// A checkpoint whose last valid height is already behind the chain.
    pub fn stale_checkpoint(&self) -> Checkpoint {
        let checkpoint = Checkpoint {
            blockhash: Hash::new_unique(),
            last_valid_block_height: self.block_height.get() - 1,
        };
        self.blockhashes
            .borrow_mut()
            .insert(checkpoint.blockhash, checkpoint.last_valid_block_height);
        checkpoint
    }

    /// The next accepted transaction executes and fails.
    pub fn fail_next(&self) {
        self.next_landing.set(Landing::Fail);
    }

    /// The next accepted transaction is never processed.
    pub fn drop_next(&self) {
        self.next_landing.set(Landing::Drop);
    }

    fn process(
        &self,
        accounts: &mut HashMap<Pubkey, Account>,
        ix: &Instruction,
    ) -> Result<(), String> {
        let key = |i: usize| ix.accounts[i].pubkey;
        let token_account = || Account {
            lamports: 1_000_000,
            data: vec![0u8; TokenAccount::LEN],
            owner: spl_token::id(),
            executable: false,
            rent_epoch: 0,
        };

        if ix.program_id == spl_associated_token_account::id() {
            if accounts.contains_key(&key(1)) {
                return Err("associated token account already in use".to_string());
            }
            accounts.insert(key(1), token_account());
            return Ok(());
        }
        if ix.program_id != self.program_id {
            return Err(format!("unsupported program {}", ix.program_id));
        }

        match EscrowInstruction::unpack(&ix.data) {
            Some(EscrowInstruction::Make(args)) => {
                let (maker, escrow, vault) = (key(0), key(4), key(5));
                if accounts.contains_key(&escrow) {
                    return Err("escrow already in use".to_string());
                }
                if !accounts.contains_key(&key(3)) {
                    return Err("maker has no mint A account".to_string());
                }
                let (expected, bump) =
                    find_escrow_address(&maker, args.seed, &self.program_id).unwrap();
                if expected != escrow {
                    return Err("escrow seeds constraint violated".to_string());
                }
                let state = EscrowAccount {
                    seed: args.seed,
                    maker,
                    mint_a: key(1),
                    mint_b: key(2),
                    deposit: args.deposit,
                    receive: args.receive,
                    bump,
                };
                accounts.insert(
                    escrow,
                    Account {
                        lamports: 2_000_000,
                        data: state.pack().to_vec(),
                        owner: self.program_id,
                        executable: false,
                        rent_epoch: 0,
                    },
                );
                accounts.insert(vault, token_account());
                Ok(())
            }
            Some(EscrowInstruction::Take) => {
                let (maker, escrow, vault) = (key(1), key(7), key(8));
                let state = accounts
                    .get(&escrow)
                    .ok_or("escrow not initialized")
                    .and_then(|a| EscrowAccount::unpack(&a.data).map_err(|_| "bad escrow"))?;
                if state.maker != maker {
                    return Err("maker mismatch".to_string());
                }
                if !accounts.contains_key(&key(5)) {
                    return Err("taker has no mint B account".to_string());
                }
                if !accounts.contains_key(&key(6)) {
                    return Err("maker mint B account not initialized".to_string());
                }
                accounts.entry(key(4)).or_insert_with(token_account);
                accounts.remove(&escrow);
                accounts.remove(&vault);
                Ok(())
            }
            Some(EscrowInstruction::Refund) => {
                let (maker, escrow, vault) = (key(0), key(3), key(4));
                let state = accounts
                    .get(&escrow)
                    .ok_or("escrow not initialized")
                    .and_then(|a| EscrowAccount::unpack(&a.data).map_err(|_| "bad escrow"))?;
                if state.maker != maker {
                    return Err("maker mismatch".to_string());
                }
                accounts.entry(key(2)).or_insert_with(token_account);
                accounts.remove(&escrow);
                accounts.remove(&vault);
                Ok(())
            }
            None => Err("unknown instruction".to_string()),
        }
    }
}

impl Ledger for TestLedger {
    fn account(&self, address: &Pubkey) -> Result<Option<Account>, EscrowError> {
        Ok(self.accounts.borrow().get(address).cloned())
    }

    fn latest_checkpoint(&self) -> Result<Checkpoint, EscrowError> {
        let checkpoint = Checkpoint {
            blockhash: Hash::new_unique(),
            last_valid_block_height: self.block_height.get() + VALIDITY_WINDOW,
        };
        self.blockhashes
            .borrow_mut()
            .insert(checkpoint.blockhash, checkpoint.last_valid_block_height);
        Ok(checkpoint)
    }

    fn block_height(&self) -> Result<u64, EscrowError> {
        let height = self.block_height.get();
        self.block_height.set(height + 1);
        Ok(height)
    }

    fn submit(&self, transaction: &Transaction) -> Result<Signature, EscrowError> {
        transaction
            .verify()
            .map_err(|e| EscrowError::SubmissionRejected(e.to_string()))?;
        let last_valid = *self
            .blockhashes
            .borrow()
            .get(&transaction.message.recent_blockhash)
            .ok_or_else(|| EscrowError::SubmissionRejected("Blockhash not found".to_string()))?;

        self.submitted.borrow_mut().push(transaction.clone());
        let signature = transaction.signatures[0];
        let landing = self.next_landing.replace(Landing::Normal);
        if landing == Landing::Drop || self.block_height.get() > last_valid {
            return Ok(signature);
        }

        let instructions: Vec<Instruction> = transaction
            .message
            .instructions
            .iter()
            .map(|compiled| Instruction {
                program_id: transaction.message.account_keys[compiled.program_id_index as usize],
                accounts: compiled
                    .accounts
                    .iter()
                    .map(|&i| solana_program::instruction::AccountMeta {
                        pubkey: transaction.message.account_keys[i as usize],
                        is_signer: transaction.message.is_signer(i as usize),
                        is_writable: transaction.message.is_writable(i as usize),
                    })
                    .collect(),
                data: compiled.data.clone(),
            })
            .collect();

        // all or nothing
        let mut accounts = self.accounts.borrow().clone();
        let result = if landing == Landing::Fail {
            Err("custom program error: 0x1".to_string())
        } else {
            instructions
                .iter()
                .try_for_each(|ix| self.process(&mut accounts, ix))
        };
        if result.is_ok() {
            *self.accounts.borrow_mut() = accounts;
        }
        self.statuses.borrow_mut().insert(signature, result);
        Ok(signature)
    }

    fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), String>>, EscrowError> {
        Ok(self.statuses.borrow().get(signature).cloned())
    }
}

/// An index whose writes always fail.
pub struct UnavailableIndex;

impl EscrowIndex for UnavailableIndex {
    fn get(&self, _owner: &Pubkey) -> Result<Vec<Pubkey>, IndexError> {
        Err(IndexError("connection refused".to_string()))
    }

    fn put(&self, _owner: &Pubkey, _escrow: &Pubkey) -> Result<(), IndexError> {
        Err(IndexError("connection refused".to_string()))
    }

    fn delete(&self, _owner: &Pubkey, _escrow: &Pubkey) -> Result<(), IndexError> {
        Err(IndexError("connection refused".to_string()))
    }
}

pub fn ata(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(owner, mint)
}
