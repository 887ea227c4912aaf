use crate::block::{Block, BlockHash, GENESIS_PREVIOUS_HASH};
use crate::error::{ChainError, Result};
use crate::pow::{self, MiningControl, MAX_DIFFICULTY};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

/// An append-only sequence of proof-of-work blocks plus a pending-transaction
/// buffer. All state is per instance.
#[derive(Debug, Clone)]
pub struct Chain<T> {
    blocks: Vec<Block<T>>,
    pending_transactions: Vec<T>,
    difficulty: u32,
}

impl<T: Serialize + Clone> Chain<T> {
    /// Create an empty chain. Call [`Chain::create_genesis`] before mining.
    pub fn new(difficulty: u32) -> Result<Self> {
        check_difficulty(difficulty)?;
        Ok(Self {
            blocks: Vec::new(),
            pending_transactions: Vec::new(),
            difficulty,
        })
    }

    /// Rebuild a chain from persisted parts and verify every block.
    pub fn from_parts(difficulty: u32, blocks: Vec<Block<T>>, pending: Vec<T>) -> Result<Self> {
        check_difficulty(difficulty)?;
        let chain = Self {
            blocks,
            pending_transactions: pending,
            difficulty,
        };
        chain.verify_chain()?;
        Ok(chain)
    }

    // ── Genesis & accessors ───────────────────────────────────

    /// Seal and append the genesis block. Genesis carries no proof-of-work.
    pub fn create_genesis(&mut self) -> Result<()> {
        if !self.blocks.is_empty() {
            return Err(ChainError::AlreadyInitialized);
        }
        let mut genesis = Block::new(Vec::new(), Utc::now(), GENESIS_PREVIOUS_HASH.into());
        let hash = genesis.seal()?;
        info!(hash = %hash, difficulty = self.difficulty, "created genesis block");
        self.blocks.push(genesis);
        Ok(())
    }

    pub fn last_block(&self) -> Result<&Block<T>> {
        self.blocks.last().ok_or(ChainError::ChainUninitialized)
    }

    pub fn block(&self, index: usize) -> Option<&Block<T>> {
        self.blocks.get(index)
    }

    pub fn blocks(&self) -> &[Block<T>] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn pending_transactions(&self) -> &[T] {
        &self.pending_transactions
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    // ── Transactions & mining ─────────────────────────────────

    pub fn queue_transaction(&mut self, transaction: T) {
        self.pending_transactions.push(transaction);
    }

    /// Unbounded nonce search on `candidate`. Returns the winning hash.
    pub fn proof_of_work(&self, candidate: &mut Block<T>) -> Result<BlockHash> {
        self.proof_of_work_with(candidate, &MiningControl::unbounded())
    }

    /// Nonce search that stops with `Cancelled` or `Timeout` per `control`.
    pub fn proof_of_work_with(
        &self,
        candidate: &mut Block<T>,
        control: &MiningControl,
    ) -> Result<BlockHash> {
        pow::search(candidate, self.difficulty, control)
    }

    /// True if `hash` meets the difficulty and is exactly the block's own hash.
    pub fn validate_proof(&self, block: &Block<T>, hash: &str) -> bool {
        pow::meets_difficulty(hash, self.difficulty)
            && block.compute_hash().map(|h| h == hash).unwrap_or(false)
    }

    /// Link-check, proof-check, then append. The chain is untouched on error.
    pub fn append_block(&mut self, mut block: Block<T>, proof: BlockHash) -> Result<()> {
        let expected = self.tip_hash()?;
        if block.previous_hash != expected {
            warn!(
                expected = %expected,
                found = %block.previous_hash,
                "rejected block: previous hash mismatch"
            );
            return Err(ChainError::BrokenLink {
                expected,
                found: block.previous_hash,
            });
        }
        if !self.validate_proof(&block, &proof) {
            warn!(proof = %proof, "rejected block: invalid proof");
            return Err(ChainError::InvalidProof);
        }
        info!(
            height = self.blocks.len(),
            hash = %proof,
            nonce = block.nonce,
            txs = block.transactions.len(),
            "appended block"
        );
        block.hash = Some(proof);
        self.blocks.push(block);
        Ok(())
    }

    /// Mine the pending transactions into a new block.
    pub fn mine(&mut self) -> Result<Block<T>> {
        self.mine_with(&MiningControl::unbounded())
    }

    /// Like [`Chain::mine`], but the search obeys `control`. On any error the
    /// pending buffer and the blocks are left as they were.
    pub fn mine_with(&mut self, control: &MiningControl) -> Result<Block<T>> {
        let mut candidate = self.candidate()?;
        let proof = self.proof_of_work_with(&mut candidate, control)?;
        self.append_block(candidate, proof)?;
        self.pending_transactions.clear();
        self.last_block().cloned()
    }

    /// Unsealed block over a snapshot of the pending buffer, linked to the tip.
    pub(crate) fn candidate(&self) -> Result<Block<T>> {
        if self.pending_transactions.is_empty() {
            return Err(ChainError::NoPendingTransactions);
        }
        let previous_hash = self.tip_hash()?;
        Ok(Block::new(
            self.pending_transactions.clone(),
            Utc::now(),
            previous_hash,
        ))
    }

    /// Drop the first `count` pending transactions (those a mined block took).
    pub(crate) fn drain_pending(&mut self, count: usize) {
        let count = count.min(self.pending_transactions.len());
        self.pending_transactions.drain(..count);
    }

    // ── Verification ──────────────────────────────────────────

    /// Re-check genesis, every link, and every proof.
    pub fn verify_chain(&self) -> Result<()> {
        let genesis = self.blocks.first().ok_or(ChainError::ChainUninitialized)?;
        if !genesis.is_genesis() || !genesis.verify() {
            return Err(ChainError::Corruption("genesis block is invalid".into()));
        }
        for (i, pair) in self.blocks.windows(2).enumerate() {
            let (prev, block) = (&pair[0], &pair[1]);
            let expected = prev.hash.clone().unwrap_or_default();
            if block.previous_hash != expected {
                return Err(ChainError::BrokenLink {
                    expected,
                    found: block.previous_hash.clone(),
                });
            }
            let valid = block
                .hash
                .as_deref()
                .map(|h| self.validate_proof(block, h))
                .unwrap_or(false);
            if !valid {
                warn!(height = i + 1, "block failed proof verification");
                return Err(ChainError::InvalidProof);
            }
        }
        Ok(())
    }

    fn tip_hash(&self) -> Result<BlockHash> {
        let last = self.last_block()?;
        last.hash
            .clone()
            .ok_or_else(|| ChainError::Corruption("tip block is unsealed".into()))
    }
}

fn check_difficulty(difficulty: u32) -> Result<()> {
    if difficulty == 0 || difficulty > MAX_DIFFICULTY {
        return Err(ChainError::InvalidDifficulty(difficulty));
    }
    Ok(())
}
