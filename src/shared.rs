use crate::block::Block;
use crate::chain::Chain;
use crate::error::Result;
use crate::pow::{self, MiningControl};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// A [`Chain`] shared between threads.
///
/// The lock is held only to snapshot the pending buffer and to append; the
/// nonce search itself runs unlocked. Two miners racing on the same tip both
/// finish their search, one appends, the other gets `BrokenLink`.
pub struct SharedChain<T> {
    inner: Arc<Mutex<Chain<T>>>,
}

impl<T> Clone for SharedChain<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Serialize + Clone> SharedChain<T> {
    pub fn new(chain: Chain<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(chain)),
        }
    }

    pub fn create_genesis(&self) -> Result<()> {
        self.inner.lock().create_genesis()
    }

    pub fn queue_transaction(&self, transaction: T) {
        self.inner.lock().queue_transaction(transaction);
    }

    /// Snapshot of the sealed blocks.
    pub fn blocks(&self) -> Vec<Block<T>> {
        self.inner.lock().blocks().to_vec()
    }

    pub fn pending_transactions(&self) -> Vec<T> {
        self.inner.lock().pending_transactions().to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn difficulty(&self) -> u32 {
        self.inner.lock().difficulty()
    }

    /// Run `f` with the chain locked.
    pub fn with_chain<R>(&self, f: impl FnOnce(&Chain<T>) -> R) -> R {
        f(&*self.inner.lock())
    }

    /// Mine the currently pending transactions.
    ///
    /// Transactions queued while the search runs stay pending for the next
    /// block. On any error nothing is removed from the buffer.
    pub fn mine(&self, control: &MiningControl) -> Result<Block<T>> {
        let (mut candidate, difficulty) = {
            let chain = self.inner.lock();
            (chain.candidate()?, chain.difficulty())
        };
        let taken = candidate.transactions.len();
        debug!(txs = taken, difficulty, "searching without chain lock");

        let proof = pow::search(&mut candidate, difficulty, control)?;

        let mut chain = self.inner.lock();
        chain.append_block(candidate, proof)?;
        chain.drain_pending(taken);
        chain.last_block().cloned()
    }
}
