use crate::block::Block;
use crate::error::{ChainError, Result};
use crate::pow::MiningControl;
use crate::shared::SharedChain;
use serde::Serialize;
use std::thread::{self, JoinHandle};
use tracing::{error, info};

/// A proof-of-work search running on its own thread.
pub struct MinerHandle<T> {
    control: MiningControl,
    join: JoinHandle<Result<Block<T>>>,
}

/// Mine `shared`'s pending transactions on a dedicated worker thread.
pub fn spawn_miner<T>(shared: SharedChain<T>, control: MiningControl) -> Result<MinerHandle<T>>
where
    T: Serialize + Clone + Send + 'static,
{
    let worker_control = control.clone();
    let join = thread::Builder::new()
        .name("hashchain-miner".into())
        .spawn(move || {
            let result = shared.mine(&worker_control);
            match &result {
                Ok(block) => info!(hash = block.short_hash(), "miner finished"),
                Err(e) => info!(error = %e, "miner stopped"),
            }
            result
        })?;
    Ok(MinerHandle { control, join })
}

impl<T> MinerHandle<T> {
    /// Ask the worker to stop at its next nonce.
    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the worker and return its outcome.
    pub fn join(self) -> Result<Block<T>> {
        self.join.join().unwrap_or_else(|_| {
            error!("miner thread panicked");
            Err(ChainError::WorkerPanicked)
        })
    }
}
