use crate::block::{Block, BlockHash};
use crate::error::{ChainError, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Largest meaningful difficulty: the length of a hex SHA-256 digest.
pub const MAX_DIFFICULTY: u32 = 64;

const PROGRESS_INTERVAL: u64 = 1 << 20;

/// True if `hash` starts with at least `difficulty` `'0'` hex characters.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let needed = difficulty as usize;
    hash.len() >= needed && hash.bytes().take(needed).all(|b| b == b'0')
}

/// Cooperative stop signal for a nonce search: a shared cancellation flag and
/// an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct MiningControl {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl MiningControl {
    /// Never times out; stops only on [`MiningControl::cancel`].
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// An already-cancelled control.
    pub fn cancelled() -> Self {
        let control = Self::default();
        control.cancel();
        control
    }

    /// Signal every clone of this control to stop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` or `Err(Timeout)` once the search should stop.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ChainError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ChainError::Timeout),
            _ => Ok(()),
        }
    }
}

/// Search nonces from 0 upward until the block's hash meets `difficulty`.
///
/// The block is left sealed with the winning nonce. `control` is polled before
/// every hash evaluation.
pub fn search<T: Serialize>(
    block: &mut Block<T>,
    difficulty: u32,
    control: &MiningControl,
) -> Result<BlockHash> {
    if difficulty == 0 || difficulty > MAX_DIFFICULTY {
        return Err(ChainError::InvalidDifficulty(difficulty));
    }
    let started = Instant::now();
    let mut nonce = 0u64;
    loop {
        control.check()?;
        block.nonce = nonce;
        let hash = block.seal()?;
        if meets_difficulty(&hash, difficulty) {
            debug!(
                nonce,
                difficulty,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "proof found"
            );
            return Ok(hash);
        }
        if nonce > 0 && nonce % PROGRESS_INTERVAL == 0 {
            debug!(nonce, difficulty, "still searching");
        }
        nonce = nonce.checked_add(1).ok_or(ChainError::NonceExhausted)?;
    }
}
