//! Append-only hash chain with proof-of-work admission.
//!
//! Blocks carry an opaque, ordered list of transactions and are linked by the
//! SHA-256 hash of their predecessor. A block joins the [`Chain`] only with a
//! nonce whose hash starts with `difficulty` zero hex characters.

pub mod block;
pub mod chain;
pub mod config;
pub mod error;
pub mod miner;
pub mod pow;
pub mod shared;
pub mod store;

pub use block::{Block, BlockHash, GENESIS_PREVIOUS_HASH};
pub use chain::Chain;
pub use error::{ChainError, Result};
pub use pow::MiningControl;
