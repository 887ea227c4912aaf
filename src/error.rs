use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Chain already initialized — genesis block exists")]
    AlreadyInitialized,

    #[error("Chain uninitialized — create the genesis block first")]
    ChainUninitialized,

    #[error("No pending transactions to mine")]
    NoPendingTransactions,

    #[error("Broken link: expected previous hash {expected}, found {found}")]
    BrokenLink { expected: String, found: String },

    #[error("Invalid proof of work")]
    InvalidProof,

    #[error("Invalid difficulty {0} (must be 1..=64)")]
    InvalidDifficulty(u32),

    #[error("Nonce space exhausted without a valid proof")]
    NonceExhausted,

    #[error("Proof-of-work cancelled")]
    Cancelled,

    #[error("Proof-of-work timed out")]
    Timeout,

    #[error("Miner worker panicked")]
    WorkerPanicked,

    #[error("Corruption: {0}")]
    Corruption(String),
}

pub type Result<T> = std::result::Result<T, ChainError>;
