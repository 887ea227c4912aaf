use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 hash as hex string, used as the block's identifier and back-reference.
pub type BlockHash = String;

/// Previous-hash placeholder carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// A block of opaque transactions, linked to its predecessor by hash.
///
/// Field order here is the persisted layout; the seal encoding uses the same
/// order minus `hash`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block<T> {
    pub transactions: Vec<T>,
    pub timestamp: DateTime<Utc>,
    pub previous_hash: BlockHash,
    pub nonce: u64,
    /// Set by [`Block::seal`]; `None` until then.
    #[serde(default)]
    pub hash: Option<BlockHash>,
}

/// Canonical payload hashed by [`Block::seal`].
#[derive(Serialize)]
struct SealPayload<'a, T> {
    transactions: &'a [T],
    timestamp: &'a DateTime<Utc>,
    previous_hash: &'a str,
    nonce: u64,
}

impl<T: Serialize> Block<T> {
    /// Create an unsealed block with nonce 0.
    pub fn new(transactions: Vec<T>, timestamp: DateTime<Utc>, previous_hash: BlockHash) -> Self {
        Self {
            transactions,
            timestamp,
            previous_hash,
            nonce: 0,
            hash: None,
        }
    }

    /// Hash the block's current fields without storing the result.
    pub fn compute_hash(&self) -> Result<BlockHash> {
        let payload = SealPayload {
            transactions: &self.transactions,
            timestamp: &self.timestamp,
            previous_hash: &self.previous_hash,
            nonce: self.nonce,
        };
        let encoded = serde_json::to_vec(&payload)?;
        Ok(compute_hash(&encoded))
    }

    /// Compute the hash of the current fields, store it, and return it.
    pub fn seal(&mut self) -> Result<BlockHash> {
        let hash = self.compute_hash()?;
        self.hash = Some(hash.clone());
        Ok(hash)
    }

    /// Verify the stored hash against the block's fields.
    pub fn verify(&self) -> bool {
        match (&self.hash, self.compute_hash()) {
            (Some(stored), Ok(computed)) => *stored == computed,
            _ => false,
        }
    }
}

impl<T> Block<T> {
    pub fn is_genesis(&self) -> bool {
        self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    /// First eight characters of the hash, or `"unsealed"`.
    pub fn short_hash(&self) -> &str {
        match &self.hash {
            Some(h) => &h[..8.min(h.len())],
            None => "unsealed",
        }
    }
}

/// Compute the SHA-256 hex digest of some data.
pub fn compute_hash(data: &[u8]) -> BlockHash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Block<String> {
        Block::new(
            vec!["A→B:5".to_string(), "B→C:2".to_string()],
            Utc::now(),
            "abc123".into(),
        )
    }

    #[test]
    fn new_block_is_unsealed() {
        let b = sample();
        assert_eq!(b.nonce, 0);
        assert!(b.hash.is_none());
        assert!(!b.verify());
        assert_eq!(b.short_hash(), "unsealed");
    }

    #[test]
    fn seal_is_deterministic() {
        let mut b = sample();
        let h1 = b.seal().unwrap();
        let h2 = b.seal().unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_eq!(b.hash.as_deref(), Some(h1.as_str()));
        assert!(b.verify());
    }

    #[test]
    fn identical_fields_hash_identically() {
        let ts = Utc::now();
        let b1: Block<String> = Block::new(vec!["tx".into()], ts, "p".into());
        let b2: Block<String> = Block::new(vec!["tx".into()], ts, "p".into());
        assert_eq!(b1.compute_hash().unwrap(), b2.compute_hash().unwrap());
    }

    #[test]
    fn nonce_changes_hash_only() {
        let mut b = sample();
        let h0 = b.seal().unwrap();
        let txs = b.transactions.clone();
        b.nonce += 1;
        let h1 = b.seal().unwrap();
        assert_ne!(h0, h1);
        assert_eq!(b.transactions, txs);
        assert_eq!(b.previous_hash, "abc123");
    }

    #[test]
    fn transaction_order_matters() {
        let ts = Utc::now();
        let b1: Block<&str> = Block::new(vec!["a", "b"], ts, "p".into());
        let b2: Block<&str> = Block::new(vec!["b", "a"], ts, "p".into());
        assert_ne!(b1.compute_hash().unwrap(), b2.compute_hash().unwrap());
    }

    #[test]
    fn tampered_block_fails_verify() {
        let mut b = sample();
        b.seal().unwrap();
        b.transactions[0] = "A→B:500".into();
        assert!(!b.verify());

        let mut b = sample();
        b.seal().unwrap();
        b.timestamp += chrono::Duration::seconds(1);
        assert!(!b.verify());

        let mut b = sample();
        b.seal().unwrap();
        b.previous_hash = "other".into();
        assert!(!b.verify());
    }

    #[test]
    fn json_round_trip_reproduces_hash() {
        let mut b = sample();
        b.nonce = 42;
        let hash = b.seal().unwrap();
        let json = serde_json::to_string(&b).unwrap();
        let back: Block<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
        assert_eq!(back.compute_hash().unwrap(), hash);
    }

    #[test]
    fn persisted_field_order() {
        let mut b = sample();
        b.seal().unwrap();
        let json = serde_json::to_string(&b).unwrap();
        let positions: Vec<usize> = ["\"transactions\"", "\"timestamp\"", "\"previous_hash\"", "\"nonce\"", "\"hash\""]
            .iter()
            .map(|k| json.find(k).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn genesis_sentinel() {
        let b: Block<String> = Block::new(vec![], Utc::now(), GENESIS_PREVIOUS_HASH.into());
        assert!(b.is_genesis());
        assert!(!sample().is_genesis());
    }
}
