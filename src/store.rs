use crate::block::Block;
use crate::chain::Chain;
use crate::error::{ChainError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// JSON file holding a whole chain: blocks plus the pending buffer.
///
/// Blocks are written with the same serde encoding that sealing uses, so a
/// loaded block re-hashes to its stored hash. Every load re-verifies the chain.
pub struct ChainStore {
    path: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct Snapshot<T> {
    difficulty: u32,
    blocks: Vec<Block<T>>,
    pending_transactions: Vec<T>,
}

impl ChainStore {
    /// Open a store at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write the chain, replacing any previous snapshot.
    pub fn save<T: Serialize + Clone>(&self, chain: &Chain<T>) -> Result<()> {
        let snapshot = Snapshot {
            difficulty: chain.difficulty(),
            blocks: chain.blocks().to_vec(),
            pending_transactions: chain.pending_transactions().to_vec(),
        };
        let data = serde_json::to_vec_pretty(&snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), height = chain.len(), "saved chain");
        Ok(())
    }

    /// Read and verify the chain.
    pub fn load<T: Serialize + DeserializeOwned + Clone>(&self) -> Result<Chain<T>> {
        if !self.exists() {
            return Err(ChainError::ChainUninitialized);
        }
        let data = fs::read(&self.path)?;
        let snapshot: Snapshot<T> = serde_json::from_slice(&data)?;
        Chain::from_parts(
            snapshot.difficulty,
            snapshot.blocks,
            snapshot.pending_transactions,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mined_chain() -> Chain<String> {
        let mut chain = Chain::new(1).unwrap();
        chain.create_genesis().unwrap();
        chain.queue_transaction("A→B:5".into());
        chain.mine().unwrap();
        chain.queue_transaction("B→C:1".into());
        chain
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ChainStore::open(&tmp.path().join("data").join("chain.json")).unwrap();
        assert!(!store.exists());

        let chain = mined_chain();
        store.save(&chain).unwrap();
        assert!(store.exists());

        let loaded: Chain<String> = store.load().unwrap();
        assert_eq!(loaded.blocks(), chain.blocks());
        assert_eq!(loaded.pending_transactions(), chain.pending_transactions());
        assert_eq!(loaded.difficulty(), 1);
        for block in loaded.blocks() {
            assert_eq!(block.compute_hash().unwrap(), block.hash.clone().unwrap());
        }
    }

    #[test]
    fn missing_file_is_uninitialized() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ChainStore::open(&tmp.path().join("chain.json")).unwrap();
        assert!(matches!(
            store.load::<String>(),
            Err(ChainError::ChainUninitialized)
        ));
    }

    #[test]
    fn tampered_file_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ChainStore::open(&tmp.path().join("chain.json")).unwrap();
        store.save(&mined_chain()).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        fs::write(store.path(), text.replace("A→B:5", "A→B:9")).unwrap();

        assert!(matches!(
            store.load::<String>(),
            Err(ChainError::InvalidProof)
        ));
    }
}
