//! Persistence of the node's chain, open pool and peer set.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::{Arc, Mutex};

use crate::blockchain::Block;
use crate::error::StorageError;
use crate::transaction::Transaction;

/// Everything a node persists between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub chain: Vec<Block>,
    pub open_transactions: Vec<Transaction>,
    pub peer_nodes: Vec<String>,
}

pub trait Storage: Send {
    fn load(&self) -> Result<Snapshot, StorageError>;
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StorageError>;
}

/// JSON file at `<data_dir>/blockchain-<node_id>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: &Path, node_id: &str) -> Self {
        Self {
            path: data_dir.join(format!("blockchain-{node_id}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileStorage {
    fn load(&self) -> Result<Snapshot, StorageError> {
        let raw = fs::read(&self.path)?;
        let snapshot: Snapshot = serde_json::from_slice(&raw)?;
        debug!(
            "loaded {} blocks, {} open txs, {} peers from {}",
            snapshot.chain.len(),
            snapshot.open_transactions.len(),
            snapshot.peer_nodes.len(),
            self.path.display()
        );
        Ok(snapshot)
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StorageError> {
        // Write then rename so a crash never leaves a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(snapshot)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory storage. Clones share the same slot, so tests can inspect
/// what the engine saved.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<Snapshot>>>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(snapshot))),
        }
    }

    pub fn saved(&self) -> Option<Snapshot> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

#[cfg(test)]
impl Storage for MemoryStorage {
    fn load(&self) -> Result<Snapshot, StorageError> {
        self.saved().ok_or(StorageError::Missing)
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StorageError> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(snapshot.clone());
        }
        Ok(())
    }
}
