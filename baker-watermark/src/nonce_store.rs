//! Append-only `block_hash -> nonce` map for seed-nonce reveal scheduling.
//! Revelation scheduling itself is out of
//! scope; this crate only durably records what was
//! generated so an external scheduler can act on it later.

use crate::atomic_file::{read_json, write_atomic, StoreError};
use baker_core::BlockHash;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct NonceTable(BTreeMap<BlockHash, [u8; 32]>);

pub struct NonceStore {
    path: PathBuf,
    table: RwLock<NonceTable>,
}

impl NonceStore {
    pub async fn open(base_dir: &std::path::Path) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(base_dir).await?;
        let path = base_dir.join("nonces.json");
        let table: NonceTable = read_json(&path).await?.unwrap_or_default();
        Ok(Self {
            path,
            table: RwLock::new(table),
        })
    }

    pub async fn register(&self, block_hash: BlockHash, nonce: [u8; 32]) -> Result<(), StoreError> {
        let snapshot = {
            let mut table = self.table.write();
            table.0.insert(block_hash, nonce);
            table.clone()
        };
        write_atomic(&self.path, &snapshot).await
    }

    pub fn get(&self, block_hash: &BlockHash) -> Option<[u8; 32]> {
        self.table.read().0.get(block_hash).copied()
    }
}
