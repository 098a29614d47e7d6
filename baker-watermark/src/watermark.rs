//! Per-(key, chain) monotone record of the highest (level, round) signed
//! as block/preendorsement/endorsement.

use crate::atomic_file::{read_json, write_atomic, FileLock, StoreError};
use async_trait::async_trait;
use baker_core::{ChainId, Error, Level, PublicKeyHash, Round};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Kind {
    Block,
    Preendorsement,
    Endorsement,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Record {
    last_block: Option<(Level, Round)>,
    last_preendorsement: Option<(Level, Round)>,
    last_endorsement: Option<(Level, Round)>,
}

impl Record {
    fn get(&self, kind: Kind) -> Option<(Level, Round)> {
        match kind {
            Kind::Block => self.last_block,
            Kind::Preendorsement => self.last_preendorsement,
            Kind::Endorsement => self.last_endorsement,
        }
    }

    fn set(&mut self, kind: Kind, value: (Level, Round)) {
        match kind {
            Kind::Block => self.last_block = Some(value),
            Kind::Preendorsement => self.last_preendorsement = Some(value),
            Kind::Endorsement => self.last_endorsement = Some(value),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Table(HashMap<String, Record>);

fn table_key(chain: &ChainId, key_hash: &PublicKeyHash) -> String {
    format!("{}:{}", chain, key_hash)
}

/// Contract for signing requests.
#[async_trait]
pub trait HighWatermarkStore: Send + Sync {
    /// Returns true iff no prior record exists at that key/kind, or the
    /// prior record is strictly less than `(level, round)` lexicographically.
    async fn may_sign(
        &self,
        chain: &ChainId,
        key_hash: &PublicKeyHash,
        kind: Kind,
        level: Level,
        round: Round,
    ) -> bool;

    /// Atomically updates the record to `(level, round)`; durable before
    /// this call returns.
    async fn record(
        &self,
        chain: &ChainId,
        key_hash: &PublicKeyHash,
        kind: Kind,
        level: Level,
        round: Round,
    ) -> Result<(), StoreError>;

    /// Checks then records in one step, the way the executor must call it
    /// before every signing RPC. `force` bypasses the check but still
    /// records, so later calls stay monotone.
    async fn guard(
        &self,
        chain: &ChainId,
        key_hash: &PublicKeyHash,
        kind: Kind,
        level: Level,
        round: Round,
        force: bool,
    ) -> Result<(), Error> {
        let allowed = force || self.may_sign(chain, key_hash, kind, level, round).await;
        if !allowed {
            return Err(match kind {
                Kind::Block => Error::BlockPreviouslyBaked { level, round },
                Kind::Preendorsement => Error::BlockPreviouslyPreendorsed { level, round },
                Kind::Endorsement => Error::BlockPreviouslyEndorsed { level, round },
            });
        }
        self.record(chain, key_hash, kind, level, round)
            .await
            .map_err(|_| Error::InvalidLockedValuesInvariant)?;
        Ok(())
    }
}

/// File-backed implementation: an exclusive lock on the directory plus
/// atomic-rename writes.
pub struct FileHighWatermarkStore {
    _lock: FileLock,
    path: PathBuf,
    table: RwLock<Table>,
}

impl FileHighWatermarkStore {
    pub async fn open(base_dir: &std::path::Path) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(base_dir).await?;
        let lock_path = base_dir.join("watermark.lock");
        let path = base_dir.join("watermark.json");
        let lock = FileLock::acquire(lock_path).await?;
        let table: Table = read_json(&path).await?.unwrap_or_default();
        Ok(Self {
            _lock: lock,
            path,
            table: RwLock::new(table),
        })
    }
}

#[async_trait]
impl HighWatermarkStore for FileHighWatermarkStore {
    async fn may_sign(
        &self,
        chain: &ChainId,
        key_hash: &PublicKeyHash,
        kind: Kind,
        level: Level,
        round: Round,
    ) -> bool {
        let key = table_key(chain, key_hash);
        match self.table.read().0.get(&key).and_then(|r| r.get(kind)) {
            None => true,
            Some((last_level, last_round)) => (last_level, last_round) < (level, round),
        }
    }

    async fn record(
        &self,
        chain: &ChainId,
        key_hash: &PublicKeyHash,
        kind: Kind,
        level: Level,
        round: Round,
    ) -> Result<(), StoreError> {
        let key = table_key(chain, key_hash);
        let snapshot = {
            let mut table = self.table.write();
            let record = table.0.entry(key).or_default();
            record.set(kind, (level, round));
            table.clone()
        };
        write_atomic(&self.path, &snapshot).await
    }
}

/// In-memory implementation used by the automaton's unit tests and the
/// scheduler's own tests where crash-safety is out of scope.
#[derive(Default)]
pub struct InMemoryHighWatermarkStore {
    table: RwLock<HashMap<String, Record>>,
}

#[async_trait]
impl HighWatermarkStore for InMemoryHighWatermarkStore {
    async fn may_sign(
        &self,
        chain: &ChainId,
        key_hash: &PublicKeyHash,
        kind: Kind,
        level: Level,
        round: Round,
    ) -> bool {
        let key = table_key(chain, key_hash);
        match self.table.read().get(&key).and_then(|r| r.get(kind)) {
            None => true,
            Some((last_level, last_round)) => (last_level, last_round) < (level, round),
        }
    }

    async fn record(
        &self,
        chain: &ChainId,
        key_hash: &PublicKeyHash,
        kind: Kind,
        level: Level,
        round: Round,
    ) -> Result<(), StoreError> {
        let key = table_key(chain, key_hash);
        self.table
            .write()
            .entry(key)
            .or_default()
            .set(kind, (level, round));
        Ok(())
    }
}
