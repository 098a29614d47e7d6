//! Crash-safe record of `(current level, locked round, endorsable
//! payload)` written atomically.

use crate::atomic_file::{read_json, write_atomic, FileLock, StoreError};
use baker_core::{EndorsablePayload, Error, Level, LockedRound};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedLevelState {
    pub level: Level,
    pub locked_round: Option<LockedRound>,
    pub endorsable_payload: Option<EndorsablePayload>,
}

/// The "monotone triple" store. The writer holds an
/// exclusive file lock; concurrent bakers for different chains use
/// distinct files.
pub struct PersistentLevelStateStore {
    _lock: FileLock,
    path: PathBuf,
    current: RwLock<Option<PersistedLevelState>>,
}

impl PersistentLevelStateStore {
    pub async fn open(base_dir: &std::path::Path) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(base_dir).await?;
        let lock_path = base_dir.join("level_state.lock");
        let path = base_dir.join("level_state.json");
        let lock = FileLock::acquire(lock_path).await?;
        let current: Option<PersistedLevelState> = read_json(&path).await?;
        Ok(Self {
            _lock: lock,
            path,
            current: RwLock::new(current),
        })
    }

    pub fn current(&self) -> Option<PersistedLevelState> {
        self.current.read().clone()
    }

    /// Writes `new` only if at least one component changed.
    ///
    /// Treats going from `Some -> None` at the same level as a hard error,
    /// in favor of safety: within the same level, `locked_round`
    /// or `endorsable_payload` may never regress from `Some` to `None`.
    /// A level bump always clears them legitimately.
    pub async fn write_if_changed(&self, new: PersistedLevelState) -> Result<(), Error> {
        let previous = self.current.read().clone();
        if let Some(previous) = &previous {
            if previous == &new {
                return Ok(());
            }
            if previous.level == new.level {
                if previous.locked_round.is_some() && new.locked_round.is_none() {
                    return Err(Error::InvalidLockedValuesInvariant);
                }
                if previous.endorsable_payload.is_some() && new.endorsable_payload.is_none() {
                    return Err(Error::InvalidLockedValuesInvariant);
                }
            } else if previous.level > new.level {
                return Err(Error::InvalidLockedValuesInvariant);
            }
        }
        write_atomic(&self.path, &new)
            .await
            .map_err(|_| Error::InvalidLockedValuesInvariant)?;
        *self.current.write() = Some(new);
        Ok(())
    }
}
