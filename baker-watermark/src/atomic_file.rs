//! Write-tmp-then-rename helper shared by every store in this crate
//!, grounded on the exclusive-lock pattern of
//! `simperby_network::storage::StorageImpl`.

use fs2::FileExt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::task::spawn_blocking;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("background task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// An exclusive lock held for the lifetime of a store, guaranteeing
/// single-writer access to its directory.
pub struct FileLock {
    file: Option<std::fs::File>,
}

impl FileLock {
    pub async fn acquire(lock_path: PathBuf) -> Result<Self, StoreError> {
        let file = spawn_blocking(move || -> std::io::Result<std::fs::File> {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await??;
        Ok(Self { file: Some(file) })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            spawn_blocking(move || {
                if let Err(e) = file.unlock() {
                    log::error!("failed to unlock store: {}", e);
                }
            });
        }
    }
}

/// Serializes `value` to JSON and writes it under `path` via a
/// `<name>_tmp` file followed by an atomic rename, fsyncing before the
/// rename so a crash never observes a partial write.
pub async fn write_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let tmp_path = tmp_path_for(path);
    let serialized = serde_json::to_vec(value)?;
    {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&serialized).await?;
        file.sync_all().await?;
    }
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

pub async fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push("_tmp");
    path.with_file_name(name)
}
