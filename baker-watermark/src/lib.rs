//! Crash-safe persistence for the baker: the high-watermark store, the
//! persisted level-state triple, and the nonce file.

pub mod atomic_file;
pub mod level_state_store;
pub mod nonce_store;
pub mod watermark;

pub use atomic_file::StoreError;
pub use level_state_store::{PersistedLevelState, PersistentLevelStateStore};
pub use nonce_store::NonceStore;
pub use watermark::{FileHighWatermarkStore, HighWatermarkStore, InMemoryHighWatermarkStore, Kind};
