use crate::types::{Level, Round};
use thiserror::Error;

/// The caller-visible error taxonomy, shared across every
/// crate in the workspace so the executor, watermark store, and scheduler
/// all fail the same way for the same conditions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("round arithmetic out of range")]
    OutOfRange,

    #[error("block previously baked at level {level}, round {round}")]
    BlockPreviouslyBaked { level: Level, round: Round },

    #[error("block previously preendorsed at level {level}, round {round}")]
    BlockPreviouslyPreendorsed { level: Level, round: Round },

    #[error("block previously endorsed at level {level}, round {round}")]
    BlockPreviouslyEndorsed { level: Level, round: Round },

    #[error("invalid proposal")]
    InvalidProposal,

    #[error("outdated proposal at level {level}, round {round}")]
    OutdatedProposal { level: Level, round: Round },

    #[error("node connection lost")]
    NodeConnectionLost,

    #[error("failed to fetch extra operations from {path}: {reason}")]
    MempoolFetchFailed { path: String, reason: String },

    #[error("persisted level state regressed, operator intervention required")]
    InvalidLockedValuesInvariant,

    #[error("remote signer rejected the request: {0}")]
    SignerRejected(String),
}
