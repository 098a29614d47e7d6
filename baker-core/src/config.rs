//! Configuration and protocol constants.

use crate::types::VotingPower;
use crate::round_time::RoundDurations;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Protocol constants consumed as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConstants {
    pub consensus_threshold: VotingPower,
    pub consensus_committee_size: u32,
    pub round_durations: RoundDurations,
    /// Levels at which a seed-nonce commitment is required; scheduling
    /// the reveal itself is out of scope.
    pub blocks_per_commitment: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidityBakingVote {
    On,
    Off,
    Pass,
}

/// Where extra mempool operations are fetched from at forge time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtraOperationsSource {
    None,
    File(PathBuf),
    Url(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonceStrategy {
    Deterministic,
    Random,
}

/// The enumerated baker-side configuration options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakerConfig {
    pub minimal_fees: u64,
    pub minimal_nanotez_per_gas_unit: u64,
    pub minimal_nanotez_per_byte: u64,
    /// Disables the high-watermark veto; still records.
    pub force: bool,
    pub extra_operations: ExtraOperationsSource,
    pub context_path: Option<PathBuf>,
    pub user_activated_upgrades: Vec<(crate::types::Level, crate::hash::ProtocolHash)>,
    pub liquidity_baking_escape_vote: LiquidityBakingVote,
    pub per_block_vote_file: Option<PathBuf>,
    pub nonce: NonceStrategy,
    /// How many past levels the operation aggregator retains before
    /// reaping.
    pub preserved_levels: u32,
    /// Delay-increment cap applied by the scheduler's timer computation.
    pub max_timer_delay_ms: i64,
}
