//! Level state, round state, and global state: the mutable
//! part of the automaton, with its invariants enforced on
//! the write path rather than left to callers.

use crate::block::{DelegateSlots, ElectedBlock, EndorsablePayload, LockedRound, OperationPool, Proposal};
use crate::config::{BakerConfig, ProtocolConstants};
use crate::error::Error;
use crate::round_time::{BoundedCache, ROUND_CACHE_CAPACITY};
use crate::types::{ChainId, Delegate, Level, Round, Timestamp};
use serde::{Deserialize, Serialize};

/// `{current_round, phase}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundState {
    pub current_round: Round,
    pub phase: Phase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    AwaitingPreendorsements,
    AwaitingEndorsements,
}

/// `{current_level, latest_proposal, locked_round?, endorsable_payload?,
/// elected_block?, delegate_slots, next_level_delegate_slots,
/// next_level_proposed_round?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelState {
    pub current_level: Level,
    pub latest_proposal: Option<Proposal>,
    pub locked_round: Option<LockedRound>,
    pub endorsable_payload: Option<EndorsablePayload>,
    pub elected_block: Option<ElectedBlock>,
    pub delegate_slots: DelegateSlots,
    pub next_level_delegate_slots: Option<DelegateSlots>,
    pub next_level_proposed_round: Option<Round>,
}

impl LevelState {
    pub fn new(current_level: Level, delegate_slots: DelegateSlots) -> Self {
        Self {
            current_level,
            latest_proposal: None,
            locked_round: None,
            endorsable_payload: None,
            elected_block: None,
            delegate_slots,
            next_level_delegate_slots: None,
            next_level_proposed_round: None,
        }
    }

    /// Replaces the level state wholesale on a level bump: `locked_round`,
    /// `endorsable_payload`, `elected_block` are cleared.
    pub fn bump_to(new_level: Level, delegate_slots: DelegateSlots) -> Self {
        Self::new(new_level, delegate_slots)
    }

    /// Sets `locked_round`, enforcing monotonicity within the level.
    pub fn set_locked_round(&mut self, new: LockedRound) -> Result<(), Error> {
        if let Some(current) = self.locked_round {
            if new.round < current.round {
                return Err(Error::InvalidLockedValuesInvariant);
            }
        }
        self.locked_round = Some(new);
        Ok(())
    }

    /// Sets `endorsable_payload`, enforcing monotonicity within the level
    /// and the cross-field invariant `locked_round.round <=
    /// endorsable_payload.prequorum.round`.
    pub fn set_endorsable_payload(&mut self, new: EndorsablePayload) -> Result<(), Error> {
        if let Some(current) = &self.endorsable_payload {
            if new.prequorum.round < current.prequorum.round {
                return Err(Error::InvalidLockedValuesInvariant);
            }
        }
        if let Some(locked) = self.locked_round {
            if locked.round > new.prequorum.round {
                return Err(Error::InvalidLockedValuesInvariant);
            }
        }
        self.endorsable_payload = Some(new);
        Ok(())
    }

    pub fn set_elected_block(&mut self, new: ElectedBlock) {
        self.elected_block = Some(new);
    }
}

/// `{global, level, round}`. Single owner: the
/// scheduler task, mutated only through the transition+executor pipeline.
#[derive(Debug, Clone)]
pub struct State {
    pub global: GlobalState,
    pub level: LevelState,
    pub round: RoundState,
}

impl State {
    /// Checks the invariant `current_round >= latest_proposal.block.round`.
    pub fn check_round_invariant(&self) -> Result<(), Error> {
        if let Some(proposal) = &self.level.latest_proposal {
            if self.round.current_round < proposal.block.round {
                return Err(Error::InvalidLockedValuesInvariant);
            }
        }
        Ok(())
    }
}

/// Global state: chain id, configuration, protocol constants,
/// own delegates, and the two bounded round-arithmetic caches.
#[derive(Debug, Clone)]
pub struct GlobalState {
    pub chain_id: ChainId,
    pub config: BakerConfig,
    pub constants: ProtocolConstants,
    pub own_delegates: Vec<Delegate>,
    /// The mempool snapshot the scheduler keeps current from the operation
    /// stream; read (never fetched) by the transition core when it decides
    /// to bake a fresh block.
    pub mempool_pool: OperationPool,
    pub timestamp_of_round_cache: BoundedCache<(Level, Round, Round), Timestamp>,
    pub round_of_timestamp_cache: BoundedCache<(Level, Round, i64), Round>,
}

impl GlobalState {
    pub fn new(
        chain_id: ChainId,
        config: BakerConfig,
        constants: ProtocolConstants,
        own_delegates: Vec<Delegate>,
    ) -> Self {
        Self {
            chain_id,
            config,
            constants,
            own_delegates,
            mempool_pool: OperationPool::default(),
            timestamp_of_round_cache: BoundedCache::new(ROUND_CACHE_CAPACITY),
            round_of_timestamp_cache: BoundedCache::new(ROUND_CACHE_CAPACITY),
        }
    }
}
