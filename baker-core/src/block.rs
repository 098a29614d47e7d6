//! The data model of blocks, proposals, certificates, and the
//! committee mapping a level is decided over.

use crate::hash::{BlockHash, OperationHash, PayloadHash, ProtocolHash, PublicKeyHash};
use crate::types::{Fitness, Level, Round, Slot, Timestamp, VotingPower};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A signed consensus operation (preendorsement or endorsement) as carried
/// in a prequorum/quorum certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOperation {
    pub hash: OperationHash,
    pub slot: Slot,
    pub level: Level,
    pub round: Round,
    pub payload_hash: PayloadHash,
}

/// The mempool snapshot a block carries, taken at proposal time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationPool {
    pub operations: Vec<OperationHash>,
}

/// Immutable descriptor of a seen block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub hash: BlockHash,
    pub predecessor: BlockHash,
    pub level: Level,
    pub timestamp: Timestamp,
    pub fitness: Fitness,
    pub payload_hash: PayloadHash,
    /// The round at which this block was proposed.
    pub round: Round,
    /// The round of the payload first proposed (may predate `round` on a
    /// reproposal).
    pub payload_round: Round,
    pub protocol: ProtocolHash,
    pub next_protocol: ProtocolHash,
    pub prequorum: Option<Prequorum>,
    /// The quorum certificate: the endorsement operations this block carries.
    pub quorum: Vec<SignedOperation>,
    pub payload: OperationPool,
    /// Live-block hashes for mempool filtering.
    pub live_blocks: BTreeSet<BlockHash>,
}

/// Certificate proving >= threshold voting power preendorsed a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prequorum {
    pub level: Level,
    pub round: Round,
    pub payload_hash: PayloadHash,
    pub preendorsements: Vec<SignedOperation>,
}

/// Pair `{block, predecessor}`; two proposals refer to the same payload iff
/// they share `payload_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub block: BlockInfo,
    pub predecessor: BlockInfo,
}

impl Proposal {
    pub fn same_payload(&self, other: &Proposal) -> bool {
        self.block.payload_hash == other.block.payload_hash
    }
}

/// `{payload_hash, round}` — bounds which payloads the baker may
/// preendorse next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedRound {
    pub payload_hash: PayloadHash,
    pub round: Round,
}

/// `{proposal, prequorum}` — the latest proposal at the current level for
/// which a prequorum is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsablePayload {
    pub proposal: Proposal,
    pub prequorum: Prequorum,
}

/// `{proposal, endorsement_qc}` — a proposal for which an endorsement
/// quorum is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectedBlock {
    pub proposal: Proposal,
    pub endorsement_qc: Vec<SignedOperation>,
}

/// One committee member's slot assignment at a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub delegate_hash: PublicKeyHash,
    pub slots: Vec<Slot>,
    pub voting_power: VotingPower,
}

/// Delegate slots for a given level:
/// own delegates, the full committee, and the per-round proposer table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateSlots {
    /// Canonical-first slot -> slot info, restricted to own delegates.
    pub own: BTreeMap<Slot, SlotInfo>,
    /// Canonical-first slot -> slot info, over the whole committee.
    pub all: BTreeMap<Slot, SlotInfo>,
    /// Indexed by round, gives the proposer slot for that round. Rounds
    /// beyond the array length extrapolate via `round_to_slot`.
    pub proposer_by_round: Vec<Slot>,
}

impl DelegateSlots {
    /// The proposer slot for `round`, wrapping/extrapolating per protocol
    /// rule when `round` falls beyond the precomputed table.
    pub fn proposer_slot(&self, round: Round, committee_size: u32) -> Option<Slot> {
        if round < 0 {
            return None;
        }
        self.proposer_by_round
            .get(round as usize)
            .copied()
            .or_else(|| crate::round_time::round_to_slot(round, committee_size).ok())
    }

    /// Whether one of our own delegates is the proposer at `round`.
    pub fn own_proposer_at(&self, round: Round, committee_size: u32) -> Option<&SlotInfo> {
        let slot = self.proposer_slot(round, committee_size)?;
        self.own.get(&slot)
    }

    pub fn voting_power_of_slot(&self, slot: Slot) -> VotingPower {
        self.all
            .values()
            .find(|info| info.slots.contains(&slot))
            .map(|info| info.voting_power)
            .unwrap_or(0)
    }
}
