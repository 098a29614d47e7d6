//! The operation aggregator: watches the mempool and fires
//! prequorum/quorum events when weighted voting power crosses threshold.

use baker_core::{BlockHash, Level, OperationHash, PayloadHash, Round, Slot, VotingPower};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Which certificate a candidate is watching for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    Prequorum,
    Quorum,
}

/// One consensus operation as handed to the aggregator. Decoding the wire
/// operation into this shape is the lower layer's job.
#[derive(Debug, Clone)]
pub struct MempoolOperation {
    pub hash: OperationHash,
    pub level: Level,
    pub round: Round,
    pub payload_hash: PayloadHash,
    pub slot: Slot,
    pub kind: CandidateKind,
    /// The block this operation votes on, checked against the live-block
    /// set reported by the most recent `observe_new_level` call.
    pub branch: BlockHash,
}

/// Fired exactly once per candidate, when the cumulative power of unique
/// slots first crosses `consensus_threshold`.
#[derive(Debug, Clone)]
pub struct AggregatorEvent {
    pub kind: CandidateKind,
    pub level: Level,
    pub round: Round,
    pub payload_hash: PayloadHash,
    pub power: VotingPower,
    pub operations: Vec<(Slot, OperationHash)>,
}

type VotingPowerFn = dyn Fn(Slot) -> Option<VotingPower> + Send + Sync;

struct Candidate {
    threshold: VotingPower,
    voting_power_of: Arc<VotingPowerFn>,
    fired: bool,
}

#[derive(Default)]
struct Accumulator {
    /// Dedup by slot: the operation hash each slot contributed.
    slots: BTreeMap<Slot, OperationHash>,
    power: VotingPower,
}

type AccumulatorKey = (CandidateKind, Level, Round, PayloadHash);

struct Inner {
    accumulators: HashMap<AccumulatorKey, Accumulator>,
    candidates: HashMap<AccumulatorKey, Candidate>,
    highest_level: Level,
    preserved_levels: u32,
    cleaning_countdown: u32,
    /// The live-block set from the most recent `observe_new_level` call.
    /// Empty until the first call, at which point branch filtering in
    /// `ingest` becomes active.
    live_blocks: BTreeSet<BlockHash>,
}

/// Watches a stream of mempool operations and notifies registered
/// candidates over a channel once their threshold is crossed.
pub struct OperationAggregator {
    inner: Mutex<Inner>,
    events_tx: mpsc::UnboundedSender<AggregatorEvent>,
}

impl OperationAggregator {
    pub fn new(preserved_levels: u32) -> (Self, mpsc::UnboundedReceiver<AggregatorEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let countdown = (preserved_levels / 10).max(1);
        (
            Self {
                inner: Mutex::new(Inner {
                    accumulators: HashMap::new(),
                    candidates: HashMap::new(),
                    highest_level: 0,
                    preserved_levels,
                    cleaning_countdown: countdown,
                    live_blocks: BTreeSet::new(),
                }),
                events_tx,
            },
            events_rx,
        )
    }

    /// Registers a candidate `{hash, round_watched, payload_hash_watched}`
    /// together with `consensus_threshold` and a `voting_power_of`
    /// function. A candidate remains live until explicitly
    /// cancelled, replaced, or it fires.
    pub fn register_candidate(
        &self,
        kind: CandidateKind,
        level: Level,
        round: Round,
        payload_hash: PayloadHash,
        threshold: VotingPower,
        voting_power_of: impl Fn(Slot) -> Option<VotingPower> + Send + Sync + 'static,
    ) {
        let key = (kind, level, round, payload_hash);
        let mut inner = self.inner.lock();
        inner.candidates.insert(
            key,
            Candidate {
                threshold,
                voting_power_of: Arc::new(voting_power_of),
                fired: false,
            },
        );
        // A freshly (re-)registered candidate may already have enough
        // power accumulated from operations seen before registration.
        self.try_fire_locked(&mut inner, key);
    }

    pub fn cancel_candidate(
        &self,
        kind: CandidateKind,
        level: Level,
        round: Round,
        payload_hash: PayloadHash,
    ) {
        self.inner
            .lock()
            .candidates
            .remove(&(kind, level, round, payload_hash));
    }

    /// Ingests one mempool operation, deduplicating by `(slot,
    /// payload_hash)` and summing voting power per unique slot. Operations for a
    /// `(round, payload_hash)` nobody is watching are dropped; a client
    /// must register the candidate first.
    pub fn ingest(&self, op: MempoolOperation) {
        let key = (op.kind, op.level, op.round, op.payload_hash);
        let mut inner = self.inner.lock();

        if !inner.live_blocks.is_empty() && !inner.live_blocks.contains(&op.branch) {
            log::debug!(
                "dropping operation {} for branch {} outside the live-block set",
                op.hash,
                op.branch
            );
            return;
        }

        let Some(voting_power_of) = inner.candidates.get(&key).map(|c| Arc::clone(&c.voting_power_of)) else {
            return;
        };
        let power = match voting_power_of(op.slot) {
            Some(power) => power,
            // Stale committee mapping: an
            // explicit filter, not an assertion.
            None => {
                log::debug!(
                    "dropping operation {} for unknown slot {} at level {}",
                    op.hash,
                    op.slot,
                    op.level
                );
                return;
            }
        };

        let accumulator = inner.accumulators.entry(key).or_default();
        if accumulator.slots.contains_key(&op.slot) {
            return;
        }
        accumulator.slots.insert(op.slot, op.hash);
        accumulator.power += power;

        self.try_fire_locked(&mut inner, key);
    }

    fn try_fire_locked(&self, inner: &mut Inner, key: AccumulatorKey) {
        let (kind, level, round, payload_hash) = key;
        let Some(accumulator) = inner.accumulators.get(&key) else {
            return;
        };
        let power = accumulator.power;
        let operations: Vec<(Slot, OperationHash)> = accumulator
            .slots
            .iter()
            .map(|(slot, hash)| (*slot, *hash))
            .collect();

        let Some(candidate) = inner.candidates.get_mut(&key) else {
            return;
        };
        if candidate.fired || power < candidate.threshold {
            return;
        }
        candidate.fired = true;
        let _ = self.events_tx.send(AggregatorEvent {
            kind,
            level,
            round,
            payload_hash,
            power,
            operations,
        });
    }

    /// Called on every new head: tracks the highest observed level, refreshes
    /// the live-block set `ingest` filters mempool operations against, and
    /// sweeps stale entries every `preserved_levels / 10` observed blocks.
    pub fn observe_new_level(&self, level: Level, live_blocks: &BTreeSet<BlockHash>) {
        let mut inner = self.inner.lock();
        inner.live_blocks = live_blocks.clone();
        if level > inner.highest_level {
            inner.highest_level = level;
        }
        if inner.cleaning_countdown == 0 {
            let threshold = inner.highest_level - inner.preserved_levels as Level;
            inner
                .accumulators
                .retain(|(_, lvl, _, _), _| *lvl > threshold);
            inner
                .candidates
                .retain(|(_, lvl, _, _), _| *lvl > threshold);
            inner.cleaning_countdown = (inner.preserved_levels / 10).max(1);
        } else {
            inner.cleaning_countdown -= 1;
        }
    }
}
