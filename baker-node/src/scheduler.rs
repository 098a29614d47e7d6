//! The cooperative scheduler: a single task driving the
//! automaton and its executor off three event sources plus a timer,
//! mirroring the `tokio::select!` loop of a propagation network's
//! background task.

use crate::error::Error;
use crate::timer;
use baker_aggregator::{AggregatorEvent, CandidateKind, MempoolOperation, OperationAggregator};
use baker_automaton::Event;
use baker_core::{BlockInfo, DelegateSlots, Proposal, Slot, State, VotingPower};
use baker_executor::Executor;
use baker_rpc::{ExtraOperationsSource, MempoolWireKind, MempoolWireOp, NodeClient, Signer};
use baker_watermark::{HighWatermarkStore, NonceStore, PersistentLevelStateStore};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Owns the automaton's `State` and drives it forward: one task, no
/// internal locking.
pub struct Node<N: NodeClient, S: Signer, W: HighWatermarkStore> {
    state: State,
    node: Arc<N>,
    executor: Executor<N, S, W>,
    aggregator: Arc<OperationAggregator>,
    aggregator_events: mpsc::UnboundedReceiver<AggregatorEvent>,
}

impl<N: NodeClient, S: Signer, W: HighWatermarkStore> Node<N, S, W> {
    /// Bootstraps `state.level` from the persisted triple when it covers
    /// the same level the caller bootstrapped from the node's head, so a
    /// restart after a crash picks its lock and endorsable payload back up
    /// instead of starting from a blank slate.
    pub fn new(
        mut state: State,
        node: Arc<N>,
        signer: Arc<S>,
        watermark: Arc<W>,
        level_state_store: Arc<PersistentLevelStateStore>,
        nonce_store: Arc<NonceStore>,
        extra_operations: Option<Arc<dyn ExtraOperationsSource>>,
    ) -> Self {
        if let Some(persisted) = level_state_store.current() {
            if persisted.level == state.level.current_level {
                state.level.locked_round = persisted.locked_round;
                state.level.endorsable_payload = persisted.endorsable_payload;
            }
        }
        let force = state.global.config.force;
        let preserved_levels = state.global.config.preserved_levels;
        let executor = Executor::new(
            node.clone(),
            signer,
            watermark,
            level_state_store,
            nonce_store,
            extra_operations,
            force,
        );
        let (aggregator, aggregator_events) = OperationAggregator::new(preserved_levels);
        Self { state, node, executor, aggregator: Arc::new(aggregator), aggregator_events }
    }

    /// Runs the event loop until the node connection is lost; the caller decides whether to reconnect.
    pub async fn run(mut self) -> Result<(), Error> {
        let mut heads = self.node.monitor_heads().await?;
        let mut ops = self.node.monitor_operations().await?;
        let max_delay_ms = self.state.global.config.max_timer_delay_ms;

        loop {
            let deadline = timer::next_timeout(&self.state, max_delay_ms);
            let sleep = timer::sleep_until(deadline.map(|(ts, _)| ts), max_delay_ms);

            tokio::select! {
                head = heads.next() => {
                    match head {
                        Some(Ok(block)) => self.handle_new_head(block).await?,
                        Some(Err(_)) => return Err(Error::NodeConnectionLost),
                        None => { heads = self.node.monitor_heads().await?; }
                    }
                }
                op = ops.next() => {
                    match op {
                        Some(Ok(wire_op)) => self.ingest_operation(wire_op),
                        Some(Err(e)) => {
                            log::warn!("operation stream error, reconnecting: {}", e);
                            ops = self.node.monitor_operations().await?;
                        }
                        None => { ops = self.node.monitor_operations().await?; }
                    }
                }
                event = self.aggregator_events.recv() => {
                    match event {
                        Some(event) => self.handle_aggregator_event(event).await?,
                        None => unreachable!("the aggregator is owned by this node and outlives the channel"),
                    }
                }
                _ = tokio::time::sleep_until(sleep) => {
                    if let Some((_, kind)) = deadline {
                        self.drive(Event::Timeout(kind)).await?;
                    }
                }
            }
        }
    }

    async fn handle_new_head(&mut self, block: BlockInfo) -> Result<(), Error> {
        self.aggregator.observe_new_level(block.level, &block.live_blocks);
        let predecessor = self.node.block_info(block.predecessor).await?;
        let proposal = Proposal { block, predecessor };
        self.drive(Event::NewProposal(proposal)).await
    }

    fn ingest_operation(&self, wire_op: MempoolWireOp) {
        let kind = match wire_op.kind {
            MempoolWireKind::Preendorsement => CandidateKind::Prequorum,
            MempoolWireKind::Endorsement => CandidateKind::Quorum,
            MempoolWireKind::Other => return,
        };
        self.aggregator.ingest(MempoolOperation {
            hash: wire_op.hash,
            level: wire_op.level,
            round: wire_op.round,
            payload_hash: wire_op.payload_hash,
            slot: wire_op.slot,
            kind,
            branch: wire_op.branch,
        });
    }

    async fn handle_aggregator_event(&mut self, event: AggregatorEvent) -> Result<(), Error> {
        let Some(candidate_hash) = self.candidate_block_hash(event.round, event.payload_hash) else {
            log::debug!(
                "dropping stale {:?} event for round {} payload {}",
                event.kind,
                event.round,
                event.payload_hash
            );
            return Ok(());
        };
        let automaton_event = match event.kind {
            CandidateKind::Prequorum => Event::PrequorumReached {
                candidate_hash,
                round: event.round,
                payload_hash: event.payload_hash,
                power: event.power,
                preendorsements: event.operations,
            },
            CandidateKind::Quorum => Event::QuorumReached {
                candidate_hash,
                round: event.round,
                payload_hash: event.payload_hash,
                power: event.power,
                endorsements: event.operations,
            },
        };
        self.drive(automaton_event).await
    }

    /// The latest proposal is the only block the aggregator ever watches;
    /// a mismatch means the state has moved on since the candidate fired.
    fn candidate_block_hash(&self, round: baker_core::Round, payload_hash: baker_core::PayloadHash) -> Option<baker_core::BlockHash> {
        let proposal = self.state.level.latest_proposal.as_ref()?;
        if proposal.block.round == round && proposal.block.payload_hash == payload_hash {
            Some(proposal.block.hash)
        } else {
            None
        }
    }

    async fn drive(&mut self, event: Event) -> Result<(), Error> {
        let prev = self.state.clone();
        let (state, action) = baker_automaton::step(self.state.clone(), event);
        let new_state = self.executor.execute(state, action).await?;
        self.register_candidates(&prev, &new_state);
        self.state = new_state;
        Ok(())
    }

    /// Watches the current proposal's prequorum, and (once known) its
    /// endorsable payload's quorum, regardless of whether this node has any
    /// own delegate slots to vote with itself.
    fn register_candidates(&self, prev: &State, new: &State) {
        let level = new.level.current_level;

        if let Some(latest) = &new.level.latest_proposal {
            let key = (latest.block.round, latest.block.payload_hash);
            let prev_key = prev
                .level
                .latest_proposal
                .as_ref()
                .map(|p| (p.block.round, p.block.payload_hash));
            if prev.level.current_level != level || prev_key != Some(key) {
                let threshold = new.global.constants.consensus_threshold;
                let slots = new.level.delegate_slots.clone();
                self.aggregator.register_candidate(
                    CandidateKind::Prequorum,
                    level,
                    latest.block.round,
                    latest.block.payload_hash,
                    threshold,
                    move |slot| voting_power_of(&slots, slot),
                );
            }
        }

        if let Some(endorsable) = &new.level.endorsable_payload {
            let prev_round = prev
                .level
                .endorsable_payload
                .as_ref()
                .map(|e| e.prequorum.round);
            if prev.level.current_level != level || prev_round != Some(endorsable.prequorum.round) {
                let threshold = new.global.constants.consensus_threshold;
                let slots = new.level.delegate_slots.clone();
                self.aggregator.register_candidate(
                    CandidateKind::Quorum,
                    level,
                    endorsable.prequorum.round,
                    endorsable.prequorum.payload_hash,
                    threshold,
                    move |slot| voting_power_of(&slots, slot),
                );
            }
        }
    }
}

fn voting_power_of(slots: &DelegateSlots, slot: Slot) -> Option<VotingPower> {
    slots.all.values().find(|info| info.slots.contains(&slot)).map(|info| info.voting_power)
}
