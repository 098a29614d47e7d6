//! Interprets the transition core's `Action`s: forges,
//! signs, and injects blocks and consensus operations, in each case
//! recording the high watermark before the signing RPC, and resumes
//! `UpdateToLevel` / `SynchronizeRound` continuations by re-entering
//! `baker_automaton::step`'s resume functions.

mod error;

pub use error::Error;

use baker_automaton::{Action, BlockKind, ConsensusOpItem};
use baker_core::{Delegate, Level, NonceStrategy, PublicKeyHash, State};
use baker_rpc::{ForgeRequest, ForgedBlock, NodeClient, Signer, SigningKind};
use baker_watermark::{HighWatermarkStore, Kind as WatermarkKind, NonceStore, PersistedLevelState, PersistentLevelStateStore};
use rand::RngCore;
use sha3::{Digest, Sha3_256};
use std::sync::Arc;
use std::time::Duration;

/// Timeout applied to the extra-operations fetch.
pub const EXTRA_OPERATIONS_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Executor<N: NodeClient, S: Signer, W: HighWatermarkStore> {
    node: Arc<N>,
    signer: Arc<S>,
    watermark: Arc<W>,
    level_state_store: Arc<PersistentLevelStateStore>,
    nonce_store: Arc<NonceStore>,
    extra_operations: Option<Arc<dyn baker_rpc::ExtraOperationsSource>>,
    force: bool,
}

impl<N: NodeClient, S: Signer, W: HighWatermarkStore> Executor<N, S, W> {
    pub fn new(
        node: Arc<N>,
        signer: Arc<S>,
        watermark: Arc<W>,
        level_state_store: Arc<PersistentLevelStateStore>,
        nonce_store: Arc<NonceStore>,
        extra_operations: Option<Arc<dyn baker_rpc::ExtraOperationsSource>>,
        force: bool,
    ) -> Self {
        Self { node, signer, watermark, level_state_store, nonce_store, extra_operations, force }
    }

    /// Carries out `action`, resuming any `UpdateToLevel`/`SynchronizeRound`
    /// continuation inline, and returns the state the transition core
    /// decided to commit.
    pub async fn execute(&self, mut state: State, mut action: Action) -> Result<State, Error> {
        loop {
            match action {
                Action::DoNothing => return Ok(state),
                Action::InjectBlock { to_bake, new_state } => {
                    self.persist_level_state(&new_state).await?;
                    self.inject_block(&state, to_bake).await?;
                    return Ok(*new_state);
                }
                Action::InjectPreendorsements { items, new_state } => {
                    self.persist_level_state(&new_state).await?;
                    self.inject_consensus_ops(&state, items, WatermarkKind::Preendorsement).await?;
                    return Ok(*new_state);
                }
                Action::InjectEndorsements { items, new_state } => {
                    self.persist_level_state(&new_state).await?;
                    self.inject_consensus_ops(&state, items, WatermarkKind::Endorsement).await?;
                    return Ok(*new_state);
                }
                Action::UpdateToLevel { new_proposal } => {
                    let level = new_proposal.block.level;
                    let delegate_slots = self.node.validators_at_level(level).await?;
                    let next_level_slots = self.node.validators_at_level(level + 1).await?;
                    let (next_state, next_action) = baker_automaton::resume_update_to_level(
                        state,
                        new_proposal,
                        delegate_slots,
                        next_level_slots,
                    );
                    state = next_state;
                    action = next_action;
                }
                Action::SynchronizeRound { new_proposal } => {
                    let durations = state.global.constants.round_durations;
                    let now = chrono::Utc::now();
                    let round = baker_core::round_time::round_of_timestamp(
                        &durations,
                        new_proposal.predecessor.timestamp,
                        new_proposal.predecessor.round,
                        now,
                    )?;
                    let (next_state, next_action) =
                        baker_automaton::resume_synchronize_round(state, new_proposal, round);
                    state = next_state;
                    action = next_action;
                }
            }
        }
    }

    async fn inject_block(&self, state: &State, to_bake: baker_automaton::BlockToBake) -> Result<(), Error> {
        let delegate = find_delegate(state, &to_bake.delegate)?;
        let nonce = match &to_bake.kind {
            BlockKind::Fresh { .. } => self.generate_seed_nonce(state, to_bake.level),
            BlockKind::Reproposal { .. } => None,
        };
        let request = match to_bake.kind {
            BlockKind::Fresh { pool } => {
                let mut operations = pool.operations;
                if let Some(source) = &self.extra_operations {
                    match tokio::time::timeout(EXTRA_OPERATIONS_TIMEOUT, source.fetch()).await {
                        Ok(Ok(extra)) => operations.extend(extra),
                        Ok(Err(e)) => log::warn!("extra operations fetch failed: {}", e),
                        Err(_) => log::warn!(
                            "extra operations fetch timed out after {:?}",
                            EXTRA_OPERATIONS_TIMEOUT
                        ),
                    }
                }
                ForgeRequest::Fresh {
                    level: to_bake.level,
                    round: to_bake.round,
                    predecessor: to_bake.predecessor,
                    operations,
                    nonce_hash: nonce.map(|(_, hash)| hash),
                }
            }
            BlockKind::Reproposal { consensus_operations, payload_hash, payload_round, payload } => {
                ForgeRequest::Reproposal {
                    level: to_bake.level,
                    round: to_bake.round,
                    predecessor: to_bake.predecessor,
                    payload_hash,
                    payload_round,
                    operations: payload.operations,
                    prequorum_evidence: consensus_operations,
                }
            }
        };

        let ForgedBlock { unsigned_bytes, block_hash_to_sign } = self.node.forge_block(request).await?;
        if let Some((nonce_bytes, _)) = nonce {
            self.nonce_store.register(block_hash_to_sign, nonce_bytes).await?;
        }
        self.watermark
            .guard(
                &state.global.chain_id,
                &delegate.public_key_hash,
                WatermarkKind::Block,
                to_bake.level,
                to_bake.round,
                self.force,
            )
            .await?;
        let signed = self
            .signer
            .request_signature(&delegate.signer_handle, &state.global.chain_id, SigningKind::Block, &unsigned_bytes)
            .await?;
        self.node.inject_block(signed).await?;
        Ok(())
    }

    /// Persists `(current_level, locked_round, endorsable_payload)` ahead of
    /// the signing RPC, so a crash between here and injection loses nothing
    /// a restart can't recover.
    async fn persist_level_state(&self, state: &State) -> Result<(), Error> {
        self.level_state_store
            .write_if_changed(PersistedLevelState {
                level: state.level.current_level,
                locked_round: state.level.locked_round,
                endorsable_payload: state.level.endorsable_payload.clone(),
            })
            .await?;
        Ok(())
    }

    /// Generates a seed-nonce commitment when `level` falls on a
    /// `blocks_per_commitment` boundary, returning `(raw nonce, commitment
    /// hash)`. A `blocks_per_commitment` of zero disables commitments
    /// entirely.
    fn generate_seed_nonce(&self, state: &State, level: Level) -> Option<([u8; 32], [u8; 32])> {
        let per = state.global.constants.blocks_per_commitment;
        if per == 0 || level % per as Level != 0 {
            return None;
        }
        let nonce = match state.global.config.nonce {
            NonceStrategy::Deterministic => {
                let mut hasher = Sha3_256::new();
                hasher.update(state.global.chain_id.0.as_bytes());
                hasher.update(level.to_be_bytes());
                let mut out = [0u8; 32];
                out.copy_from_slice(&hasher.finalize());
                out
            }
            NonceStrategy::Random => {
                let mut out = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut out);
                out
            }
        };
        let mut hasher = Sha3_256::new();
        hasher.update(nonce);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&hasher.finalize());
        Some((nonce, hash))
    }

    // `kind` and the `SigningKind` passed to the signer mirror each other
    // one-to-one; kept as two enums since `baker-watermark` and
    // `baker-rpc` don't depend on each other.
    async fn inject_consensus_ops(
        &self,
        state: &State,
        items: Vec<ConsensusOpItem>,
        kind: WatermarkKind,
    ) -> Result<(), Error> {
        let signing_kind = match kind {
            WatermarkKind::Preendorsement => SigningKind::Preendorsement,
            WatermarkKind::Endorsement => SigningKind::Endorsement,
            WatermarkKind::Block => unreachable!("inject_consensus_ops is never called for blocks"),
        };
        for item in items {
            let delegate = match find_delegate(state, &item.delegate) {
                Ok(d) => d,
                Err(e) => {
                    log::error!("{}", e);
                    continue;
                }
            };
            let unsigned_bytes = serde_json::to_vec(&ConsensusOpWire::from(&item))
                .expect("ConsensusOpItem always serializes");
            if let Err(e) = self
                .watermark
                .guard(
                    &state.global.chain_id,
                    &delegate.public_key_hash,
                    kind,
                    item.level,
                    item.round,
                    self.force,
                )
                .await
            {
                log::warn!("refusing to sign {:?} for {}: {}", kind, delegate, e);
                continue;
            }
            let signed = self
                .signer
                .request_signature(&delegate.signer_handle, &state.global.chain_id, signing_kind, &unsigned_bytes)
                .await?;
            self.node.inject_operation(signed).await?;
        }
        Ok(())
    }
}

fn find_delegate<'a>(state: &'a State, hash: &PublicKeyHash) -> Result<&'a Delegate, Error> {
    state
        .global
        .own_delegates
        .iter()
        .find(|d| &d.public_key_hash == hash)
        .ok_or_else(|| Error::UnknownDelegate(*hash))
}

#[derive(serde::Serialize)]
struct ConsensusOpWire {
    delegate: PublicKeyHash,
    slot: u32,
    level: baker_core::Level,
    round: baker_core::Round,
    block_hash: baker_core::BlockHash,
    payload_hash: baker_core::PayloadHash,
    branch: baker_core::BlockHash,
}

impl From<&ConsensusOpItem> for ConsensusOpWire {
    fn from(item: &ConsensusOpItem) -> Self {
        Self {
            delegate: item.delegate,
            slot: item.slot,
            level: item.level,
            round: item.round,
            block_hash: item.block_hash,
            payload_hash: item.payload_hash,
            branch: item.branch,
        }
    }
}
