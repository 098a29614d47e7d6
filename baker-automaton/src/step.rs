//! The pure transition function: `step(state, event) ->
//! (state, action)`. No I/O, no clocks, no randomness — every external
//! input arrives through `Event` or is already sitting in `State`.

use crate::action::{Action, BlockKind, BlockToBake, ConsensusOpItem};
use crate::event::{Event, TimeoutKind};
use baker_core::{
    BlockHash, DelegateSlots, EndorsablePayload, LevelState, OperationHash, PayloadHash, Phase,
    Prequorum, Proposal, Round, SignedOperation, Slot, State, VotingPower,
};
use std::cmp::Ordering;

/// Single entry point the scheduler drives on every event.
pub fn step(state: State, event: Event) -> (State, Action) {
    match event {
        Event::NewProposal(p) => new_proposal(state, p),
        Event::PrequorumReached {
            candidate_hash,
            round,
            payload_hash,
            power,
            preendorsements,
        } => prequorum_reached(state, candidate_hash, round, payload_hash, power, preendorsements),
        Event::QuorumReached {
            candidate_hash,
            round,
            payload_hash,
            power,
            endorsements,
        } => quorum_reached(state, candidate_hash, round, payload_hash, power, endorsements),
        Event::Timeout(TimeoutKind::EndOfRound { ending_round }) => end_of_round(state, ending_round),
        Event::Timeout(TimeoutKind::TimeToBakeNextLevel { at_round }) => {
            time_to_bake_next_level(state, at_round)
        }
    }
}

/// Resumes after the executor has fetched committees for `new_proposal`'s
/// level and its successor, following an `Action::UpdateToLevel`.
pub fn resume_update_to_level(
    mut state: State,
    new_proposal_: Proposal,
    delegate_slots: DelegateSlots,
    next_level_delegate_slots: DelegateSlots,
) -> (State, Action) {
    state.level = LevelState::new(new_proposal_.block.level, delegate_slots);
    state.level.next_level_delegate_slots = Some(next_level_delegate_slots);
    state.round.current_round = new_proposal_.block.round;
    state.round.phase = Phase::Idle;
    // Transition-block rule: a block whose
    // protocol differs from what its predecessor declared as the next one
    // is the first block of a new protocol, and always starts at round 0.
    if new_proposal_.predecessor.next_protocol != new_proposal_.block.protocol {
        state.round.current_round = 0;
    }
    accept_proposal(state, new_proposal_)
}

/// Resumes after the executor has computed the round active at
/// `new_proposal`'s timestamp, following an `Action::SynchronizeRound`.
pub fn resume_synchronize_round(
    mut state: State,
    new_proposal_: Proposal,
    synchronized_round: Round,
) -> (State, Action) {
    state.round.current_round = synchronized_round;
    new_proposal(state, new_proposal_)
}

enum Classification {
    Stale,
    FutureLevel,
    CompetingBranch,
    RoundMismatch,
    Acceptable,
}

fn classify(state: &State, p: &Proposal) -> Classification {
    let level = state.level.current_level;
    if p.block.level < level {
        return Classification::Stale;
    }
    if p.block.level > level {
        return Classification::FutureLevel;
    }
    if let Some(latest) = &state.level.latest_proposal {
        if latest.block.predecessor != p.block.predecessor {
            return Classification::CompetingBranch;
        }
    }
    if p.block.round < state.round.current_round {
        return Classification::Stale;
    }
    if p.block.round != state.round.current_round {
        return Classification::RoundMismatch;
    }
    Classification::Acceptable
}

fn new_proposal(state: State, p: Proposal) -> (State, Action) {
    match classify(&state, &p) {
        Classification::Stale => {
            log::debug!(
                "dropping stale proposal {} at level {} round {}",
                p.block.hash,
                p.block.level,
                p.block.round
            );
            (state, Action::DoNothing)
        }
        Classification::FutureLevel => (state, Action::UpdateToLevel { new_proposal: p }),
        Classification::CompetingBranch => branch_switch(state, p),
        Classification::RoundMismatch => (state, Action::SynchronizeRound { new_proposal: p }),
        Classification::Acceptable => accept_proposal(state, p),
    }
}

/// Two proposals compete for the same level over different predecessors:
/// switch when the competitor has strictly greater fitness, or a strictly
/// better prequorum (the fitness tie/loss case, since a higher-round
/// prequorum is stronger evidence regardless of the block's own fitness).
fn branch_switch(state: State, p: Proposal) -> (State, Action) {
    match &state.level.latest_proposal {
        None => switch_to(state, p),
        Some(latest) => match p.block.fitness.cmp(&latest.block.fitness) {
            Ordering::Greater => switch_to(state, p),
            Ordering::Equal => {
                if has_better_prequorum(&state, &p) {
                    switch_to(state, p)
                } else {
                    log::error!(
                        "competing branches with equal fitness at level {}: {} vs {}",
                        p.block.level,
                        p.block.hash,
                        latest.block.hash
                    );
                    (state, Action::DoNothing)
                }
            }
            Ordering::Less => {
                if has_better_prequorum(&state, &p) {
                    switch_to(state, p)
                } else {
                    log::debug!(
                        "ignoring lower-fitness competing branch {} at level {}",
                        p.block.hash,
                        p.block.level
                    );
                    (state, Action::DoNothing)
                }
            }
        },
    }
}

/// Whether `p` carries a prequorum at a strictly higher round than the one
/// backing the endorsable payload we currently hold, if any.
fn has_better_prequorum(state: &State, p: &Proposal) -> bool {
    match (&state.level.endorsable_payload, &p.block.prequorum) {
        (Some(existing), Some(candidate)) => candidate.round > existing.prequorum.round,
        (None, Some(_)) => true,
        _ => false,
    }
}

/// Adopts the winning branch: `locked_round` belonged to the abandoned
/// branch and is dropped; `endorsable_payload` is inherited only if the
/// new branch's own prequorum round is strictly greater than the one we
/// already held.
fn switch_to(mut state: State, p: Proposal) -> (State, Action) {
    let inherited = match (&state.level.endorsable_payload, &p.block.prequorum) {
        (Some(existing), Some(candidate)) if candidate.round > existing.prequorum.round => Some(
            EndorsablePayload { proposal: p.clone(), prequorum: candidate.clone() },
        ),
        (None, Some(candidate)) => Some(EndorsablePayload { proposal: p.clone(), prequorum: candidate.clone() }),
        _ => None,
    };
    state.level.locked_round = None;
    state.level.endorsable_payload = inherited;
    state.level.latest_proposal = Some(p.clone());
    state.round.current_round = p.block.round;
    state.round.phase = Phase::Idle;
    accept_proposal(state, p)
}

/// Preendorses `p` unless locked onto a different payload at a round it
/// hasn't yet cleared.
fn accept_proposal(mut state: State, p: Proposal) -> (State, Action) {
    state.level.latest_proposal = Some(p.clone());
    state.round.current_round = p.block.round;
    state.round.phase = Phase::Idle;

    let may_preendorse = match state.level.locked_round {
        Some(locked) => {
            locked.round < p.block.payload_round || locked.payload_hash == p.block.payload_hash
        }
        None => true,
    };
    if !may_preendorse {
        let locked = state.level.locked_round.expect("checked above");
        log::info!(
            "locked on payload {} at round {}; not preendorsing {} at level {} round {}",
            locked.payload_hash,
            locked.round,
            p.block.payload_hash,
            p.block.level,
            p.block.round
        );
        return (state, Action::DoNothing);
    }

    let items = own_consensus_items(&state.level, &p);
    if items.is_empty() {
        return (state, Action::DoNothing);
    }
    state.round.phase = Phase::AwaitingPreendorsements;
    let new_state = Box::new(state.clone());
    (state, Action::InjectPreendorsements { items, new_state })
}

/// A prequorum certificate crossed threshold for the current round's
/// candidate: lock the endorsable payload and endorse it.
fn prequorum_reached(
    mut state: State,
    candidate_hash: BlockHash,
    round: Round,
    payload_hash: PayloadHash,
    _power: VotingPower,
    preendorsements: Vec<(Slot, OperationHash)>,
) -> (State, Action) {
    let Some(latest) = state.level.latest_proposal.clone() else {
        return (state, Action::DoNothing);
    };
    if candidate_hash != latest.block.hash
        || round != state.round.current_round
        || payload_hash != latest.block.payload_hash
    {
        return (state, Action::DoNothing);
    }

    let level = state.level.current_level;
    let signed_ops = into_signed_operations(preendorsements, level, round, payload_hash);
    let prequorum = Prequorum { level, round, payload_hash, preendorsements: signed_ops };
    let endorsable = EndorsablePayload { proposal: latest.clone(), prequorum };
    if let Err(err) = state.level.set_endorsable_payload(endorsable) {
        log::error!("rejecting endorsable_payload at level {} round {}: {}", level, round, err);
        return (state, Action::DoNothing);
    }

    let items = own_consensus_items(&state.level, &latest);
    if items.is_empty() {
        state.round.phase = Phase::Idle;
        return (state, Action::DoNothing);
    }
    state.round.phase = Phase::AwaitingEndorsements;
    let new_state = Box::new(state.clone());
    (state, Action::InjectEndorsements { items, new_state })
}

/// A quorum certificate crossed threshold: the block is elected. The next
/// `TimeToBakeNextLevel` timeout, not this handler, produces the next
/// block.
fn quorum_reached(
    mut state: State,
    candidate_hash: BlockHash,
    round: Round,
    payload_hash: PayloadHash,
    _power: VotingPower,
    endorsements: Vec<(Slot, OperationHash)>,
) -> (State, Action) {
    let Some(latest) = state.level.latest_proposal.clone() else {
        return (state, Action::DoNothing);
    };
    if candidate_hash != latest.block.hash
        || round != state.round.current_round
        || payload_hash != latest.block.payload_hash
    {
        return (state, Action::DoNothing);
    }

    let level = state.level.current_level;
    let endorsement_qc = into_signed_operations(endorsements, level, round, payload_hash);
    state.level.set_elected_block(baker_core::ElectedBlock { proposal: latest, endorsement_qc });
    state.round.phase = Phase::Idle;
    (state, Action::DoNothing)
}

/// No quorum by the end of `ending_round`: move to the next round and, if
/// one of our own delegates is proposer there, propose again — reproposing
/// the endorsable payload if we know one, else a fresh block over the
/// current mempool snapshot.
fn end_of_round(mut state: State, ending_round: Round) -> (State, Action) {
    if let Some(proposal) = &state.level.latest_proposal {
        if proposal.block.round > ending_round {
            return (state, Action::DoNothing);
        }
    }
    let Some(latest) = state.level.latest_proposal.clone() else {
        return (state, Action::DoNothing);
    };

    let next_round = ending_round + 1;
    state.round.current_round = next_round;
    state.round.phase = Phase::Idle;

    let committee_size = state.global.constants.consensus_committee_size;
    let Some(slot_info) = state
        .level
        .delegate_slots
        .own_proposer_at(next_round, committee_size)
        .cloned()
    else {
        return (state, Action::DoNothing);
    };

    let kind = match &state.level.endorsable_payload {
        Some(endorsable) => BlockKind::Reproposal {
            consensus_operations: endorsable.prequorum.preendorsements.clone(),
            payload_hash: endorsable.prequorum.payload_hash,
            payload_round: endorsable.proposal.block.payload_round,
            payload: endorsable.proposal.block.payload.clone(),
        },
        None => BlockKind::Fresh { pool: state.global.mempool_pool.clone() },
    };
    let to_bake = BlockToBake {
        level: state.level.current_level,
        round: next_round,
        predecessor: latest.predecessor.hash,
        delegate: slot_info.delegate_hash,
        kind,
    };
    let new_state = Box::new(state.clone());
    (state, Action::InjectBlock { to_bake, new_state })
}

/// The elected block's grandchild slot arrived: propose the next level if
/// one of our own delegates won the proposer slot for `at_round` there.
fn time_to_bake_next_level(mut state: State, at_round: Round) -> (State, Action) {
    let Some(elected) = state.level.elected_block.clone() else {
        return (state, Action::DoNothing);
    };
    if state.level.next_level_proposed_round == Some(at_round) {
        return (state, Action::DoNothing);
    }
    let next_level_slots = state.level.next_level_delegate_slots.clone().unwrap_or_default();
    let committee_size = state.global.constants.consensus_committee_size;
    let Some(slot_info) = next_level_slots.own_proposer_at(at_round, committee_size).cloned() else {
        return (state, Action::DoNothing);
    };

    let to_bake = BlockToBake {
        level: state.level.current_level + 1,
        round: at_round,
        predecessor: elected.proposal.block.hash,
        delegate: slot_info.delegate_hash,
        kind: BlockKind::Fresh { pool: state.global.mempool_pool.clone() },
    };
    state.level.next_level_proposed_round = Some(at_round);
    let new_state = Box::new(state.clone());
    (state, Action::InjectBlock { to_bake, new_state })
}

fn own_consensus_items(level: &LevelState, p: &Proposal) -> Vec<ConsensusOpItem> {
    level
        .delegate_slots
        .own
        .values()
        .flat_map(|info| {
            info.slots.iter().map(move |slot| ConsensusOpItem {
                delegate: info.delegate_hash,
                slot: *slot,
                level: p.block.level,
                round: p.block.round,
                block_hash: p.block.hash,
                payload_hash: p.block.payload_hash,
                branch: p.predecessor.hash,
            })
        })
        .collect()
}

fn into_signed_operations(
    items: Vec<(Slot, OperationHash)>,
    level: baker_core::Level,
    round: Round,
    payload_hash: PayloadHash,
) -> Vec<SignedOperation> {
    items
        .into_iter()
        .map(|(slot, hash)| SignedOperation { hash, slot, level, round, payload_hash })
        .collect()
}
