use baker_aggregator::{CandidateKind, MempoolOperation, OperationAggregator};
use baker_core::{BlockHash, OperationHash, PayloadHash};

fn payload(tag: &str) -> PayloadHash {
    PayloadHash::of(tag.as_bytes())
}

fn branch(tag: &str) -> BlockHash {
    BlockHash::of(tag.as_bytes())
}

fn op(hash: &str, level: i32, round: i32, payload_hash: PayloadHash, slot: u32) -> MempoolOperation {
    op_on_branch(hash, level, round, payload_hash, slot, branch("live"))
}

fn op_on_branch(
    hash: &str,
    level: i32,
    round: i32,
    payload_hash: PayloadHash,
    slot: u32,
    branch: BlockHash,
) -> MempoolOperation {
    MempoolOperation {
        hash: OperationHash::of(hash.as_bytes()),
        level,
        round,
        payload_hash,
        slot,
        kind: CandidateKind::Prequorum,
        branch,
    }
}

#[tokio::test]
async fn fires_exactly_once_when_threshold_crossed() {
    let (agg, mut events) = OperationAggregator::new(120);
    let payload_hash = payload("p");
    agg.register_candidate(CandidateKind::Prequorum, 10, 0, payload_hash, 3, |slot| {
        Some(match slot {
            0 | 1 | 2 => 1,
            _ => 1,
        })
    });

    agg.ingest(op("o0", 10, 0, payload_hash, 0));
    assert!(events.try_recv().is_err());
    agg.ingest(op("o1", 10, 0, payload_hash, 1));
    assert!(events.try_recv().is_err());
    agg.ingest(op("o2", 10, 0, payload_hash, 2));
    let event = events.try_recv().expect("threshold crossed");
    assert_eq!(event.power, 3);

    // A duplicate slot or a fourth slot must not re-fire the candidate.
    agg.ingest(op("o3", 10, 0, payload_hash, 2));
    agg.ingest(op("o4", 10, 0, payload_hash, 3));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn duplicate_slot_does_not_double_count_power() {
    let (agg, mut events) = OperationAggregator::new(120);
    let payload_hash = payload("p");
    agg.register_candidate(CandidateKind::Quorum, 10, 1, payload_hash, 2, |_| Some(1));
    agg.ingest(op("o0", 10, 1, payload_hash, 0));
    // Same slot, different operation hash (e.g. resent): deduped, so the
    // candidate is still below threshold.
    agg.ingest(op("o0-dup", 10, 1, payload_hash, 0));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn operations_for_unregistered_candidates_are_dropped() {
    let (agg, mut events) = OperationAggregator::new(120);
    agg.ingest(op("o0", 10, 0, payload("p"), 0));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn stale_slot_is_filtered_not_asserted() {
    let (agg, mut events) = OperationAggregator::new(120);
    let payload_hash = payload("p");
    agg.register_candidate(CandidateKind::Prequorum, 10, 0, payload_hash, 1, |slot| {
        if slot == 0 {
            Some(1)
        } else {
            None
        }
    });
    // Slot 7 is not in the committee mapping; must be dropped quietly.
    agg.ingest(op("o-stale", 10, 0, payload_hash, 7));
    assert!(events.try_recv().is_err());
    agg.ingest(op("o-ok", 10, 0, payload_hash, 0));
    assert!(events.try_recv().is_ok());
}

#[tokio::test]
async fn cancel_candidate_stops_further_firing() {
    let (agg, mut events) = OperationAggregator::new(120);
    let payload_hash = payload("p");
    agg.register_candidate(CandidateKind::Prequorum, 10, 0, payload_hash, 1, |_| Some(1));
    agg.cancel_candidate(CandidateKind::Prequorum, 10, 0, payload_hash);
    agg.ingest(op("o0", 10, 0, payload_hash, 0));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn operations_on_a_branch_outside_the_live_set_are_dropped() {
    let (agg, mut events) = OperationAggregator::new(120);
    let payload_hash = payload("p");
    agg.register_candidate(CandidateKind::Prequorum, 10, 0, payload_hash, 2, |_| Some(1));

    let mut live = std::collections::BTreeSet::new();
    live.insert(branch("live"));
    agg.observe_new_level(10, &live);

    // This operation references a branch that fell out of the live set
    // (e.g. an orphaned fork); it must not count toward the threshold.
    agg.ingest(op_on_branch("o-orphan", 10, 0, payload_hash, 0, branch("orphaned")));
    assert!(events.try_recv().is_err());

    agg.ingest(op_on_branch("o-live-0", 10, 0, payload_hash, 0, branch("live")));
    agg.ingest(op_on_branch("o-live-1", 10, 0, payload_hash, 1, branch("live")));
    assert!(events.try_recv().is_ok());
}

#[tokio::test]
async fn reaping_drops_old_levels_on_cadence() {
    let (agg, _events) = OperationAggregator::new(10);
    let payload_hash = payload("p");
    agg.register_candidate(CandidateKind::Prequorum, 1, 0, payload_hash, 100, |_| Some(1));
    agg.ingest(op("o0", 1, 0, payload_hash, 0));

    // preserved_levels / 10 == 1, so the very next observed level sweeps.
    agg.observe_new_level(50, &Default::default());
    agg.ingest(op("o1", 1, 0, payload_hash, 1));
    // Candidate at level 1 has been reaped (50 - 10 == 40 > 1), so this
    // second operation no longer has a live candidate to match.
    // We can't observe internal state directly, so exercise indirectly:
    // re-registering at level 1 and ingesting should behave as fresh.
    agg.register_candidate(CandidateKind::Prequorum, 1, 0, payload_hash, 1, |_| Some(1));
    agg.ingest(op("o2", 1, 0, payload_hash, 2));
}
