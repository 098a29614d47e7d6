use baker_core::{BlockHash, OperationHash, PayloadHash, Proposal, Round, Slot, VotingPower};

/// The scheduler-emitted events the transition core consumes.
#[derive(Debug, Clone)]
pub enum Event {
    NewProposal(Proposal),
    PrequorumReached {
        candidate_hash: BlockHash,
        round: Round,
        payload_hash: PayloadHash,
        power: VotingPower,
        preendorsements: Vec<(Slot, OperationHash)>,
    },
    QuorumReached {
        candidate_hash: BlockHash,
        round: Round,
        payload_hash: PayloadHash,
        power: VotingPower,
        endorsements: Vec<(Slot, OperationHash)>,
    },
    Timeout(TimeoutKind),
}

#[derive(Debug, Clone, Copy)]
pub enum TimeoutKind {
    EndOfRound { ending_round: Round },
    TimeToBakeNextLevel { at_round: Round },
}
