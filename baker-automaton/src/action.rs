use baker_core::{
    BlockHash, Level, OperationPool, PayloadHash, Proposal, PublicKeyHash, Round, SignedOperation,
    State,
};

/// What the forged block should carry.
#[derive(Debug, Clone)]
pub enum BlockKind {
    /// A fresh block over the current mempool snapshot.
    Fresh { pool: OperationPool },
    /// Reproposing the endorsable payload known from a prior round.
    Reproposal {
        consensus_operations: Vec<SignedOperation>,
        payload_hash: PayloadHash,
        payload_round: Round,
        payload: OperationPool,
    },
}

#[derive(Debug, Clone)]
pub struct BlockToBake {
    pub level: Level,
    pub round: Round,
    pub predecessor: BlockHash,
    pub delegate: PublicKeyHash,
    pub kind: BlockKind,
}

/// One delegate's preendorsement/endorsement to sign and inject. The
/// branch is the block being voted on.
#[derive(Debug, Clone)]
pub struct ConsensusOpItem {
    pub delegate: PublicKeyHash,
    pub slot: u32,
    pub level: Level,
    pub round: Round,
    pub block_hash: BlockHash,
    pub payload_hash: PayloadHash,
    /// Branch for the operation's shell header: the predecessor's hash,
    /// preserved verbatim rather than "corrected", pending confirmation
    /// against protocol rules.
    pub branch: BlockHash,
}

/// What the executor must do in response to one transition. Continuations are represented as explicit re-entry calls
/// (`Automaton::resume_update_to_level` / `resume_synchronize_round`)
/// rather than boxed closures.
#[derive(Debug, Clone)]
pub enum Action {
    DoNothing,
    InjectBlock {
        to_bake: BlockToBake,
        new_state: Box<State>,
    },
    InjectPreendorsements {
        items: Vec<ConsensusOpItem>,
        new_state: Box<State>,
    },
    InjectEndorsements {
        items: Vec<ConsensusOpItem>,
        new_state: Box<State>,
    },
    /// The executor must fetch fresh committees for `new_proposal.level`
    /// and its successor, then call
    /// `Automaton::resume_update_to_level`.
    UpdateToLevel { new_proposal: Proposal },
    /// The executor must compute the round active at `new_proposal`'s
    /// timestamp, then call `Automaton::resume_synchronize_round`.
    SynchronizeRound { new_proposal: Proposal },
}
