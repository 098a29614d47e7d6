//! Narrow trait surfaces the executor drives: the node RPC, the remote
//! signer, and extra-operation sources.

mod error;
mod extra_operations;
mod node_client;
mod signer;

pub use error::Error;
pub use extra_operations::ExtraOperationsSource;
pub use node_client::{ForgeRequest, ForgedBlock, NodeClient};
pub use signer::{Signer, SigningKind};

use baker_core::{BlockHash, Level, OperationHash, PayloadHash, Round, Slot};

/// One operation as reported by the node's mempool monitor, before the
/// aggregator has decided whether anybody is watching it.
#[derive(Debug, Clone)]
pub struct MempoolWireOp {
    pub hash: OperationHash,
    pub level: Level,
    pub round: Round,
    pub payload_hash: PayloadHash,
    pub slot: Slot,
    pub kind: MempoolWireKind,
    /// The block this consensus operation votes on; used to filter out
    /// operations for branches that have fallen out of the live-block set.
    pub branch: BlockHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MempoolWireKind {
    Preendorsement,
    Endorsement,
    Other,
}
