use crate::error::Error;
use async_trait::async_trait;
use baker_core::{BlockHash, BlockInfo, ChainId, DelegateSlots, Level, OperationHash};
use futures::stream::BoxStream;

/// An unsigned block forged by the node, ready to be signed and injected.
#[derive(Debug, Clone)]
pub struct ForgedBlock {
    pub unsigned_bytes: Vec<u8>,
    pub block_hash_to_sign: BlockHash,
}

/// What to forge a block from: a mempool snapshot, or a known payload being
/// reproposed.
#[derive(Debug, Clone)]
pub enum ForgeRequest {
    Fresh {
        level: Level,
        round: i32,
        predecessor: BlockHash,
        operations: Vec<OperationHash>,
        /// The seed-nonce commitment for this level, if one is due.
        nonce_hash: Option<[u8; 32]>,
    },
    Reproposal {
        level: Level,
        round: i32,
        predecessor: BlockHash,
        payload_hash: baker_core::PayloadHash,
        payload_round: i32,
        operations: Vec<OperationHash>,
        prequorum_evidence: Vec<baker_core::SignedOperation>,
    },
}

/// The node RPC surface the executor drives.
#[async_trait]
pub trait NodeClient: Send + Sync + 'static {
    async fn chain_id(&self) -> Result<ChainId, Error>;

    /// An infinite stream of new heads; ends (or errors) on disconnect, at
    /// which point the caller treats it as `NodeConnectionLost` and
    /// reconnects.
    async fn monitor_heads(&self) -> Result<BoxStream<'static, Result<BlockInfo, Error>>, Error>;

    /// An infinite stream of mempool operations, restarted independently of
    /// `monitor_heads` on failure.
    async fn monitor_operations(
        &self,
    ) -> Result<BoxStream<'static, Result<crate::MempoolWireOp, Error>>, Error>;

    async fn validators_at_level(&self, level: Level) -> Result<DelegateSlots, Error>;

    async fn block_info(&self, hash: BlockHash) -> Result<BlockInfo, Error>;

    async fn forge_block(&self, request: ForgeRequest) -> Result<ForgedBlock, Error>;

    async fn inject_block(&self, signed_bytes: Vec<u8>) -> Result<BlockHash, Error>;

    async fn inject_operation(&self, signed_bytes: Vec<u8>) -> Result<OperationHash, Error>;
}
