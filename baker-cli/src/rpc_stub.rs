//! The integration seam this binary leaves open: `NodeClient`/`Signer` are
//! trait-only in `baker-rpc`, so wiring a real Tezos-node HTTP client or remote
//! signer here is out of scope. These stand-ins satisfy the trait bounds
//! so the binary links and the event loop's shape is exercisable; a real
//! deployment swaps them for a concrete client.

use async_trait::async_trait;
use baker_core::{BlockHash, BlockInfo, ChainId, DelegateSlots, Level, OperationHash, SignerHandle};
use baker_rpc::{Error, ForgeRequest, ForgedBlock, MempoolWireOp, NodeClient, Signer, SigningKind};
use futures::stream::BoxStream;

pub struct UnimplementedNodeClient {
    endpoint: String,
}

impl UnimplementedNodeClient {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl NodeClient for UnimplementedNodeClient {
    async fn chain_id(&self) -> Result<ChainId, Error> {
        Err(Error::NodeRpc(format!("no RPC client wired for {}", self.endpoint)))
    }

    async fn monitor_heads(&self) -> Result<BoxStream<'static, Result<BlockInfo, Error>>, Error> {
        Err(Error::NodeRpc(format!("no RPC client wired for {}", self.endpoint)))
    }

    async fn monitor_operations(&self) -> Result<BoxStream<'static, Result<MempoolWireOp, Error>>, Error> {
        Err(Error::NodeRpc(format!("no RPC client wired for {}", self.endpoint)))
    }

    async fn validators_at_level(&self, _level: Level) -> Result<DelegateSlots, Error> {
        Err(Error::NodeRpc(format!("no RPC client wired for {}", self.endpoint)))
    }

    async fn block_info(&self, _hash: BlockHash) -> Result<BlockInfo, Error> {
        Err(Error::NodeRpc(format!("no RPC client wired for {}", self.endpoint)))
    }

    async fn forge_block(&self, _request: ForgeRequest) -> Result<ForgedBlock, Error> {
        Err(Error::NodeRpc(format!("no RPC client wired for {}", self.endpoint)))
    }

    async fn inject_block(&self, _signed_bytes: Vec<u8>) -> Result<BlockHash, Error> {
        Err(Error::NodeRpc(format!("no RPC client wired for {}", self.endpoint)))
    }

    async fn inject_operation(&self, _signed_bytes: Vec<u8>) -> Result<OperationHash, Error> {
        Err(Error::NodeRpc(format!("no RPC client wired for {}", self.endpoint)))
    }
}

pub struct UnimplementedSigner;

#[async_trait]
impl Signer for UnimplementedSigner {
    async fn request_signature(
        &self,
        handle: &SignerHandle,
        _chain_id: &ChainId,
        _kind: SigningKind,
        _unsigned_bytes: &[u8],
    ) -> Result<Vec<u8>, Error> {
        Err(Error::SignerRejected(format!("no signer wired for {}", handle.0)))
    }
}
