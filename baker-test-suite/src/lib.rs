//! Shared fixtures for the baker crates: a configurable mock node client, a
//! no-op signer, and the small builders every crate's tests otherwise
//! reimplement on their own.

use async_trait::async_trait;
use baker_core::{
    BakerConfig, BlockHash, BlockInfo, ChainId, Delegate, DelegateSlots, ExtraOperationsSource,
    Level, LiquidityBakingVote, NonceStrategy, OperationHash, ProtocolConstants, PublicKey,
    PublicKeyHash, SignerHandle,
};
use baker_rpc::{Error as RpcError, ForgeRequest, ForgedBlock, MempoolWireOp, NodeClient, Signer, SigningKind};
use futures::stream::BoxStream;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Installs a logger and a backtrace-friendly panic hook exactly once per
/// process, the way every other integration test in this workspace does.
pub fn setup_test() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
        let _ = color_eyre::install();
    });
}

pub fn create_temp_dir() -> TempDir {
    TempDir::new().expect("failed to create temp dir")
}

pub fn delegate(alias: &str) -> Delegate {
    Delegate {
        alias: Some(alias.to_string()),
        public_key: PublicKey(format!("edpk-{alias}")),
        public_key_hash: PublicKeyHash::of(alias.as_bytes()),
        signer_handle: SignerHandle(format!("signer://{alias}")),
    }
}

pub fn test_constants() -> ProtocolConstants {
    ProtocolConstants {
        consensus_threshold: 3,
        consensus_committee_size: 4,
        round_durations: baker_core::round_time::RoundDurations {
            first_round_duration_ms: 1000,
            delay_increment_per_round_ms: 100,
        },
        blocks_per_commitment: 1,
    }
}

pub fn test_config() -> BakerConfig {
    BakerConfig {
        minimal_fees: 0,
        minimal_nanotez_per_gas_unit: 0,
        minimal_nanotez_per_byte: 0,
        force: false,
        extra_operations: ExtraOperationsSource::None,
        context_path: None,
        user_activated_upgrades: Vec::new(),
        liquidity_baking_escape_vote: LiquidityBakingVote::Pass,
        per_block_vote_file: None,
        nonce: NonceStrategy::Deterministic,
        preserved_levels: 120,
        max_timer_delay_ms: 60_000,
    }
}

/// A `NodeClient` whose streams, committees, and blocks a test pushes into
/// directly, and whose forge/inject calls it can assert against
/// afterwards.
pub struct MockNodeClient {
    pub chain_id: ChainId,
    heads: Mutex<VecDeque<Result<BlockInfo, RpcError>>>,
    operations: Mutex<VecDeque<Result<MempoolWireOp, RpcError>>>,
    validators: Mutex<HashMap<Level, DelegateSlots>>,
    blocks: Mutex<HashMap<BlockHash, BlockInfo>>,
    pub forge_calls: AtomicUsize,
    pub inject_block_calls: AtomicUsize,
    pub injected_operations: Mutex<Vec<OperationHash>>,
}

impl MockNodeClient {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            heads: Mutex::new(VecDeque::new()),
            operations: Mutex::new(VecDeque::new()),
            validators: Mutex::new(HashMap::new()),
            blocks: Mutex::new(HashMap::new()),
            forge_calls: AtomicUsize::new(0),
            inject_block_calls: AtomicUsize::new(0),
            injected_operations: Mutex::new(Vec::new()),
        }
    }

    pub fn push_head(&self, head: BlockInfo) {
        self.heads.lock().push_back(Ok(head));
    }

    pub fn push_head_error(&self) {
        self.heads.lock().push_back(Err(RpcError::NodeConnectionLost));
    }

    pub fn push_operation(&self, op: MempoolWireOp) {
        self.operations.lock().push_back(Ok(op));
    }

    pub fn register_validators(&self, level: Level, slots: DelegateSlots) {
        self.validators.lock().insert(level, slots);
    }

    pub fn register_block(&self, info: BlockInfo) {
        self.blocks.lock().insert(info.hash, info);
    }
}

#[async_trait]
impl NodeClient for MockNodeClient {
    async fn chain_id(&self) -> Result<ChainId, RpcError> {
        Ok(self.chain_id.clone())
    }

    /// Drains whatever has been pushed since the last call, so a
    /// reconnect-on-end test can push more and call this again.
    async fn monitor_heads(&self) -> Result<BoxStream<'static, Result<BlockInfo, RpcError>>, RpcError> {
        let queued: Vec<_> = self.heads.lock().drain(..).collect();
        Ok(Box::pin(futures::stream::iter(queued)))
    }

    async fn monitor_operations(&self) -> Result<BoxStream<'static, Result<MempoolWireOp, RpcError>>, RpcError> {
        let queued: Vec<_> = self.operations.lock().drain(..).collect();
        Ok(Box::pin(futures::stream::iter(queued)))
    }

    async fn validators_at_level(&self, level: Level) -> Result<DelegateSlots, RpcError> {
        Ok(self.validators.lock().get(&level).cloned().unwrap_or_default())
    }

    async fn block_info(&self, hash: BlockHash) -> Result<BlockInfo, RpcError> {
        self.blocks
            .lock()
            .get(&hash)
            .cloned()
            .ok_or_else(|| RpcError::NodeRpc(format!("unknown block {hash}")))
    }

    async fn forge_block(&self, _request: ForgeRequest) -> Result<ForgedBlock, RpcError> {
        self.forge_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ForgedBlock { unsigned_bytes: vec![0u8; 8], block_hash_to_sign: BlockHash::of(b"mock-forged") })
    }

    async fn inject_block(&self, _signed_bytes: Vec<u8>) -> Result<BlockHash, RpcError> {
        self.inject_block_calls.fetch_add(1, Ordering::SeqCst);
        Ok(BlockHash::of(b"mock-injected"))
    }

    async fn inject_operation(&self, signed_bytes: Vec<u8>) -> Result<OperationHash, RpcError> {
        let hash = OperationHash::of(&signed_bytes);
        self.injected_operations.lock().push(hash);
        Ok(hash)
    }
}

/// Signs by appending a marker byte; good enough to tell "was this signed"
/// apart from "was this forwarded unsigned" in assertions.
pub struct MockSigner;

#[async_trait]
impl Signer for MockSigner {
    async fn request_signature(
        &self,
        _handle: &SignerHandle,
        _chain_id: &ChainId,
        _kind: SigningKind,
        unsigned_bytes: &[u8],
    ) -> Result<Vec<u8>, RpcError> {
        let mut signed = unsigned_bytes.to_vec();
        signed.push(0xff);
        Ok(signed)
    }
}
