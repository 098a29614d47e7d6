use async_trait::async_trait;
use baker_automaton::{Action, BlockKind, BlockToBake, ConsensusOpItem};
use baker_core::{
    BlockHash, ChainId, Delegate, DelegateSlots, GlobalState, Level, LevelState, OperationHash,
    OperationPool, PayloadHash, Phase, ProtocolConstants, PublicKey, PublicKeyHash, RoundState,
    SignerHandle, State,
};
use baker_executor::Executor;
use baker_rpc::{ForgeRequest, ForgedBlock, NodeClient, Signer, SigningKind};
use baker_watermark::{InMemoryHighWatermarkStore, NonceStore, PersistentLevelStateStore};
use futures::stream::BoxStream;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Fresh, isolated file-backed stores for one test; the returned `TempDir`
/// must be kept alive for as long as the stores are in use.
async fn fresh_stores() -> (TempDir, Arc<PersistentLevelStateStore>, Arc<NonceStore>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let level_state = Arc::new(
        PersistentLevelStateStore::open(dir.path()).await.expect("open level state store"),
    );
    let nonce = Arc::new(NonceStore::open(dir.path()).await.expect("open nonce store"));
    (dir, level_state, nonce)
}

struct MockNode {
    forge_calls: AtomicUsize,
    inject_block_calls: AtomicUsize,
    inject_operation_calls: Mutex<Vec<OperationHash>>,
}

#[async_trait]
impl NodeClient for MockNode {
    async fn chain_id(&self) -> Result<ChainId, baker_rpc::Error> {
        Ok(ChainId("NetXtest".to_string()))
    }

    async fn monitor_heads(&self) -> Result<BoxStream<'static, Result<baker_core::BlockInfo, baker_rpc::Error>>, baker_rpc::Error> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn monitor_operations(
        &self,
    ) -> Result<BoxStream<'static, Result<baker_rpc::MempoolWireOp, baker_rpc::Error>>, baker_rpc::Error> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn validators_at_level(&self, _level: Level) -> Result<DelegateSlots, baker_rpc::Error> {
        Ok(DelegateSlots::default())
    }

    async fn block_info(&self, _hash: BlockHash) -> Result<baker_core::BlockInfo, baker_rpc::Error> {
        unreachable!("not exercised by these tests")
    }

    async fn forge_block(&self, _request: ForgeRequest) -> Result<ForgedBlock, baker_rpc::Error> {
        self.forge_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ForgedBlock { unsigned_bytes: vec![1, 2, 3], block_hash_to_sign: BlockHash::of(b"forged") })
    }

    async fn inject_block(&self, _signed_bytes: Vec<u8>) -> Result<BlockHash, baker_rpc::Error> {
        self.inject_block_calls.fetch_add(1, Ordering::SeqCst);
        Ok(BlockHash::of(b"injected"))
    }

    async fn inject_operation(&self, signed_bytes: Vec<u8>) -> Result<OperationHash, baker_rpc::Error> {
        let hash = OperationHash::of(&signed_bytes);
        self.inject_operation_calls.lock().push(hash);
        Ok(hash)
    }
}

struct MockSigner;

#[async_trait]
impl Signer for MockSigner {
    async fn request_signature(
        &self,
        _handle: &SignerHandle,
        _chain_id: &ChainId,
        _kind: SigningKind,
        unsigned_bytes: &[u8],
    ) -> Result<Vec<u8>, baker_rpc::Error> {
        let mut signed = unsigned_bytes.to_vec();
        signed.push(0xff);
        Ok(signed)
    }
}

fn delegate() -> Delegate {
    Delegate {
        alias: Some("alice".to_string()),
        public_key: PublicKey("edpk-test".to_string()),
        public_key_hash: PublicKeyHash::of(b"alice"),
        signer_handle: SignerHandle("signer://alice".to_string()),
    }
}

fn state_with_delegate() -> State {
    State {
        global: GlobalState::new(
            ChainId("NetXtest".to_string()),
            test_config(),
            test_constants(),
            vec![delegate()],
        ),
        level: LevelState::new(10, DelegateSlots::default()),
        round: RoundState { current_round: 0, phase: Phase::Idle },
    }
}

fn test_constants() -> ProtocolConstants {
    ProtocolConstants {
        consensus_threshold: 3,
        consensus_committee_size: 3,
        round_durations: baker_core::round_time::RoundDurations {
            first_round_duration_ms: 1000,
            delay_increment_per_round_ms: 100,
        },
        blocks_per_commitment: 1,
    }
}

fn test_config() -> baker_core::BakerConfig {
    baker_core::BakerConfig {
        minimal_fees: 0,
        minimal_nanotez_per_gas_unit: 0,
        minimal_nanotez_per_byte: 0,
        force: false,
        extra_operations: baker_core::ExtraOperationsSource::None,
        context_path: None,
        user_activated_upgrades: Vec::new(),
        liquidity_baking_escape_vote: baker_core::LiquidityBakingVote::Pass,
        per_block_vote_file: None,
        nonce: baker_core::NonceStrategy::Deterministic,
        preserved_levels: 120,
        max_timer_delay_ms: 60_000,
    }
}

fn node() -> Arc<MockNode> {
    Arc::new(MockNode {
        forge_calls: AtomicUsize::new(0),
        inject_block_calls: AtomicUsize::new(0),
        inject_operation_calls: Mutex::new(Vec::new()),
    })
}

#[tokio::test]
async fn inject_block_forges_signs_and_injects() {
    let node = node();
    let (_dir, level_state, nonce) = fresh_stores().await;
    let executor = Executor::new(
        node.clone(),
        Arc::new(MockSigner),
        Arc::new(InMemoryHighWatermarkStore::default()),
        level_state,
        nonce,
        None,
        false,
    );
    let state = state_with_delegate();
    let to_bake = BlockToBake {
        level: 10,
        round: 0,
        predecessor: BlockHash::of(b"pred"),
        delegate: delegate().public_key_hash,
        kind: BlockKind::Fresh { pool: OperationPool::default() },
    };
    let action = Action::InjectBlock { to_bake, new_state: Box::new(state.clone()) };

    let result = executor.execute(state, action).await;
    assert!(result.is_ok());
    assert_eq!(node.forge_calls.load(Ordering::SeqCst), 1);
    assert_eq!(node.inject_block_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn inject_block_twice_at_same_level_round_is_rejected_by_watermark() {
    let node = node();
    let watermark = Arc::new(InMemoryHighWatermarkStore::default());
    let (_dir, level_state, nonce) = fresh_stores().await;
    let executor = Executor::new(node.clone(), Arc::new(MockSigner), watermark, level_state, nonce, None, false);
    let state = state_with_delegate();
    let make_action = |state: &State| Action::InjectBlock {
        to_bake: BlockToBake {
            level: 10,
            round: 0,
            predecessor: BlockHash::of(b"pred"),
            delegate: delegate().public_key_hash,
            kind: BlockKind::Fresh { pool: OperationPool::default() },
        },
        new_state: Box::new(state.clone()),
    };

    let action = make_action(&state);
    let state = executor.execute(state, action).await.expect("first bake succeeds");
    let action = make_action(&state);
    let result = executor.execute(state, action).await;
    assert!(result.is_err());
    assert_eq!(node.forge_calls.load(Ordering::SeqCst), 2);
    assert_eq!(node.inject_block_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn inject_block_registers_the_nonce_and_persists_level_state() {
    let node = node();
    let (_dir, level_state, nonce) = fresh_stores().await;
    let executor = Executor::new(
        node.clone(),
        Arc::new(MockSigner),
        Arc::new(InMemoryHighWatermarkStore::default()),
        level_state.clone(),
        nonce.clone(),
        None,
        false,
    );
    let mut state = state_with_delegate();
    state.level.locked_round = Some(baker_core::LockedRound {
        payload_hash: PayloadHash::of(b"payload"),
        round: 0,
    });
    let to_bake = BlockToBake {
        level: 10,
        round: 0,
        predecessor: BlockHash::of(b"pred"),
        delegate: delegate().public_key_hash,
        kind: BlockKind::Fresh { pool: OperationPool::default() },
    };
    let action = Action::InjectBlock { to_bake, new_state: Box::new(state.clone()) };

    executor.execute(state.clone(), action).await.expect("bake succeeds");

    // `test_constants().blocks_per_commitment == 1`, so every level owes a
    // commitment; the forged block hash is the fixed "forged" the mock
    // always returns.
    assert!(nonce.get(&BlockHash::of(b"forged")).is_some());
    let persisted = level_state.current().expect("level state persisted");
    assert_eq!(persisted.level, 10);
    assert_eq!(persisted.locked_round, state.level.locked_round);
}

#[tokio::test]
async fn inject_endorsements_signs_each_own_slot() {
    let node = node();
    let (_dir, level_state, nonce) = fresh_stores().await;
    let executor = Executor::new(
        node.clone(),
        Arc::new(MockSigner),
        Arc::new(InMemoryHighWatermarkStore::default()),
        level_state,
        nonce,
        None,
        false,
    );
    let state = state_with_delegate();
    let items = vec![ConsensusOpItem {
        delegate: delegate().public_key_hash,
        slot: 0,
        level: 10,
        round: 0,
        block_hash: BlockHash::of(b"block"),
        payload_hash: PayloadHash::of(b"payload"),
        branch: BlockHash::of(b"pred"),
    }];
    let action = Action::InjectEndorsements { items, new_state: Box::new(state.clone()) };
    executor.execute(state, action).await.expect("endorsement injected");
    assert_eq!(node.inject_operation_calls.lock().len(), 1);
}
