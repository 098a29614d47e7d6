//! The JSON launch config this binary reads; parsing it is a
//! single `serde_json::from_str` call, not a dedicated config layer.

use baker_core::{BakerConfig, ChainId, Delegate, Level, ProtocolConstants};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LaunchConfig {
    pub chain_id: ChainId,
    pub delegates: Vec<Delegate>,
    pub constants: ProtocolConstants,
    pub config: BakerConfig,
    /// The level to start watching from; a real deployment would instead
    /// read the node's current head, but fetching that is itself a
    /// `NodeClient::monitor_heads` call this binary doesn't make until
    /// `Node::run` starts.
    pub initial_level: Level,
    pub node_rpc_endpoint: String,
}
