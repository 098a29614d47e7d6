use baker_cli::config::LaunchConfig;
use baker_core::LiquidityBakingVote;

#[test]
fn launch_config_deserializes_from_json() {
    let json = serde_json::json!({
        "chain_id": "NetXdlafirst",
        "delegates": [{
            "alias": "alice",
            "public_key": "edpk-alice",
            "public_key_hash": "61".repeat(32),
            "signer_handle": "signer://alice"
        }],
        "constants": {
            "consensus_threshold": 3,
            "consensus_committee_size": 4,
            "round_durations": { "first_round_duration_ms": 1000, "delay_increment_per_round_ms": 100 },
            "blocks_per_commitment": 1
        },
        "config": {
            "minimal_fees": 0,
            "minimal_nanotez_per_gas_unit": 0,
            "minimal_nanotez_per_byte": 0,
            "force": false,
            "extra_operations": "None",
            "context_path": null,
            "user_activated_upgrades": [],
            "liquidity_baking_escape_vote": "Pass",
            "per_block_vote_file": null,
            "nonce": "Deterministic",
            "preserved_levels": 120,
            "max_timer_delay_ms": 60000
        },
        "initial_level": 100,
        "node_rpc_endpoint": "http://localhost:8732"
    });

    let launch: LaunchConfig = serde_json::from_value(json).expect("launch config should deserialize");
    assert_eq!(launch.initial_level, 100);
    assert_eq!(launch.delegates.len(), 1);
    assert_eq!(launch.config.liquidity_baking_escape_vote, LiquidityBakingVote::Pass);
}
