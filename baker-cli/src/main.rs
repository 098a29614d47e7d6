use baker_cli::config::LaunchConfig;
use baker_cli::rpc_stub;
use baker_core::{DelegateSlots, GlobalState, LevelState, Phase, RoundState, State};
use baker_node::Node;
use clap::Parser;
use eyre::Context;
use std::path::PathBuf;
use std::sync::Arc;

/// Runs the baking daemon for the delegates named in the launch config.
/// Flag parsing here is deliberately thin: everything
/// that shapes behavior lives in the JSON config, not in CLI flags.
#[derive(Debug, Parser)]
#[clap(name = "baker")]
#[clap(about = "Tenderbake-style baking daemon", long_about = None)]
struct Cli {
    /// Path to a JSON launch config: chain id, delegates, protocol
    /// constants, and baker config.
    config: PathBuf,

    /// Directory holding the high-watermark file.
    #[clap(long, default_value = "./baker-data")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();
    let args = Cli::parse();

    let raw = std::fs::read_to_string(&args.config)
        .wrap_err_with(|| format!("reading launch config at {}", args.config.display()))?;
    let launch: LaunchConfig = serde_json::from_str(&raw).wrap_err("parsing launch config")?;

    let watermark = Arc::new(
        baker_watermark::FileHighWatermarkStore::open(&args.data_dir)
            .await
            .wrap_err_with(|| format!("opening high-watermark store under {}", args.data_dir.display()))?,
    );
    let level_state_store = Arc::new(
        baker_watermark::PersistentLevelStateStore::open(&args.data_dir)
            .await
            .wrap_err_with(|| format!("opening level state store under {}", args.data_dir.display()))?,
    );
    let nonce_store = Arc::new(
        baker_watermark::NonceStore::open(&args.data_dir)
            .await
            .wrap_err_with(|| format!("opening nonce store under {}", args.data_dir.display()))?,
    );

    log::info!(
        "starting baker for chain {} with {} delegate(s) at level {}",
        launch.chain_id,
        launch.delegates.len(),
        launch.initial_level
    );

    let state = State {
        global: GlobalState::new(launch.chain_id, launch.config, launch.constants, launch.delegates),
        level: LevelState::new(launch.initial_level, DelegateSlots::default()),
        round: RoundState { current_round: 0, phase: Phase::Idle },
    };

    let node = Node::new(
        state,
        Arc::new(rpc_stub::UnimplementedNodeClient::new(launch.node_rpc_endpoint)),
        Arc::new(rpc_stub::UnimplementedSigner),
        watermark,
        level_state_store,
        nonce_store,
        None,
    );

    node.run().await.wrap_err("baker event loop exited")?;
    Ok(())
}
