use clap::Parser;
use longchain_core::{
    constants::{DEFAULT_DIFFICULTY, DEFAULT_PEER_TIMEOUT_SECS},
    Difficulty, HttpPeerClient, Ledger, LedgerConfig, NodeId, SharedLedger,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod routes;

#[derive(Parser, Debug)]
#[command(name = "longchain-node")]
#[command(about = "Proof-of-work ledger node with longest-chain consensus")]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:5000
    #[arg(long, env = "LONGCHAIN_LISTEN", default_value = "127.0.0.1:5000")]
    listen: String,

    /// Leading zero hex digits required in a block hash
    #[arg(
        long,
        env = "LONGCHAIN_DIFFICULTY",
        default_value_t = DEFAULT_DIFFICULTY,
        value_parser = parse_difficulty
    )]
    difficulty: usize,

    /// Timeout for fetching one peer's chain, in seconds
    #[arg(long, env = "LONGCHAIN_PEER_TIMEOUT_SECS", default_value_t = DEFAULT_PEER_TIMEOUT_SECS)]
    peer_timeout_secs: u64,

    /// Search proofs on every core
    #[arg(long, env = "LONGCHAIN_PARALLEL_MINING")]
    parallel_mining: bool,

    /// Peer to register at startup (repeatable, or comma separated)
    #[arg(long = "peer", env = "LONGCHAIN_PEERS", value_delimiter = ',')]
    peers: Vec<String>,
}

fn parse_difficulty(raw: &str) -> Result<usize, String> {
    let zeros: usize = raw.parse().map_err(|err| format!("{err}"))?;
    Difficulty::try_new(zeros)
        .map(|difficulty| difficulty.leading_zeros())
        .map_err(|err| err.to_string())
}

impl Args {
    fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig::default()
            .with_difficulty(Difficulty::new(self.difficulty))
            .with_parallel_mining(self.parallel_mining)
            .with_peer_timeout(Duration::from_secs(self.peer_timeout_secs))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let args = Args::parse();
    let config = args.ledger_config();
    let node_id = NodeId::generate();
    info!(node = %node_id, difficulty = args.difficulty, "initialising node");

    let peer_client = HttpPeerClient::new(config.peer_timeout)?;
    let ledger = tokio::task::spawn_blocking(move || Ledger::new(node_id, config)).await??;
    let ledger = SharedLedger::new(ledger, Arc::new(peer_client));
    if !args.peers.is_empty() {
        ledger.register_nodes(&args.peers).await?;
    }

    let app = routes::router(ledger);

    let addr: SocketAddr = args.listen.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("longchain-node listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
