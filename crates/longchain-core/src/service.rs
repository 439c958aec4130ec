//! Concurrent access to a [`Ledger`].
//!
//! Every mutation goes through one `RwLock`. Proof search runs on the blocking
//! pool without holding the lock, and peer chains are fetched before the lock
//! is taken to apply the consensus decision.

use crate::{
    mine,
    peer::{normalize_address, PeerClient},
    validate, Block, Ledger, LedgerError, NodeId, Result, Transaction,
};
use std::sync::Arc;
use tokio::{
    sync::{Mutex, RwLock},
    task::{self, JoinSet},
};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct SharedLedger {
    ledger: Arc<RwLock<Ledger>>,
    peers: Arc<dyn PeerClient>,
    // one proof search at a time
    mining: Arc<Mutex<()>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger, peers: Arc<dyn PeerClient>) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            peers,
            mining: Arc::new(Mutex::new(())),
        }
    }

    pub async fn chain(&self) -> Vec<Block> {
        self.ledger.read().await.chain().to_vec()
    }

    pub async fn pending(&self) -> Vec<Transaction> {
        self.ledger.read().await.pending().to_vec()
    }

    pub async fn peers(&self) -> Vec<String> {
        self.ledger.read().await.peers().iter().cloned().collect()
    }

    pub async fn node_id(&self) -> NodeId {
        self.ledger.read().await.node_id().clone()
    }

    pub async fn add_transaction(&self, tx: Transaction) -> u64 {
        self.ledger.write().await.add_transaction(tx)
    }

    /// Registers every address or none: all are normalized before any insert.
    /// Returns the full peer list afterwards.
    pub async fn register_nodes<S: AsRef<str>>(&self, addresses: &[S]) -> Result<Vec<String>> {
        let normalized = addresses
            .iter()
            .map(|raw| normalize_address(raw.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut ledger = self.ledger.write().await;
        for address in normalized {
            if ledger.register_node(address.clone()) {
                info!(peer = %address, "peer registered");
            }
        }
        Ok(ledger.peers().iter().cloned().collect())
    }

    pub async fn register_node(&self, address: &str) -> Result<Vec<String>> {
        self.register_nodes(&[address]).await
    }

    /// Mines the pending pool into a new block and appends it.
    ///
    /// If the chain is replaced while the proof search runs, the candidate is
    /// rebuilt on the new tip and mined again.
    pub async fn mine(&self) -> Result<Block> {
        let _guard = self.mining.lock().await;
        loop {
            let (mut candidate, consumed, config) = {
                let ledger = self.ledger.read().await;
                let (candidate, consumed) = ledger.candidate_block();
                (candidate, consumed, ledger.config().clone())
            };

            let solved = task::spawn_blocking(move || -> Result<Block> {
                mine::run(&mut candidate, &config)?;
                Ok(candidate)
            })
            .await??;

            let mut ledger = self.ledger.write().await;
            match ledger.append_block(solved.clone(), consumed) {
                Ok(()) => return Ok(solved),
                Err(LedgerError::StaleCandidate { expected, found }) => {
                    warn!(
                        index = solved.index,
                        %expected,
                        %found,
                        "chain tip moved during proof search, mining again"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Longest-valid-chain consensus against every registered peer.
    ///
    /// Unreachable peers and invalid chains are skipped. Among the valid chains
    /// strictly longer than ours the longest wins; ties go to the peer that
    /// sorts first. Returns whether the local chain was replaced.
    pub async fn resolve_conflicts(&self) -> Result<bool> {
        let (peers, difficulty) = {
            let ledger = self.ledger.read().await;
            let peers: Vec<String> = ledger.peers().iter().cloned().collect();
            (peers, ledger.difficulty())
        };
        if peers.is_empty() {
            return Ok(false);
        }

        let mut fetches = JoinSet::new();
        for (order, address) in peers.into_iter().enumerate() {
            let client = Arc::clone(&self.peers);
            fetches.spawn(async move {
                let result = client.fetch_chain(&address).await;
                (order, address, result)
            });
        }

        let mut fetched = Vec::new();
        while let Some(joined) = fetches.join_next().await {
            let (order, address, result) = joined?;
            match result {
                Ok(chain) => fetched.push((order, address, chain)),
                Err(err) => warn!(peer = %address, error = %err, "skipping peer"),
            }
        }
        fetched.sort_by_key(|(order, ..)| *order);

        let local_len = self.ledger.read().await.len();
        let candidates = task::spawn_blocking(move || {
            fetched
                .into_iter()
                .filter(|(_, _, chain)| chain.len() > local_len)
                .filter_map(|(_, address, chain)| match validate::validate(chain, difficulty) {
                    Ok(valid) => Some((address, valid)),
                    Err(err) => {
                        debug!(peer = %address, error = %err, "rejecting peer chain");
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
        .await?;

        Ok(self.ledger.write().await.adopt_longest(candidates))
    }
}
