use crate::{
    mine,
    pow::Difficulty,
    validate::{self, ValidatedChain},
    Block, LedgerConfig, LedgerError, NodeId, Result, Transaction,
};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// The chain, the pending pool and the known peers of one node.
///
/// The chain always holds at least the genesis block and is valid at rest.
/// `Ledger` itself is not synchronized; see [`crate::SharedLedger`].
#[derive(Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    peers: BTreeSet<String>,
    node_id: NodeId,
    config: LedgerConfig,
}

impl Ledger {
    /// Creates a ledger whose chain holds a freshly mined genesis block.
    pub fn new(node_id: NodeId, config: LedgerConfig) -> Result<Self> {
        let mut genesis = Block::genesis();
        mine::run(&mut genesis, &config)?;
        info!(node = %node_id, hash = %genesis.hash, "genesis block created");
        Ok(Self {
            chain: vec![genesis],
            pending: Vec::new(),
            peers: BTreeSet::new(),
            node_id,
            config,
        })
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("ledger chain always holds the genesis block")
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn peers(&self) -> &BTreeSet<String> {
        &self.peers
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn difficulty(&self) -> Difficulty {
        self.config.difficulty
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false once constructed; the genesis block is never removed.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Buffers `tx` and returns the index of the block that will carry it.
    pub fn add_transaction(&mut self, tx: Transaction) -> u64 {
        self.pending.push(tx);
        self.last_block().index + 1
    }

    /// Returns false if the address was already known.
    pub fn register_node(&mut self, address: impl Into<String>) -> bool {
        self.peers.insert(address.into())
    }

    /// The next unmined block: every pending transaction followed by the
    /// miner's reward. Also returns how many pending transactions it consumes.
    pub fn candidate_block(&self) -> (Block, usize) {
        let mut transactions = self.pending.clone();
        transactions.push(Transaction::reward(&self.node_id));
        let last = self.last_block();
        (
            Block::new(last.index + 1, last.hash.clone(), transactions),
            self.pending.len(),
        )
    }

    /// Appends a solved candidate and drops the `consumed` pending
    /// transactions it carries.
    pub fn append_block(&mut self, block: Block, consumed: usize) -> Result<()> {
        let last = self.last_block();
        if block.previous_hash != last.hash {
            return Err(LedgerError::StaleCandidate {
                expected: block.previous_hash,
                found: last.hash.clone(),
            });
        }
        if block.index != last.index + 1 {
            return Err(LedgerError::InvalidBlock(format!(
                "index {} does not follow {}",
                block.index, last.index
            )));
        }
        validate::check_block(&block, self.config.difficulty)
            .map_err(|err| LedgerError::InvalidBlock(err.to_string()))?;

        self.chain.push(block);
        let consumed = consumed.min(self.pending.len());
        self.pending.drain(..consumed);
        Ok(())
    }

    /// Mines the pending pool into a new block on the calling thread.
    pub fn mine(&mut self) -> Result<Block> {
        let (mut candidate, consumed) = self.candidate_block();
        mine::run(&mut candidate, &self.config)?;
        self.append_block(candidate.clone(), consumed)?;
        Ok(candidate)
    }

    /// Replaces the chain with the longest candidate strictly longer than it.
    /// Equal lengths keep the earlier candidate. Returns whether it replaced.
    pub fn adopt_longest(&mut self, candidates: Vec<(String, ValidatedChain)>) -> bool {
        let mut best: Option<(String, ValidatedChain)> = None;
        for (peer, chain) in candidates {
            let floor = best
                .as_ref()
                .map_or(self.chain.len(), |(_, current)| current.len());
            if chain.len() > floor {
                best = Some((peer, chain));
            } else {
                debug!(peer = %peer, length = chain.len(), floor, "candidate chain not longer");
            }
        }

        match best {
            Some((peer, chain)) => {
                info!(
                    peer = %peer,
                    old_length = self.chain.len(),
                    new_length = chain.len(),
                    "local chain replaced"
                );
                self.chain = chain.into_blocks();
                true
            }
            None => false,
        }
    }
}
