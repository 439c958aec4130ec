use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod mine;
pub mod peer;
pub mod service;
pub mod validate;

pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use identity::NodeId;
pub use ledger::Ledger;
pub use peer::{ChainResponse, HttpPeerClient, PeerClient, PeerError};
pub use pow::Difficulty;
pub use service::SharedLedger;
pub use validate::{ValidatedChain, ValidationError};

use constants::{GENESIS_PREVIOUS_HASH, MINING_REWARD, REWARD_SENDER};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: f64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: f64) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
        }
    }

    /// The fixed reward credited to `miner` for every mined block.
    pub fn reward(miner: &NodeId) -> Self {
        Self::new(REWARD_SENDER, miner.as_str(), MINING_REWARD)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub time_stamp: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub hash: String,
    pub previous_hash: String,
}

/// What gets hashed: a block with its hash field forced empty.
/// Field names and order must stay identical to `Block`.
#[derive(Serialize)]
struct HashInput<'a> {
    index: u64,
    time_stamp: u64,
    transactions: &'a [Transaction],
    proof: u64,
    hash: &'a str,
    previous_hash: &'a str,
}

impl Block {
    /// An unmined candidate stamped with the current time.
    pub fn new(index: u64, previous_hash: impl Into<String>, transactions: Vec<Transaction>) -> Self {
        Self {
            index,
            time_stamp: now_secs(),
            transactions,
            proof: 0,
            hash: String::new(),
            previous_hash: previous_hash.into(),
        }
    }

    pub fn genesis() -> Self {
        Self::new(1, GENESIS_PREVIOUS_HASH, Vec::new())
    }

    pub fn is_mined(&self) -> bool {
        !self.hash.is_empty()
    }

    /// Hex SHA-256 of the block's JSON encoding with `hash` cleared.
    pub fn digest(&self) -> Result<String> {
        self.digest_with_proof(self.proof)
    }

    /// Same as [`Block::digest`] but as if `proof` were stored in the block.
    pub fn digest_with_proof(&self, proof: u64) -> Result<String> {
        let input = HashInput {
            index: self.index,
            time_stamp: self.time_stamp,
            transactions: &self.transactions,
            proof,
            hash: "",
            previous_hash: &self.previous_hash,
        };
        let bytes = serde_json::to_vec(&input)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

pub mod pow {
    use super::{Block, Result};
    use crate::constants::{DEFAULT_DIFFICULTY, HASH_HEX_SIZE};
    use crate::LedgerError;

    /// Difficulty predicate: the hash must start with this many `'0'` hex digits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Difficulty(usize);

    impl Difficulty {
        /// Unchecked; see [`Difficulty::try_new`] for untrusted input.
        pub const fn new(leading_zeros: usize) -> Self {
            Self(leading_zeros)
        }

        pub fn try_new(leading_zeros: usize) -> Result<Self> {
            Self(leading_zeros).reachable()
        }

        /// Errors when no digest can have this many leading zeros.
        pub fn reachable(self) -> Result<Self> {
            if self.0 > HASH_HEX_SIZE {
                return Err(LedgerError::UnreachableDifficulty {
                    requested: self.0,
                    max: HASH_HEX_SIZE,
                });
            }
            Ok(self)
        }

        pub fn leading_zeros(&self) -> usize {
            self.0
        }

        pub fn accepts(&self, hash: &str) -> bool {
            leading_zero_digits(hash) >= self.0
        }
    }

    impl Default for Difficulty {
        fn default() -> Self {
            Self(DEFAULT_DIFFICULTY)
        }
    }

    pub fn leading_zero_digits(hash: &str) -> usize {
        hash.bytes().take_while(|b| *b == b'0').count()
    }

    /// Try proofs 0, 1, 2, ... until the block's digest satisfies `difficulty`,
    /// then store the winning proof and hash in the block.
    pub fn solve(block: &mut Block, difficulty: Difficulty) -> Result<u64> {
        difficulty.reachable()?;
        let mut proof = 0u64;
        loop {
            let digest = block.digest_with_proof(proof)?;
            if difficulty.accepts(&digest) {
                block.proof = proof;
                block.hash = digest;
                return Ok(proof);
            }
            proof = proof.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HASH_HEX_SIZE;

    fn sample_block() -> Block {
        Block {
            index: 2,
            time_stamp: 1_600_000_200,
            transactions: vec![
                Transaction::new("Alice", "Bob", 10.0),
                Transaction::new("Bob", "Charlie", 2.5),
            ],
            proof: 0,
            hash: String::new(),
            previous_hash: "00ab".to_string(),
        }
    }

    #[test]
    fn transaction_serialization_example() {
        let tx = Transaction::new("Alice", "Bob", 10.5);
        let json = serde_json::to_string(&tx).unwrap();
        assert_eq!(json, r#"{"sender":"Alice","receiver":"Bob","amount":10.5}"#);
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, back);
    }

    #[test]
    fn block_serialization_field_order() {
        let json = serde_json::to_string(&sample_block()).unwrap();
        let order = [
            "\"index\"",
            "\"time_stamp\"",
            "\"transactions\"",
            "\"proof\"",
            "\"hash\"",
            "\"previous_hash\"",
        ];
        let positions: Vec<usize> = order.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
    }

    #[test]
    fn digest_matches_block_with_hash_cleared() {
        let mut block = sample_block();
        block.hash = "deadbeef".into();

        let mut cleared = block.clone();
        cleared.hash.clear();
        let expected = hex::encode(Sha256::digest(serde_json::to_vec(&cleared).unwrap()));

        assert_eq!(block.digest().unwrap(), expected);
        assert_eq!(block.digest().unwrap().len(), HASH_HEX_SIZE);
    }

    #[test]
    fn digest_is_deterministic() {
        let block = sample_block();
        assert_eq!(block.digest().unwrap(), block.digest().unwrap());
        assert_eq!(block.digest().unwrap(), block.clone().digest().unwrap());
    }

    #[test]
    fn digest_changes_with_proof() {
        let mut block = sample_block();
        let before = block.digest().unwrap();
        block.proof += 1;
        assert_ne!(before, block.digest().unwrap());
        assert_eq!(block.digest().unwrap(), sample_block().digest_with_proof(1).unwrap());
    }

    #[test]
    fn digest_binds_transaction_order() {
        let block = sample_block();
        let mut swapped = block.clone();
        swapped.transactions.reverse();
        assert_ne!(block.digest().unwrap(), swapped.digest().unwrap());
    }

    #[test]
    fn genesis_block_example() {
        let genesis = Block::genesis();
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(genesis.transactions.is_empty());
        assert!(!genesis.is_mined());
        assert!(genesis.time_stamp > 0);
    }

    #[test]
    fn reward_transaction_example() {
        let miner = NodeId::from("node-a");
        let reward = Transaction::reward(&miner);
        assert_eq!(reward.sender, REWARD_SENDER);
        assert_eq!(reward.receiver, "node-a");
        assert_eq!(reward.amount, MINING_REWARD);
    }

    #[test]
    fn leading_zero_digit_examples() {
        assert_eq!(pow::leading_zero_digits("0000ab"), 4);
        assert_eq!(pow::leading_zero_digits("0a00"), 1);
        assert_eq!(pow::leading_zero_digits("f000"), 0);
        assert_eq!(pow::leading_zero_digits(""), 0);
        assert!(Difficulty::new(2).accepts("00f1"));
        assert!(!Difficulty::new(3).accepts("00f1"));
        assert_eq!(Difficulty::default().leading_zeros(), 4);
    }

    #[test]
    fn solve_terminates_at_low_difficulty() {
        let mut block = sample_block();
        let difficulty = Difficulty::new(1);
        let proof = pow::solve(&mut block, difficulty).unwrap();
        // a miss has probability 15/16 per attempt
        assert!(proof < 10_000);
        assert_eq!(block.proof, proof);
        assert!(block.is_mined());
        assert!(difficulty.accepts(&block.hash));
        assert_eq!(block.hash, block.digest().unwrap());
    }

    #[test]
    fn difficulty_beyond_digest_width_is_rejected() {
        assert_eq!(Difficulty::try_new(HASH_HEX_SIZE).unwrap().leading_zeros(), 64);
        assert!(matches!(
            Difficulty::try_new(HASH_HEX_SIZE + 1),
            Err(LedgerError::UnreachableDifficulty { requested: 65, max: 64 })
        ));

        let mut block = Block::genesis();
        let err = pow::solve(&mut block, Difficulty::new(65)).unwrap_err();
        assert!(matches!(err, LedgerError::UnreachableDifficulty { .. }));
        assert!(!block.is_mined());
    }

    #[test]
    fn solve_returns_lowest_proof() {
        let mut block = sample_block();
        let difficulty = Difficulty::new(1);
        let proof = pow::solve(&mut block, difficulty).unwrap();
        for earlier in 0..proof {
            let digest = block.digest_with_proof(earlier).unwrap();
            assert!(!difficulty.accepts(&digest));
        }
    }

    #[test]
    fn proof_validity_is_predicate_over_cleared_digest() {
        let difficulty = Difficulty::new(1);
        let mut block = sample_block();
        pow::solve(&mut block, difficulty).unwrap();
        for proof in 0..64 {
            let mut variant = block.clone();
            variant.proof = proof;
            let mut cleared = variant.clone();
            cleared.hash.clear();
            assert_eq!(
                validate::check_proof(&variant, difficulty).unwrap(),
                difficulty.accepts(&cleared.digest().unwrap())
            );
        }
    }
}
