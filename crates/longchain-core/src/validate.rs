//! Full-chain validation.
//!
//! A chain is valid when every block carries a proof that satisfies the
//! difficulty, its stored hash is the digest of its content, indices count up
//! from 1, and each block's `previous_hash` is the hash of its predecessor.
//! The genesis block is only exempt from the linkage check.

use crate::{pow::Difficulty, Block, LedgerError, Result};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("chain is empty")]
    EmptyChain,
    #[error("block at position {position} has index {index}")]
    BadIndex { position: usize, index: u64 },
    #[error("block {index}: proof {proof} does not satisfy the difficulty")]
    InvalidProof { index: u64, proof: u64 },
    #[error("block {index}: stored hash does not match its content")]
    HashMismatch { index: u64 },
    #[error("block {index}: previous hash does not match the preceding block")]
    BrokenLink { index: u64 },
    #[error("block {index}: {source}")]
    Digest {
        index: u64,
        #[source]
        source: LedgerError,
    },
}

/// A chain that passed [`validate`]. Only this type can replace a ledger's chain.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedChain(Vec<Block>);

impl ValidatedChain {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.0
    }
}

/// Whether the block's proof, recomputed over its content, meets `difficulty`.
pub fn check_proof(block: &Block, difficulty: Difficulty) -> Result<bool> {
    Ok(difficulty.accepts(&block.digest()?))
}

/// Checks one block in isolation: proof validity and hash/content agreement.
pub fn check_block(block: &Block, difficulty: Difficulty) -> std::result::Result<(), ValidationError> {
    let digest = block.digest().map_err(|source| ValidationError::Digest {
        index: block.index,
        source,
    })?;
    if !difficulty.accepts(&digest) {
        return Err(ValidationError::InvalidProof {
            index: block.index,
            proof: block.proof,
        });
    }
    if digest != block.hash {
        return Err(ValidationError::HashMismatch { index: block.index });
    }
    Ok(())
}

fn check_chain(chain: &[Block], difficulty: Difficulty) -> std::result::Result<(), ValidationError> {
    if chain.is_empty() {
        return Err(ValidationError::EmptyChain);
    }
    for (position, block) in chain.iter().enumerate() {
        if block.index != position as u64 + 1 {
            return Err(ValidationError::BadIndex {
                position,
                index: block.index,
            });
        }
        check_block(block, difficulty)?;
        if position > 0 && block.previous_hash != chain[position - 1].hash {
            return Err(ValidationError::BrokenLink { index: block.index });
        }
    }
    Ok(())
}

pub fn validate(
    chain: Vec<Block>,
    difficulty: Difficulty,
) -> std::result::Result<ValidatedChain, ValidationError> {
    check_chain(&chain, difficulty)?;
    Ok(ValidatedChain(chain))
}

pub fn is_valid(chain: &[Block], difficulty: Difficulty) -> bool {
    check_chain(chain, difficulty).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pow, Transaction};

    const EASY: Difficulty = Difficulty::new(1);

    fn mined_chain(len: usize) -> Vec<Block> {
        let mut genesis = Block::genesis();
        pow::solve(&mut genesis, EASY).unwrap();
        let mut chain = vec![genesis];
        while chain.len() < len {
            let last = chain.last().unwrap();
            let mut block = Block::new(
                last.index + 1,
                last.hash.clone(),
                vec![Transaction::new("a", "b", chain.len() as f64)],
            );
            pow::solve(&mut block, EASY).unwrap();
            chain.push(block);
        }
        chain
    }

    #[test]
    fn mined_chain_is_valid() {
        let chain = mined_chain(4);
        assert!(is_valid(&chain, EASY));
        let validated = validate(chain.clone(), EASY).unwrap();
        assert_eq!(validated.len(), 4);
        assert_eq!(validated.into_blocks(), chain);
    }

    #[test]
    fn genesis_alone_is_valid() {
        assert!(is_valid(&mined_chain(1), EASY));
    }

    #[test]
    fn empty_chain_is_invalid() {
        assert!(!is_valid(&[], EASY));
        assert!(matches!(validate(vec![], EASY), Err(ValidationError::EmptyChain)));
    }

    #[test]
    fn unmined_genesis_is_invalid() {
        let mut genesis = Block::genesis();
        pow::solve(&mut genesis, EASY).unwrap();
        genesis.hash.clear();
        assert!(!is_valid(&[genesis], EASY));
    }

    #[test]
    fn tampered_transaction_breaks_proof() {
        let mut chain = mined_chain(3);
        chain[1].transactions[0].amount = 1_000.0;
        let block = &chain[1];

        let err = check_block(block, Difficulty::new(64)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidProof { index: 2, .. }));
        // even when the proof happens to pass, the stored hash no longer binds
        assert_ne!(block.digest().unwrap(), block.hash);
        assert!(check_block(block, EASY).is_err());
        assert!(!is_valid(&chain, EASY));
    }

    #[test]
    fn replaced_previous_hash_breaks_chain() {
        let mut chain = mined_chain(4);
        chain[2].previous_hash = "not-a-hash".into();

        assert!(!is_valid(&chain, EASY));
        for (i, block) in chain.iter().enumerate() {
            if i != 2 {
                assert!(check_block(block, EASY).is_ok());
            }
        }
    }

    #[test]
    fn remined_block_with_foreign_link_is_rejected() {
        let mut chain = mined_chain(3);
        let block = &mut chain[2];
        block.previous_hash = "0".repeat(64);
        pow::solve(block, EASY).unwrap();
        assert!(check_block(&chain[2], EASY).is_ok());

        let err = validate(chain, EASY).unwrap_err();
        assert!(matches!(err, ValidationError::BrokenLink { index: 3 }));
    }

    #[test]
    fn out_of_sequence_index_is_rejected() {
        let mut chain = mined_chain(2);
        let block = &mut chain[1];
        block.index = 7;
        pow::solve(block, EASY).unwrap();

        let err = validate(chain, EASY).unwrap_err();
        assert!(matches!(err, ValidationError::BadIndex { position: 1, index: 7 }));
    }

    #[test]
    fn forged_hash_is_rejected() {
        let mut chain = mined_chain(2);
        chain[1].hash = format!("0{}", "f".repeat(63));
        let err = check_block(&chain[1], EASY).unwrap_err();
        assert!(matches!(err, ValidationError::HashMismatch { index: 2 }));
    }

    #[test]
    fn higher_difficulty_rejects_easy_chain() {
        let chain = mined_chain(3);
        let strict = Difficulty::new(64);
        assert!(!is_valid(&chain, strict));
    }
}
