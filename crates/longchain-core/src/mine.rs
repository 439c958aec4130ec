use crate::{
    pow::{self, Difficulty},
    Block, LedgerConfig, LedgerError, Result,
};
use rayon::prelude::*;
use tracing::info;

/// Searches proofs in parallel until the block digest satisfies `difficulty`.
/// Always yields the lowest accepted proof, the same one `pow::solve` finds.
pub fn solve_parallel(block: &mut Block, difficulty: Difficulty) -> Result<u64> {
    difficulty.reachable()?;
    let template = &*block;

    // Rayon splits the range across threads; find_map_first keeps the leftmost hit.
    let found = (0u64..u64::MAX)
        .into_par_iter()
        .find_map_first(|proof| match template.digest_with_proof(proof) {
            Ok(digest) if difficulty.accepts(&digest) => Some(Ok((proof, digest))),
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        })
        .ok_or(LedgerError::ProofSpaceExhausted)??;

    let (proof, digest) = found;
    block.proof = proof;
    block.hash = digest;
    Ok(proof)
}

/// Runs the proof search selected by `config` on the calling thread.
pub fn run(block: &mut Block, config: &LedgerConfig) -> Result<u64> {
    let proof = if config.parallel_mining {
        solve_parallel(block, config.difficulty)?
    } else {
        pow::solve(block, config.difficulty)?
    };

    info!(
        "Mined block {} with proof {} and hash {}",
        block.index, proof, block.hash
    );
    Ok(proof)
}
