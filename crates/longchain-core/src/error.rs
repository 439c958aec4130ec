use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("block serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid block: {0}")]
    InvalidBlock(String),
    #[error("stale candidate: built on {expected}, chain tip is now {found}")]
    StaleCandidate { expected: String, found: String },
    #[error("malformed peer address `{0}`")]
    MalformedAddress(String),
    #[error("difficulty {requested} is unreachable, a hash has only {max} hex digits")]
    UnreachableDifficulty { requested: usize, max: usize },
    #[error("proof space exhausted")]
    ProofSpaceExhausted,
    #[error("mining worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
