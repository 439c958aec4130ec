use crate::constants::DEFAULT_PEER_TIMEOUT_SECS;
use crate::pow::Difficulty;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct LedgerConfig {
    pub difficulty: Difficulty,
    /// Spread the proof search over the rayon pool instead of one thread.
    pub parallel_mining: bool,
    /// Upper bound for a single peer chain fetch.
    pub peer_timeout: Duration,
}

impl LedgerConfig {
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_parallel_mining(mut self, parallel: bool) -> Self {
        self.parallel_mining = parallel;
        self
    }

    pub fn with_peer_timeout(mut self, timeout: Duration) -> Self {
        self.peer_timeout = timeout;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            parallel_mining: false,
            peer_timeout: Duration::from_secs(DEFAULT_PEER_TIMEOUT_SECS),
        }
    }
}
