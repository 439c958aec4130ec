pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Previous-hash sentinel carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Reserved sender of mining-reward transactions.
pub const REWARD_SENDER: &str = "0";
pub const MINING_REWARD: f64 = 1.0;

/// Leading zero hex digits a block hash needs.
pub const DEFAULT_DIFFICULTY: usize = 4;
pub const DEFAULT_PEER_TIMEOUT_SECS: u64 = 5;
