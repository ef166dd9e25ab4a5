use std::hash::{Hash, Hasher};

/// Hash function implementation for shard assignment.
///
/// Both variants are seeded with fixed keys, so a key lands in the same shard
/// in every map built with the same configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShardHasher {
    /// AHash implementation (default, fast and well-distributed).
    #[default]
    AHash,
    /// FxHash implementation (faster but potentially less distributed).
    #[cfg(feature = "fxhash")]
    FxHash,
}

impl ShardHasher {
    /// Hash a key to determine which shard it belongs to.
    pub fn hash_key(&self, key: &str) -> u64 {
        match self {
            ShardHasher::AHash => {
                let mut hasher = ahash::AHasher::default();
                key.hash(&mut hasher);
                hasher.finish()
            }
            #[cfg(feature = "fxhash")]
            ShardHasher::FxHash => {
                let mut hasher = fxhash::FxHasher::default();
                key.hash(&mut hasher);
                hasher.finish()
            }
        }
    }
}
