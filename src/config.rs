use crate::error::Error;
use crate::hash::ShardHasher;

/// Number of shards used when no shard count is configured.
pub const DEFAULT_SHARD_COUNT: usize = 32;

/// Which hash function to use for shard assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFunction {
    /// Use ahash (default, fast and well-distributed).
    #[default]
    AHash,
    /// Use fxhash (faster but potentially less distributed).
    #[cfg(feature = "fxhash")]
    FxHash,
}

/// Configuration for a ShardMap instance.
///
/// Nested maps created inside an entry inherit the shard count and hash
/// function of their parent but start without a preallocated capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub(crate) shard_count: usize,
    pub(crate) hash_function: HashFunction,
    pub(crate) capacity_per_shard: Option<usize>,
}

impl Config {
    /// Create a new config with defaults (32 shards, ahash).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of shards. Must be a power of two and greater than 0.
    pub fn shard_count(mut self, count: usize) -> Result<Self, Error> {
        if count == 0 || !count.is_power_of_two() {
            return Err(Error::InvalidShardCount);
        }
        self.shard_count = count;
        Ok(self)
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.hash_function = hash_fn;
        self
    }

    /// Set initial capacity per shard. Total capacity will be approximately
    /// `capacity_per_shard * shard_count`. Omitted by default (HashMap default).
    pub fn capacity_per_shard(mut self, capacity: usize) -> Self {
        self.capacity_per_shard = Some(capacity);
        self
    }

    /// Number of shards this config produces.
    pub fn shards(&self) -> usize {
        self.shard_count
    }

    /// Shard index for `key`. Stable for the lifetime of the process.
    #[inline]
    pub fn shard_of(&self, key: &str) -> usize {
        let hash = create_hasher(self.hash_function).hash_key(key);
        (hash as usize) & (self.shard_count - 1)
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.shard_count == 0 || !self.shard_count.is_power_of_two() {
            return Err(Error::InvalidShardCount);
        }
        Ok(())
    }

    /// Config for a map nested inside an entry of a map using `self`.
    pub(crate) fn nested(&self) -> Self {
        Self {
            capacity_per_shard: None,
            ..*self
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            hash_function: HashFunction::AHash,
            capacity_per_shard: None,
        }
    }
}

/// Builder for creating a ShardMap with custom configuration.
#[derive(Debug, Default)]
pub struct ShardMapBuilder {
    config: Config,
}

impl ShardMapBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the number of shards. Must be a power of two and greater than 0.
    pub fn shard_count(mut self, count: usize) -> Result<Self, Error> {
        self.config = self.config.shard_count(count)?;
        Ok(self)
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.config = self.config.hash_function(hash_fn);
        self
    }

    /// Set initial capacity per shard. Total capacity ≈ `capacity_per_shard * shard_count`.
    pub fn capacity_per_shard(mut self, capacity: usize) -> Self {
        self.config = self.config.capacity_per_shard(capacity);
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Build a ShardMap with the configured settings.
    pub fn build<T>(self) -> Result<crate::ShardMap<T>, Error> {
        crate::ShardMap::with_config(self.config)
    }
}

/// Create a hash function instance based on the configuration.
pub(crate) fn create_hasher(hash_fn: HashFunction) -> ShardHasher {
    match hash_fn {
        HashFunction::AHash => ShardHasher::AHash,
        #[cfg(feature = "fxhash")]
        HashFunction::FxHash => ShardHasher::FxHash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_32_shards() {
        assert_eq!(Config::default().shards(), 32);
        assert_eq!(ShardMapBuilder::new().config().shards(), DEFAULT_SHARD_COUNT);
    }

    #[test]
    fn test_shard_of_is_in_range_and_stable() {
        let config = Config::new().shard_count(8).unwrap();
        for i in 0..200 {
            let key = format!("key_{}", i);
            let idx = config.shard_of(&key);
            assert!(idx < 8);
            assert_eq!(idx, config.shard_of(&key));
        }
    }

    #[test]
    fn test_nested_drops_capacity() {
        let config = Config::new().capacity_per_shard(128);
        let nested = config.nested();
        assert_eq!(nested.capacity_per_shard, None);
        assert_eq!(nested.shard_count, config.shard_count);
    }
}
