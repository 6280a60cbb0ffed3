/// Tunables for the [super::MemoryManager].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// How many chunks each newly created pool is partitioned into. A pool
    /// never grows, so this is also the number of resources of one size
    /// class that can exist before another request fails.
    pub chunks_per_pool: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            chunks_per_pool: 10,
        }
    }
}
