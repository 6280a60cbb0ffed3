use {
    super::{
        align_up, describe_memory_types, MemoryConfig, MemoryDevice,
        PoolAllocator,
    },
    crate::graphics::vulkan_api::VulkanError,
    ash::vk,
    std::sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Everything the manager knows once it has been started.
struct ManagerState {
    device: Arc<dyn MemoryDevice>,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    pools: Vec<Arc<PoolAllocator>>,
}

/// Finds or creates the [PoolAllocator] for each size class of resource.
///
/// There is at most one pool per (alignment, chunk size) pair. Pools are
/// shared, so every resource of the same size class draws from the same
/// device allocation.
///
/// The manager is an ordinary value. Create one, call startup() with the
/// device, and pass it by reference to every Buffer and Image constructor.
/// All methods take `&self` and are safe to call from any thread.
pub struct MemoryManager {
    config: MemoryConfig,
    state: Mutex<Option<ManagerState>>,
}

impl MemoryManager {
    /// Create a manager with the default configuration. The manager can't
    /// hand out memory until startup() is called.
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            config,
            state: Mutex::new(None),
        }
    }

    /// Capture the device and its memory properties.
    ///
    /// Starting an already started manager shuts it down first.
    pub fn startup(
        &self,
        device: Arc<dyn MemoryDevice>,
    ) -> Result<(), VulkanError> {
        let mut state = self.state();
        if state.is_some() {
            log::warn!("Memory manager restarted without being shut down");
            Self::release_pools(state.take());
        }

        log::info!("Starting up the memory manager");
        let memory_properties = device.memory_properties();
        log::debug!(
            "Available memory types: {}",
            describe_memory_types(&memory_properties)
        );

        *state = Some(ManagerState {
            device,
            memory_properties,
            pools: vec![],
        });
        Ok(())
    }

    /// Drop every pool and forget the device.
    ///
    /// A pool's device memory is freed as soon as no MemoryBlock references
    /// it, so pools with outstanding blocks stay alive until those blocks are
    /// returned.
    pub fn shutdown(&self) {
        log::info!("Shutting down the memory manager");
        Self::release_pools(self.state().take());
    }

    pub fn is_started(&self) -> bool {
        self.state().is_some()
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// The memory properties captured by startup().
    pub fn memory_properties(
        &self,
    ) -> Result<vk::PhysicalDeviceMemoryProperties, VulkanError> {
        self.state()
            .as_ref()
            .map(|state| state.memory_properties)
            .ok_or(VulkanError::DeviceNotReady)
    }

    /// The device captured by startup().
    pub fn device(&self) -> Result<Arc<dyn MemoryDevice>, VulkanError> {
        self.state()
            .as_ref()
            .map(|state| Arc::clone(&state.device))
            .ok_or(VulkanError::DeviceNotReady)
    }

    /// How many pools currently exist.
    pub fn pool_count(&self) -> usize {
        self.state()
            .as_ref()
            .map(|state| state.pools.len())
            .unwrap_or(0)
    }

    /// Get the pool for an (alignment, chunk size) pair, creating it if
    /// needed.
    ///
    /// A new pool holds `config.chunks_per_pool` chunks and uses the first
    /// memory type which supports `flags`. An existing pool is returned only
    /// if its memory type supports `flags`.
    pub fn request_pool_allocator(
        &self,
        alignment: vk::DeviceSize,
        chunk_size: vk::DeviceSize,
        flags: vk::MemoryPropertyFlags,
    ) -> Result<Arc<PoolAllocator>, VulkanError> {
        self.request_pool(alignment, chunk_size, !0, flags)
    }

    /// Get a pool which can hold a resource with the given requirements.
    ///
    /// The chunk size is the required size rounded up to the required
    /// alignment so every chunk boundary is a legal bind offset.
    pub fn request_pool_for(
        &self,
        requirements: &vk::MemoryRequirements,
        flags: vk::MemoryPropertyFlags,
    ) -> Result<Arc<PoolAllocator>, VulkanError> {
        let alignment = requirements.alignment.max(1);
        self.request_pool(
            alignment,
            align_up(requirements.size, alignment),
            requirements.memory_type_bits,
            flags,
        )
    }
}

// private api
impl MemoryManager {
    fn request_pool(
        &self,
        alignment: vk::DeviceSize,
        chunk_size: vk::DeviceSize,
        memory_type_bits: u32,
        flags: vk::MemoryPropertyFlags,
    ) -> Result<Arc<PoolAllocator>, VulkanError> {
        let mut guard = self.state();
        let state = guard.as_mut().ok_or(VulkanError::DeviceNotReady)?;

        let existing = state.pools.iter().find(|pool| {
            pool.alignment() == alignment && pool.chunk_size() == chunk_size
        });
        if let Some(pool) = existing {
            if !pool.supports(memory_type_bits, flags) {
                log::warn!(
                    "Pool {:?} can't serve flags {:?} with type bits {:#b}",
                    pool,
                    flags,
                    memory_type_bits
                );
                return Err(VulkanError::IncompatiblePool {
                    chunk_size,
                    memory_type_index: pool.memory_type_index(),
                    required_flags: flags,
                    type_bits: memory_type_bits,
                });
            }
            return Ok(Arc::clone(pool));
        }

        let initial_size = chunk_size
            .checked_mul(self.config.chunks_per_pool)
            .ok_or(VulkanError::InvalidPoolLayout {
                total_size: vk::DeviceSize::MAX,
                chunk_size,
                alignment,
            })?;
        let pool = PoolAllocator::new(
            Arc::clone(&state.device),
            &state.memory_properties,
            initial_size,
            chunk_size,
            alignment,
            memory_type_bits,
            flags,
        )?;
        state.pools.push(Arc::clone(&pool));
        Ok(pool)
    }

    fn release_pools(state: Option<ManagerState>) {
        let Some(state) = state else {
            return;
        };
        for pool in &state.pools {
            let in_use = pool.chunk_count() - pool.free_chunk_count();
            if in_use > 0 {
                log::info!(
                    "Pool {:?} still has {} blocks in use, its memory is \
                     freed when they are returned",
                    pool,
                    in_use
                );
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, Option<ManagerState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryManager {
    fn drop(&mut self) {
        if self.is_started() {
            log::warn!("Memory manager dropped without being shut down");
            self.shutdown();
        }
    }
}
