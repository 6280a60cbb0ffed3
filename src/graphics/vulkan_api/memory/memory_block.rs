use {
    crate::graphics::vulkan_api::{PoolAllocator, VulkanError},
    ash::vk,
    std::sync::Arc,
};

/// One chunk of a [PoolAllocator]'s device memory.
///
/// A block can only be created by its pool and can't be copied. Dropping the
/// block returns its chunk to the pool's free list, so the chunk is never
/// leaked and never handed out twice. The block keeps its pool alive, which
/// means the pool's device memory outlives every block carved from it.
pub struct MemoryBlock {
    memory: vk::DeviceMemory,
    offset_in_bytes: vk::DeviceSize,
    memory_type_index: u32,
    pool: Arc<PoolAllocator>,
}

// public api
impl MemoryBlock {
    /// The device memory which contains this block.
    ///
    /// # Safety
    ///
    /// Unsafe because ownership is not transferred. The memory is shared
    /// with every other block from the same pool and is freed by the pool.
    pub unsafe fn device_memory(&self) -> vk::DeviceMemory {
        self.memory
    }

    /// The block's offset from the start of the device memory. Always a
    /// multiple of the pool's alignment.
    pub fn offset_in_bytes(&self) -> vk::DeviceSize {
        self.offset_in_bytes
    }

    /// The size of the block, which is the pool's chunk size.
    pub fn size_in_bytes(&self) -> vk::DeviceSize {
        self.pool.chunk_size()
    }

    pub fn memory_type_index(&self) -> u32 {
        self.memory_type_index
    }

    /// The pool this block belongs to.
    pub fn pool(&self) -> &Arc<PoolAllocator> {
        &self.pool
    }

    /// Copy bytes into the block through a temporary host mapping.
    ///
    /// # Safety
    ///
    /// Unsafe because the caller must ensure no device operations read or
    /// write the affected range while the copy happens.
    pub unsafe fn write_bytes(
        &self,
        offset_in_bytes: vk::DeviceSize,
        data: &[u8],
    ) -> Result<(), VulkanError> {
        self.copy_from(offset_in_bytes, data.as_ptr(), data.len())
    }

    /// Copy `len` raw bytes starting at `src` into the block.
    ///
    /// # Safety
    ///
    /// Unsafe because:
    ///   - `src` must be valid for reads of `len` bytes
    ///   - no device operations may use the affected range during the copy
    pub(crate) unsafe fn copy_from(
        &self,
        offset_in_bytes: vk::DeviceSize,
        src: *const u8,
        len: usize,
    ) -> Result<(), VulkanError> {
        let len_in_bytes = len as vk::DeviceSize;
        let size = self.size_in_bytes();
        if offset_in_bytes
            .checked_add(len_in_bytes)
            .map_or(true, |end| end > size)
        {
            return Err(VulkanError::WriteOutOfBounds {
                offset: offset_in_bytes,
                len: len_in_bytes,
                size,
            });
        }
        self.pool
            .copy_into(self.offset_in_bytes + offset_in_bytes, src, len)
    }
}

// internal api
impl MemoryBlock {
    /// Only the pool may mint blocks, and only for chunk boundaries which are
    /// currently absent from its free list.
    pub(super) fn new(
        pool: Arc<PoolAllocator>,
        memory: vk::DeviceMemory,
        offset_in_bytes: vk::DeviceSize,
        memory_type_index: u32,
    ) -> Self {
        Self {
            memory,
            offset_in_bytes,
            memory_type_index,
            pool,
        }
    }
}

impl Drop for MemoryBlock {
    fn drop(&mut self) {
        self.pool.reclaim(self.offset_in_bytes);
    }
}

impl std::fmt::Debug for MemoryBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBlock")
            .field("memory", &self.memory)
            .field("offset_in_bytes", &self.offset_in_bytes)
            .field("size_in_bytes", &self.size_in_bytes())
            .field("memory_type_index", &self.memory_type_index)
            .finish()
    }
}
