use {
    crate::graphics::vulkan_api::{
        sharing_mode_for, MemoryBlock, MemoryDevice, MemoryManager, Queue,
        VulkanError,
    },
    ash::vk,
    scopeguard::ScopeGuard,
    std::{mem::ManuallyDrop, sync::Arc},
};

/// A Vulkan buffer bound to a chunk of pooled device memory.
///
/// Creating the buffer creates the Vulkan resource, finds a pool for its
/// memory requirements, draws a block from the pool and binds it. Dropping
/// the buffer destroys the resource and then returns the block to the pool.
/// Wrap the buffer in an Arc to share it.
pub struct Buffer {
    buffer: vk::Buffer,
    size_in_bytes: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    sharing_mode: vk::SharingMode,
    block: ManuallyDrop<MemoryBlock>,
    device: Arc<dyn MemoryDevice>,
}

impl Buffer {
    /// Create a buffer used by a single queue family. The memory is host
    /// visible and host coherent so it can be written with write_data.
    pub fn new(
        memory: &MemoryManager,
        size_in_bytes: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    ) -> Result<Self, VulkanError> {
        Self::new_shared(memory, size_in_bytes, usage, &[])
    }

    /// Create a host visible buffer which can be used concurrently by every
    /// queue in `queues`.
    pub fn new_shared(
        memory: &MemoryManager,
        size_in_bytes: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        queues: &[Queue],
    ) -> Result<Self, VulkanError> {
        Self::with_memory_properties(
            memory,
            size_in_bytes,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE
                | vk::MemoryPropertyFlags::HOST_COHERENT,
            queues,
        )
    }

    /// Create a buffer whose memory supports every flag in `properties`.
    ///
    /// Pools are keyed by size class alone, so buffers of one size class
    /// all live in the memory type chosen for the first of them. A
    /// HOST_VISIBLE staging buffer and a DEVICE_LOCAL buffer of the same
    /// size class can't coexist: whichever comes second fails with
    /// IncompatiblePool. Give staging buffers a distinct size to keep them
    /// in their own pool.
    pub fn with_memory_properties(
        memory: &MemoryManager,
        size_in_bytes: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
        queues: &[Queue],
    ) -> Result<Self, VulkanError> {
        let (sharing_mode, queue_family_indices) = sharing_mode_for(queues);
        let create_info = vk::BufferCreateInfo {
            size: size_in_bytes,
            usage,
            sharing_mode,
            queue_family_index_count: queue_family_indices.len() as u32,
            p_queue_family_indices: queue_family_indices.as_ptr(),
            ..Default::default()
        };
        // safe because the queue family indices outlive the call
        unsafe { Self::with_create_info(memory, &create_info, properties) }
    }

    /// Create a buffer from a raw create info.
    ///
    /// Any failure after the Vulkan buffer exists destroys the buffer and
    /// returns its block (if one was drawn) before the error is returned.
    ///
    /// # Safety
    ///
    /// Unsafe because every pointer in `create_info` must be valid.
    pub unsafe fn with_create_info(
        memory: &MemoryManager,
        create_info: &vk::BufferCreateInfo,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<Self, VulkanError> {
        let device = memory.device()?;

        let buffer = unsafe { device.create_buffer(create_info)? };
        let buffer = scopeguard::guard(buffer, |buffer| {
            log::debug!("Destroying buffer {:?} which never got memory", buffer);
            unsafe { device.destroy_buffer(buffer) }
        });

        let requirements =
            unsafe { device.get_buffer_memory_requirements(*buffer) };
        let pool = memory.request_pool_for(&requirements, properties)?;
        let block = pool.allocate(requirements.size)?;

        // On failure the block is dropped here, which returns it to the pool.
        unsafe {
            device.bind_buffer_memory(
                *buffer,
                block.device_memory(),
                block.offset_in_bytes(),
            )?;
        }

        let buffer = ScopeGuard::into_inner(buffer);
        log::trace!("Bound buffer {:?} to {:?}", buffer, block);

        Ok(Self {
            buffer,
            size_in_bytes: create_info.size,
            usage: create_info.usage,
            sharing_mode: create_info.sharing_mode,
            block: ManuallyDrop::new(block),
            device,
        })
    }

    /// Copy `data` into the buffer starting at `offset_in_bytes`.
    ///
    /// # Safety
    ///
    /// Unsafe because:
    ///   - the caller must ensure the GPU is not reading or writing the
    ///     affected range
    ///   - T should be a plain `#[repr(C)]` type so its bytes are
    ///     meaningful to shaders. Padding bytes are copied as they are.
    pub unsafe fn write_data<T: Copy>(
        &self,
        offset_in_bytes: vk::DeviceSize,
        data: &[T],
    ) -> Result<(), VulkanError> {
        let size_in_bytes = std::mem::size_of_val(data);
        let len = size_in_bytes as vk::DeviceSize;
        if offset_in_bytes
            .checked_add(len)
            .map_or(true, |end| end > self.size_in_bytes)
        {
            return Err(VulkanError::WriteOutOfBounds {
                offset: offset_in_bytes,
                len,
                size: self.size_in_bytes,
            });
        }
        unsafe {
            self.block.copy_from(
                offset_in_bytes,
                data.as_ptr() as *const u8,
                size_in_bytes,
            )
        }
    }

    /// Destroy the buffer and return its memory to the pool right now.
    /// Dropping the buffer does the same thing.
    pub fn release(self) {
        drop(self)
    }

    /// The raw Vulkan buffer handle.
    ///
    /// # Safety
    ///
    /// Unsafe because ownership is not transferred.
    pub unsafe fn raw(&self) -> vk::Buffer {
        self.buffer
    }

    /// The block of device memory bound to this buffer.
    pub fn memory_block(&self) -> &MemoryBlock {
        &self.block
    }

    /// The device memory bound to this buffer.
    ///
    /// # Safety
    ///
    /// Unsafe because the memory is shared with the rest of the pool.
    pub unsafe fn device_memory(&self) -> vk::DeviceMemory {
        unsafe { self.block.device_memory() }
    }

    /// The buffer's offset into its device memory.
    pub fn offset_in_bytes(&self) -> vk::DeviceSize {
        self.block.offset_in_bytes()
    }

    /// The size requested when the buffer was created. The block bound to
    /// the buffer may be larger.
    pub fn size_in_bytes(&self) -> vk::DeviceSize {
        self.size_in_bytes
    }

    pub fn usage(&self) -> vk::BufferUsageFlags {
        self.usage
    }

    pub fn sharing_mode(&self) -> vk::SharingMode {
        self.sharing_mode
    }
}

impl Drop for Buffer {
    /// # Safety
    ///
    /// The application must ensure no Vulkan Device operations reference this
    /// buffer when it is dropped.
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer);
        }

        // safe because the block is never touched again
        let block = unsafe { ManuallyDrop::take(&mut self.block) };
        let pool = Arc::clone(block.pool());
        pool.free(block);
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("buffer", &self.buffer)
            .field("size_in_bytes", &self.size_in_bytes)
            .field("usage", &self.usage)
            .field("sharing_mode", &self.sharing_mode)
            .field("block", &*self.block)
            .finish()
    }
}
