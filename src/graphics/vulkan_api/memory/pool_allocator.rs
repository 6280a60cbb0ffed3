use {
    super::{align_up, choose_memory_type, MemoryBlock, MemoryDevice},
    crate::graphics::vulkan_api::VulkanError,
    ash::vk,
    indoc::indoc,
    std::sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// A pool of equally sized chunks carved out of a single device memory
/// allocation.
///
/// The pool's capacity is fixed when it is created. Allocation and free are
/// O(1) pushes and pops on a LIFO free list. Any request which fits in one
/// chunk can be served, at the cost of wasting whatever the request doesn't
/// use.
pub struct PoolAllocator {
    alignment: vk::DeviceSize,
    chunk_size: vk::DeviceSize,
    chunk_count: u64,
    required_flags: vk::MemoryPropertyFlags,
    property_flags: vk::MemoryPropertyFlags,
    memory_type_index: u32,
    memory: vk::DeviceMemory,

    /// Offsets of every chunk which is not currently owned by a MemoryBlock.
    free_list: Mutex<Vec<vk::DeviceSize>>,

    /// Device memory can only be mapped once at a time, so host writes into
    /// any chunk of this pool are serialized here.
    map_lock: Mutex<()>,

    device: Arc<dyn MemoryDevice>,
}

// public api
impl PoolAllocator {
    /// Allocate `initial_size` bytes of device memory and partition it into
    /// `initial_size / chunk_size` chunks.
    ///
    /// The memory type is the first type allowed by `memory_type_bits` which
    /// supports every flag in `required_flags`. Any bytes beyond the last
    /// whole chunk are not allocated.
    pub fn new(
        device: Arc<dyn MemoryDevice>,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        initial_size: vk::DeviceSize,
        chunk_size: vk::DeviceSize,
        alignment: vk::DeviceSize,
        memory_type_bits: u32,
        required_flags: vk::MemoryPropertyFlags,
    ) -> Result<Arc<Self>, VulkanError> {
        let layout_is_valid = chunk_size > 0
            && alignment.is_power_of_two()
            && chunk_size % alignment == 0
            && initial_size >= chunk_size;
        if !layout_is_valid {
            return Err(VulkanError::InvalidPoolLayout {
                total_size: initial_size,
                chunk_size,
                alignment,
            });
        }

        let memory_type_index = choose_memory_type(
            memory_properties,
            memory_type_bits,
            required_flags,
        )?;
        let property_flags = memory_properties.memory_types
            [memory_type_index as usize]
            .property_flags;

        let chunk_count = initial_size / chunk_size;
        let total_size = chunk_count * chunk_size;
        let allocate_info = vk::MemoryAllocateInfo {
            allocation_size: total_size,
            memory_type_index,
            ..Default::default()
        };
        let memory = unsafe { device.allocate_memory(&allocate_info)? };

        // Reversed so the first pop hands out offset 0.
        let free_list = (0..chunk_count)
            .rev()
            .map(|chunk| chunk * chunk_size)
            .collect();

        log::debug!(
            indoc!(
                "
                Created pool allocator
                  - chunk size {} bytes, alignment {}
                  - {} chunks, {} bytes total
                  - memory type {} {:?}"
            ),
            chunk_size,
            alignment,
            chunk_count,
            total_size,
            memory_type_index,
            property_flags,
        );

        Ok(Arc::new(Self {
            alignment,
            chunk_size,
            chunk_count,
            required_flags,
            property_flags,
            memory_type_index,
            memory,
            free_list: Mutex::new(free_list),
            map_lock: Mutex::new(()),
            device,
        }))
    }

    /// Take one chunk from the free list.
    ///
    /// The pool never grows. Once every chunk is in use this fails with
    /// NoMemoryAvailableInAllocator until a block is returned.
    pub fn allocate(
        self: &Arc<Self>,
        requested_size: vk::DeviceSize,
    ) -> Result<MemoryBlock, VulkanError> {
        if requested_size > self.chunk_size {
            return Err(VulkanError::RequestTooLarge {
                requested: requested_size,
                chunk_size: self.chunk_size,
            });
        }

        let offset = self.free_list().pop().ok_or_else(|| {
            log::warn!(
                "Pool of {} byte chunks is exhausted ({} chunks in use)",
                self.chunk_size,
                self.chunk_count
            );
            VulkanError::NoMemoryAvailableInAllocator {
                chunk_size: self.chunk_size,
                chunk_count: self.chunk_count,
            }
        })?;

        log::trace!(
            "Allocated chunk at offset {} from {:?}",
            offset,
            self.memory
        );

        Ok(MemoryBlock::new(
            Arc::clone(self),
            self.memory,
            offset,
            self.memory_type_index,
        ))
    }

    /// Return a block to the pool it came from.
    ///
    /// This is equivalent to dropping the block. A block from some other
    /// pool is still returned to its own pool.
    pub fn free(&self, block: MemoryBlock) {
        if !std::ptr::eq(Arc::as_ptr(block.pool()), self) {
            log::warn!(
                "Block at offset {} was freed through a pool which does not \
                 own it, returning it to its own pool",
                block.offset_in_bytes()
            );
        }
        drop(block);
    }

    pub fn alignment(&self) -> vk::DeviceSize {
        self.alignment
    }

    pub fn chunk_size(&self) -> vk::DeviceSize {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    /// The size of the pool's device memory allocation.
    pub fn total_size(&self) -> vk::DeviceSize {
        self.chunk_size * self.chunk_count
    }

    /// How many chunks can be allocated before the pool is exhausted.
    pub fn free_chunk_count(&self) -> u64 {
        self.free_list().len() as u64
    }

    pub fn memory_type_index(&self) -> u32 {
        self.memory_type_index
    }

    /// The flags which were requested when the pool was created.
    pub fn required_flags(&self) -> vk::MemoryPropertyFlags {
        self.required_flags
    }

    /// The flags of the memory type actually backing the pool. Always a
    /// superset of required_flags.
    pub fn property_flags(&self) -> vk::MemoryPropertyFlags {
        self.property_flags
    }

    /// True when a resource with these requirements can live in this
    /// pool's memory type.
    pub fn supports(
        &self,
        memory_type_bits: u32,
        required_flags: vk::MemoryPropertyFlags,
    ) -> bool {
        let type_supported =
            memory_type_bits & (1 << self.memory_type_index) != 0;
        type_supported && self.property_flags.contains(required_flags)
    }
}

// internal api
impl PoolAllocator {
    /// Push a chunk back onto the free list. Only called when a MemoryBlock
    /// is dropped, so each offset is returned exactly once.
    pub(super) fn reclaim(&self, offset: vk::DeviceSize) {
        log::trace!("Returned chunk at offset {} to {:?}", offset, self.memory);
        self.free_list().push(offset);
    }

    /// Copy `len` bytes from `src` into the pool's memory at an absolute
    /// offset.
    ///
    /// Coherent memory maps exactly the written range. Non-coherent memory
    /// maps the range rounded outward to the device's non-coherent atom
    /// size, then flushes that same range before unmapping.
    ///
    /// # Safety
    ///
    /// The caller must own the chunk containing the range, `src` must be
    /// valid for `len` bytes, and no device operations may use the range
    /// during the copy.
    pub(super) unsafe fn copy_into(
        &self,
        offset: vk::DeviceSize,
        src: *const u8,
        len: usize,
    ) -> Result<(), VulkanError> {
        if !self
            .property_flags
            .contains(vk::MemoryPropertyFlags::HOST_VISIBLE)
        {
            return Err(VulkanError::MemoryNotHostVisible(
                self.memory_type_index,
            ));
        }
        if len == 0 {
            return Ok(());
        }

        let coherent = self
            .property_flags
            .contains(vk::MemoryPropertyFlags::HOST_COHERENT);
        let end = offset + len as vk::DeviceSize;
        let (map_start, map_end) = if coherent {
            (offset, end)
        } else {
            let atom = self.device.non_coherent_atom_size().max(1);
            (
                offset - offset % atom,
                align_up(end, atom).min(self.total_size()),
            )
        };
        let map_size = map_end - map_start;

        let _mapped = self.map_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let ptr = self.device.map_memory(self.memory, map_start, map_size)?;
        std::ptr::copy_nonoverlapping(
            src,
            (ptr as *mut u8).add((offset - map_start) as usize),
            len,
        );

        let flushed = if coherent {
            Ok(())
        } else {
            self.device
                .flush_mapped_memory(self.memory, map_start, map_size)
        };
        self.device.unmap_memory(self.memory);
        flushed
    }

    fn free_list(&self) -> MutexGuard<'_, Vec<vk::DeviceSize>> {
        self.free_list
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PoolAllocator {
    /// Every block holds an Arc to its pool, so by the time this runs no
    /// block can still reference the memory.
    fn drop(&mut self) {
        log::debug!(
            "Freeing pool allocator memory {:?} ({} x {} bytes)",
            self.memory,
            self.chunk_count,
            self.chunk_size
        );
        unsafe { self.device.free_memory(self.memory) };
    }
}

impl std::fmt::Debug for PoolAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("alignment", &self.alignment)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_count", &self.chunk_count)
            .field("free_chunk_count", &self.free_chunk_count())
            .field("memory_type_index", &self.memory_type_index)
            .field("property_flags", &self.property_flags)
            .field("memory", &self.memory)
            .finish()
    }
}
