//! Device memory management.
//!
//! Device memory is carved out of a handful of large allocations. Each
//! [PoolAllocator] owns one allocation and splits it into equally sized
//! chunks which are handed out as [MemoryBlock]s. The [MemoryManager] keeps
//! track of every pool and creates new pools on demand.

mod config;
mod memory_block;
mod memory_manager;
mod memory_type;
mod pool_allocator;

#[cfg(test)]
pub(crate) mod fake_device;

use {crate::graphics::vulkan_api::VulkanError, ash::vk, std::ffi::c_void};

pub use self::{
    config::MemoryConfig,
    memory_block::MemoryBlock,
    memory_manager::MemoryManager,
    memory_type::{choose_memory_type, describe_memory_types},
    pool_allocator::PoolAllocator,
};

/// The raw device operations needed to allocate memory and bind it to
/// buffers and images.
///
/// Every method maps directly onto a Vulkan entry point. Implementations
/// are expected to do no validation of their own.
pub trait MemoryDevice: Send + Sync {
    /// The memory types and heaps exposed by the physical device.
    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties;

    /// Flushed ranges of non-coherent memory are aligned to this size.
    fn non_coherent_atom_size(&self) -> vk::DeviceSize;

    /// Linear and optimal resources closer than this may alias.
    fn buffer_image_granularity(&self) -> vk::DeviceSize;

    /// # Safety
    ///
    /// The caller must free the memory before the device is destroyed.
    unsafe fn allocate_memory(
        &self,
        allocate_info: &vk::MemoryAllocateInfo,
    ) -> Result<vk::DeviceMemory, VulkanError>;

    /// # Safety
    ///
    /// The caller must ensure no resource bound to the memory is still in
    /// use by the device.
    unsafe fn free_memory(&self, memory: vk::DeviceMemory);

    /// Map a range of device memory into host address space.
    ///
    /// # Safety
    ///
    /// Unsafe because:
    ///  - only host visible memory can be mapped
    ///  - a piece of device memory can only be mapped once at a time
    ///  - the caller must make a corresponding call to unmap_memory
    unsafe fn map_memory(
        &self,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) -> Result<*mut c_void, VulkanError>;

    /// # Safety
    ///
    /// The mapped pointer must not be used after this call.
    unsafe fn unmap_memory(&self, memory: vk::DeviceMemory);

    /// Flush a range of mapped memory so host writes are visible to the
    /// device.
    ///
    /// # Safety
    ///
    /// Unsafe because:
    ///  - the range must lie inside the currently mapped range
    ///  - `offset` must be a multiple of non_coherent_atom_size, and `size`
    ///    must be one too unless the range ends at the end of the memory
    unsafe fn flush_mapped_memory(
        &self,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) -> Result<(), VulkanError>;

    /// # Safety
    ///
    /// The caller must destroy the buffer before the device is destroyed.
    unsafe fn create_buffer(
        &self,
        create_info: &vk::BufferCreateInfo,
    ) -> Result<vk::Buffer, VulkanError>;

    /// # Safety
    ///
    /// No device operations may still reference the buffer.
    unsafe fn destroy_buffer(&self, buffer: vk::Buffer);

    /// # Safety
    ///
    /// The buffer must not have been destroyed.
    unsafe fn get_buffer_memory_requirements(
        &self,
        buffer: vk::Buffer,
    ) -> vk::MemoryRequirements;

    /// # Safety
    ///
    /// The memory must outlive the buffer.
    unsafe fn bind_buffer_memory(
        &self,
        buffer: vk::Buffer,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> Result<(), VulkanError>;

    /// # Safety
    ///
    /// The caller must destroy the image before the device is destroyed.
    unsafe fn create_image(
        &self,
        create_info: &vk::ImageCreateInfo,
    ) -> Result<vk::Image, VulkanError>;

    /// # Safety
    ///
    /// No device operations may still reference the image.
    unsafe fn destroy_image(&self, image: vk::Image);

    /// # Safety
    ///
    /// The image must not have been destroyed.
    unsafe fn get_image_memory_requirements(
        &self,
        image: vk::Image,
    ) -> vk::MemoryRequirements;

    /// # Safety
    ///
    /// The memory must outlive the image.
    unsafe fn bind_image_memory(
        &self,
        image: vk::Image,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> Result<(), VulkanError>;
}

/// Round size up to the next multiple of alignment.
pub(crate) fn align_up(
    size: vk::DeviceSize,
    alignment: vk::DeviceSize,
) -> vk::DeviceSize {
    if alignment <= 1 {
        return size;
    }
    size.div_ceil(alignment) * alignment
}
