use ash::vk;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VulkanError {
    #[error("Unable to get the available Vulkan layers {:?}", .0)]
    UnableToListAvailableLayers(#[source] vk::Result),

    #[error("Unable to create a Vulkan instance {:?}", .0)]
    UnableToCreateInstance(#[source] vk::Result),

    #[error("Unable to enumerate physical devices {:?}", .0)]
    UnableToEnumeratePhysicalDevices(#[source] vk::Result),

    #[error("No physical device with a graphics queue could be found")]
    NoSuitableDeviceFound,

    #[error("Unable to create the logical device {:?}", .0)]
    UnableToCreateLogicalDevice(#[source] vk::Result),

    #[error("Unable to wait for the device to idle {:?}", .0)]
    UnableToWaitForDeviceToIdle(#[source] vk::Result),

    #[error(
        "The memory manager has not been started, or has already been shut down"
    )]
    DeviceNotReady,

    #[error(
        "No memory type could be found for flags {:?} and type bits {:#034b}",
        .0,
        .1
    )]
    MemoryTypeNotFound(vk::MemoryPropertyFlags, u32),

    #[error("Unable to allocate {} bytes of device memory {:?}", .0, .1)]
    UnableToAllocateDeviceMemory(vk::DeviceSize, #[source] vk::Result),

    #[error(
        "Cannot partition {} bytes into {} byte chunks with {} byte alignment",
        .total_size,
        .chunk_size,
        .alignment
    )]
    InvalidPoolLayout {
        total_size: vk::DeviceSize,
        chunk_size: vk::DeviceSize,
        alignment: vk::DeviceSize,
    },

    #[error(
        "All {} chunks of {} bytes are in use",
        .chunk_count,
        .chunk_size
    )]
    NoMemoryAvailableInAllocator {
        chunk_size: vk::DeviceSize,
        chunk_count: u64,
    },

    #[error(
        "Requested {} bytes from a pool of {} byte chunks",
        .requested,
        .chunk_size
    )]
    RequestTooLarge {
        requested: vk::DeviceSize,
        chunk_size: vk::DeviceSize,
    },

    #[error(
        "The pool for {} byte chunks uses memory type {} which does not \
         satisfy flags {:?} and type bits {:#034b}",
        .chunk_size,
        .memory_type_index,
        .required_flags,
        .type_bits
    )]
    IncompatiblePool {
        chunk_size: vk::DeviceSize,
        memory_type_index: u32,
        required_flags: vk::MemoryPropertyFlags,
        type_bits: u32,
    },

    #[error("Unable to create a buffer with size {} and usage {:?}", .0, .1)]
    UnableToCreateBuffer(u64, vk::BufferUsageFlags, #[source] vk::Result),

    #[error("Unable to bind device memory to buffer {:?}", .0)]
    UnableToBindBufferMemory(#[source] vk::Result),

    #[error("Unable to create image {:?}", .0)]
    UnableToCreateImage(#[source] vk::Result),

    #[error("Unable to bind device memory to image {:?}", .0)]
    UnableToBindImageMemory(#[source] vk::Result),

    #[error("Unable to map device memory {:?}", .0)]
    UnableToMapDeviceMemory(#[source] vk::Result),

    #[error("Unable to flush mapped device memory {:?}", .0)]
    UnableToFlushMappedMemory(#[source] vk::Result),

    #[error("Memory type {} is not host visible and cannot be mapped", .0)]
    MemoryNotHostVisible(u32),

    #[error(
        "Writing {} bytes at offset {} overflows the {} byte buffer",
        .len,
        .offset,
        .size
    )]
    WriteOutOfBounds {
        offset: vk::DeviceSize,
        len: vk::DeviceSize,
        size: vk::DeviceSize,
    },
}
