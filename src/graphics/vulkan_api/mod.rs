mod buffer;
mod error;
mod image;
mod instance;
mod memory;
mod render_device;

pub use self::{
    buffer::Buffer,
    error::VulkanError,
    image::Image,
    instance::Instance,
    memory::{
        choose_memory_type, describe_memory_types, MemoryBlock, MemoryConfig,
        MemoryDevice, MemoryManager, PoolAllocator,
    },
    render_device::{sharing_mode_for, Queue, RenderDevice},
};
