use std::ffi::c_void;

use ash::vk;

use super::RenderDevice;
use crate::graphics::vulkan_api::{MemoryDevice, VulkanError};

impl MemoryDevice for RenderDevice {
    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        self.memory_properties
    }

    fn non_coherent_atom_size(&self) -> vk::DeviceSize {
        self.limits.non_coherent_atom_size
    }

    fn buffer_image_granularity(&self) -> vk::DeviceSize {
        self.limits.buffer_image_granularity
    }

    unsafe fn allocate_memory(
        &self,
        allocate_info: &vk::MemoryAllocateInfo,
    ) -> Result<vk::DeviceMemory, VulkanError> {
        self.logical_device
            .allocate_memory(allocate_info, None)
            .map_err(|err| {
                VulkanError::UnableToAllocateDeviceMemory(
                    allocate_info.allocation_size,
                    err,
                )
            })
    }

    unsafe fn free_memory(&self, memory: vk::DeviceMemory) {
        self.logical_device.free_memory(memory, None)
    }

    unsafe fn map_memory(
        &self,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) -> Result<*mut c_void, VulkanError> {
        self.logical_device
            .map_memory(memory, offset, size, vk::MemoryMapFlags::empty())
            .map_err(VulkanError::UnableToMapDeviceMemory)
    }

    unsafe fn unmap_memory(&self, memory: vk::DeviceMemory) {
        self.logical_device.unmap_memory(memory);
    }

    unsafe fn flush_mapped_memory(
        &self,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) -> Result<(), VulkanError> {
        self.logical_device
            .flush_mapped_memory_ranges(&[vk::MappedMemoryRange {
                memory,
                offset,
                size,
                ..Default::default()
            }])
            .map_err(VulkanError::UnableToFlushMappedMemory)
    }

    unsafe fn create_buffer(
        &self,
        create_info: &vk::BufferCreateInfo,
    ) -> Result<vk::Buffer, VulkanError> {
        self.logical_device
            .create_buffer(create_info, None)
            .map_err(|err| {
                VulkanError::UnableToCreateBuffer(
                    create_info.size,
                    create_info.usage,
                    err,
                )
            })
    }

    unsafe fn destroy_buffer(&self, buffer: vk::Buffer) {
        self.logical_device.destroy_buffer(buffer, None)
    }

    unsafe fn get_buffer_memory_requirements(
        &self,
        buffer: vk::Buffer,
    ) -> vk::MemoryRequirements {
        self.logical_device.get_buffer_memory_requirements(buffer)
    }

    unsafe fn bind_buffer_memory(
        &self,
        buffer: vk::Buffer,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> Result<(), VulkanError> {
        self.logical_device
            .bind_buffer_memory(buffer, memory, offset)
            .map_err(VulkanError::UnableToBindBufferMemory)
    }

    unsafe fn create_image(
        &self,
        create_info: &vk::ImageCreateInfo,
    ) -> Result<vk::Image, VulkanError> {
        self.logical_device
            .create_image(create_info, None)
            .map_err(VulkanError::UnableToCreateImage)
    }

    unsafe fn destroy_image(&self, image: vk::Image) {
        self.logical_device.destroy_image(image, None)
    }

    unsafe fn get_image_memory_requirements(
        &self,
        image: vk::Image,
    ) -> vk::MemoryRequirements {
        self.logical_device.get_image_memory_requirements(image)
    }

    unsafe fn bind_image_memory(
        &self,
        image: vk::Image,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> Result<(), VulkanError> {
        self.logical_device
            .bind_image_memory(image, memory, offset)
            .map_err(VulkanError::UnableToBindImageMemory)
    }
}
