use ash::vk;

use super::Instance;
use crate::graphics::vulkan_api::VulkanError;

impl Instance {
    /// Get the properties of queues associated with the given physical device.
    pub fn get_physical_device_queue_family_properties(
        &self,
        physical_device: &vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        unsafe {
            self.ash
                .get_physical_device_queue_family_properties(*physical_device)
        }
    }

    /// Get the set of all physical devices available to the Vulkan instance.
    pub fn enumerate_physical_devices(
        &self,
    ) -> Result<Vec<vk::PhysicalDevice>, VulkanError> {
        unsafe {
            self.ash
                .enumerate_physical_devices()
                .map_err(VulkanError::UnableToEnumeratePhysicalDevices)
        }
    }

    /// Get the physical device's memory properties.
    pub fn get_physical_device_memory_properties(
        &self,
        physical_device: &vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceMemoryProperties {
        unsafe {
            self.ash
                .get_physical_device_memory_properties(*physical_device)
        }
    }

    /// Get the physical device's general properties, including its name.
    pub fn get_physical_device_properties(
        &self,
        physical_device: &vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        unsafe { self.ash.get_physical_device_properties(*physical_device) }
    }

    /// Create a logical device.
    ///
    /// # Safety
    ///
    /// The caller must destroy the device before the instance is dropped.
    pub unsafe fn create_logical_device(
        &self,
        physical_device: &vk::PhysicalDevice,
        create_info: &vk::DeviceCreateInfo,
    ) -> Result<ash::Device, VulkanError> {
        self.ash
            .create_device(*physical_device, create_info, None)
            .map_err(VulkanError::UnableToCreateLogicalDevice)
    }
}
