mod api;
mod physical_device;
mod queue;

use {
    crate::graphics::vulkan_api::{Instance, VulkanError},
    ash::vk,
    std::ffi::CStr,
};

pub use self::queue::{sharing_mode_for, Queue};

const SINGLE_QUEUE_PRIORITY: [f32; 1] = [1.0];

/// The Vulkan logical device, created without any window or surface.
///
/// This is the smallest device that can back a
/// [crate::graphics::vulkan_api::MemoryManager]: one graphics queue and the
/// physical device's memory properties.
pub struct RenderDevice {
    graphics_queue: Queue,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    limits: vk::PhysicalDeviceLimits,
    physical_device: vk::PhysicalDevice,
    logical_device: ash::Device,
    _instance: Instance,
}

impl RenderDevice {
    /// Create an instance and a logical device on the best available
    /// physical device.
    pub fn new_headless(application_name: &CStr) -> Result<Self, VulkanError> {
        let instance = Instance::new_headless(application_name)?;
        let (physical_device, graphics_family_index) =
            physical_device::find_optimal_physical_device(&instance)?;

        let properties =
            instance.get_physical_device_properties(&physical_device);
        log::info!(
            "Using physical device {}",
            physical_device::device_name(&properties)
        );

        let queue_create_info = vk::DeviceQueueCreateInfo {
            queue_family_index: graphics_family_index,
            p_queue_priorities: SINGLE_QUEUE_PRIORITY.as_ptr(),
            queue_count: 1,
            ..Default::default()
        };
        let create_info = vk::DeviceCreateInfo {
            p_queue_create_infos: &queue_create_info,
            queue_create_info_count: 1,
            ..Default::default()
        };
        let logical_device = unsafe {
            instance.create_logical_device(&physical_device, &create_info)?
        };

        let flags = instance
            .get_physical_device_queue_family_properties(&physical_device)
            [graphics_family_index as usize]
            .queue_flags;
        let graphics_queue = Queue::from_raw(
            unsafe { logical_device.get_device_queue(graphics_family_index, 0) },
            flags,
            graphics_family_index,
            0,
        );
        log::debug!("Created graphics queue {}", graphics_queue);

        let memory_properties =
            instance.get_physical_device_memory_properties(&physical_device);

        Ok(Self {
            graphics_queue,
            memory_properties,
            limits: properties.limits,
            physical_device,
            logical_device,
            _instance: instance,
        })
    }

    /// The queue used for graphics and transfer commands.
    pub fn graphics_queue(&self) -> &Queue {
        &self.graphics_queue
    }

    /// The raw physical device handle.
    ///
    /// # Safety
    ///
    /// Unsafe because ownership is not transferred.
    pub unsafe fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Stall the thread until the GPU is done with all operations.
    pub fn wait_idle(&self) -> Result<(), VulkanError> {
        unsafe {
            self.logical_device
                .device_wait_idle()
                .map_err(VulkanError::UnableToWaitForDeviceToIdle)
        }
    }
}

impl Drop for RenderDevice {
    fn drop(&mut self) {
        if let Err(error) = self.wait_idle() {
            log::error!("Error while idling the device before destruction! {}", error);
        }
        unsafe {
            self.logical_device.destroy_device(None);
        }
    }
}
