use {
    crate::graphics::vulkan_api::{Instance, VulkanError},
    ash::vk,
    std::ffi::CStr,
};

/// Find the first physical device with a graphics queue family.
///
/// Discrete GPUs are preferred over every other device type.
pub fn find_optimal_physical_device(
    instance: &Instance,
) -> Result<(vk::PhysicalDevice, u32), VulkanError> {
    let mut candidates: Vec<(vk::PhysicalDevice, u32, bool)> = instance
        .enumerate_physical_devices()?
        .into_iter()
        .filter_map(|device| {
            let family_index = find_graphics_queue_family(instance, &device)?;
            let properties = instance.get_physical_device_properties(&device);
            log::trace!(
                "Candidate device {} with graphics family {}",
                device_name(&properties),
                family_index
            );
            let is_discrete =
                properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU;
            Some((device, family_index, is_discrete))
        })
        .collect();
    candidates.sort_by_key(|(_, _, is_discrete)| !is_discrete);
    candidates
        .first()
        .map(|(device, family_index, _)| (*device, *family_index))
        .ok_or(VulkanError::NoSuitableDeviceFound)
}

/// The device's name as reported by the driver.
pub fn device_name(properties: &vk::PhysicalDeviceProperties) -> String {
    unsafe {
        // safe because the driver fills device_name with a nul terminated
        // string
        CStr::from_ptr(properties.device_name.as_ptr())
            .to_string_lossy()
            .into_owned()
    }
}

fn find_graphics_queue_family(
    instance: &Instance,
    physical_device: &vk::PhysicalDevice,
) -> Option<u32> {
    instance
        .get_physical_device_queue_family_properties(physical_device)
        .iter()
        .position(|family| {
            family.queue_count > 0
                && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        })
        .map(|index| index as u32)
}
