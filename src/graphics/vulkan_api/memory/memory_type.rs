use {crate::graphics::vulkan_api::VulkanError, ash::vk};

/// Find the first memory type which is allowed by `type_bits` and supports
/// every flag in `required_flags`.
///
/// Bit `i` of `type_bits` marks memory type `i` as acceptable, which is
/// exactly the layout of `vk::MemoryRequirements::memory_type_bits`.
pub fn choose_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required_flags: vk::MemoryPropertyFlags,
) -> Result<u32, VulkanError> {
    let type_count = (memory_properties.memory_type_count as usize)
        .min(vk::MAX_MEMORY_TYPES);
    memory_properties.memory_types[..type_count]
        .iter()
        .enumerate()
        .find(|(i, memory_type)| {
            let type_supported = type_bits & (1 << i) != 0;
            let properties_supported =
                memory_type.property_flags.contains(required_flags);
            type_supported & properties_supported
        })
        .map(|(i, _memory_type)| i as u32)
        .ok_or(VulkanError::MemoryTypeNotFound(required_flags, type_bits))
}

/// A multi-line summary of the memory types and their heaps, one
/// `- type ...` line per type, for logging.
pub fn describe_memory_types(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
) -> String {
    let type_count = (memory_properties.memory_type_count as usize)
        .min(vk::MAX_MEMORY_TYPES);
    memory_properties.memory_types[..type_count]
        .iter()
        .enumerate()
        .fold(String::new(), |mut summary, (i, memory_type)| {
            let heap_size = memory_properties
                .memory_heaps
                .get(memory_type.heap_index as usize)
                .map(|heap| heap.size)
                .unwrap_or(0);
            summary.push_str(&format!(
                "\n- type {} on heap {} ({} bytes) {:?}",
                i, memory_type.heap_index, heap_size, memory_type.property_flags
            ));
            summary
        })
}
