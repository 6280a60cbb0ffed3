mod api;
mod layers;

use {
    crate::graphics::vulkan_api::VulkanError,
    ash::vk,
    std::ffi::CStr,
};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// A headless Vulkan library instance. No surface extensions are enabled,
/// the instance is only used to reach a logical device.
pub struct Instance {
    ash: ash::Instance,
    _entry: ash::Entry,
}

impl Instance {
    /// Create the instance, enabling the validation layer when it's
    /// installed.
    pub fn new_headless(application_name: &CStr) -> Result<Self, VulkanError> {
        let entry = ash::Entry::linked();

        let layers = layers::available_layers(&entry, &[VALIDATION_LAYER])?;
        let layer_names: Vec<String> = layers
            .iter()
            .map(|layer| layer.to_string_lossy().into_owned())
            .collect();
        log::debug!("Enabled layers: {:?}", layer_names);
        let layer_ptrs: Vec<_> =
            layers.iter().map(|layer| layer.as_ptr()).collect();

        let app_info = vk::ApplicationInfo {
            p_application_name: application_name.as_ptr(),
            p_engine_name: application_name.as_ptr(),
            application_version: vk::make_api_version(0, 1, 0, 0),
            engine_version: vk::make_api_version(0, 1, 0, 0),
            api_version: vk::make_api_version(0, 1, 1, 0),
            ..Default::default()
        };
        let create_info = vk::InstanceCreateInfo {
            p_application_info: &app_info,
            pp_enabled_layer_names: layer_ptrs.as_ptr(),
            enabled_layer_count: layer_ptrs.len() as u32,
            ..Default::default()
        };

        let ash = unsafe {
            entry
                .create_instance(&create_info, None)
                .map_err(VulkanError::UnableToCreateInstance)?
        };

        Ok(Self { ash, _entry: entry })
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            self.ash.destroy_instance(None);
        }
    }
}
