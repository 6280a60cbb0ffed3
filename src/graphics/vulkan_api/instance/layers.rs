use {
    crate::graphics::vulkan_api::VulkanError,
    std::ffi::CStr,
};

/// Keep only the layers which are available on the current platform.
///
/// Layers are a debugging aid, so a missing layer is logged and skipped
/// rather than treated as an error.
pub fn available_layers<'a>(
    entry: &ash::Entry,
    wanted_layers: &[&'a CStr],
) -> Result<Vec<&'a CStr>, VulkanError> {
    let available_layer_properties = entry
        .enumerate_instance_layer_properties()
        .map_err(VulkanError::UnableToListAvailableLayers)?;

    let available_names: Vec<String> = available_layer_properties
        .iter()
        .map(|layer| unsafe {
            // safe because the driver fills layer_name with a nul terminated
            // string
            CStr::from_ptr(layer.layer_name.as_ptr())
                .to_string_lossy()
                .into_owned()
        })
        .collect();

    log::debug!("Available layers: {:?}", available_names);

    Ok(wanted_layers
        .iter()
        .copied()
        .filter(|wanted| {
            let name = wanted.to_string_lossy();
            let found = available_names.iter().any(|item| *item == name);
            if !found {
                log::warn!("Layer {} is not available, skipping it", name);
            }
            found
        })
        .collect())
}
