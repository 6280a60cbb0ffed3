use {
    crate::graphics::vulkan_api::{
        sharing_mode_for, MemoryBlock, MemoryDevice, MemoryManager, Queue,
        VulkanError,
    },
    ash::vk,
    scopeguard::ScopeGuard,
    std::{mem::ManuallyDrop, sync::Arc},
};

/// A Vulkan image bound to a chunk of pooled, device local memory.
///
/// Images are created with a single sample and an undefined initial layout.
/// Dropping the image destroys the resource and then returns its block.
pub struct Image {
    image: vk::Image,
    extent: vk::Extent3D,
    format: vk::Format,
    image_type: vk::ImageType,
    mip_levels: u32,
    array_layers: u32,
    usage: vk::ImageUsageFlags,
    sharing_mode: vk::SharingMode,
    block: ManuallyDrop<MemoryBlock>,
    device: Arc<dyn MemoryDevice>,
}

impl Image {
    /// Create an image used by a single queue family.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        memory: &MemoryManager,
        extent: vk::Extent3D,
        image_type: vk::ImageType,
        array_layers: u32,
        mip_levels: u32,
        usage: vk::ImageUsageFlags,
        format: vk::Format,
        tiling: vk::ImageTiling,
    ) -> Result<Self, VulkanError> {
        Self::new_shared(
            memory,
            extent,
            image_type,
            array_layers,
            mip_levels,
            usage,
            format,
            tiling,
            &[],
        )
    }

    /// Create an image which can be used concurrently by every queue in
    /// `queues`.
    #[allow(clippy::too_many_arguments)]
    pub fn new_shared(
        memory: &MemoryManager,
        extent: vk::Extent3D,
        image_type: vk::ImageType,
        array_layers: u32,
        mip_levels: u32,
        usage: vk::ImageUsageFlags,
        format: vk::Format,
        tiling: vk::ImageTiling,
        queues: &[Queue],
    ) -> Result<Self, VulkanError> {
        let (sharing_mode, queue_family_indices) = sharing_mode_for(queues);
        let create_info = vk::ImageCreateInfo {
            image_type,
            extent,
            mip_levels,
            array_layers,
            format,
            tiling,
            initial_layout: vk::ImageLayout::UNDEFINED,
            usage,
            samples: vk::SampleCountFlags::TYPE_1,
            sharing_mode,
            queue_family_index_count: queue_family_indices.len() as u32,
            p_queue_family_indices: queue_family_indices.as_ptr(),
            ..Default::default()
        };
        unsafe {
            Self::with_create_info(
                memory,
                &create_info,
                vk::MemoryPropertyFlags::DEVICE_LOCAL,
            )
        }
    }

    /// Create an image from a raw create info.
    ///
    /// Any failure after the Vulkan image exists destroys the image and
    /// returns its block (if one was drawn) before the error is returned.
    ///
    /// The required alignment is raised to the device's buffer image
    /// granularity. Every pool an image lands in then has chunks which
    /// start and end on granularity pages, so a buffer in a neighbouring
    /// chunk never shares a page with the image.
    ///
    /// # Safety
    ///
    /// Unsafe because every pointer in `create_info` must be valid.
    pub unsafe fn with_create_info(
        memory: &MemoryManager,
        create_info: &vk::ImageCreateInfo,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<Self, VulkanError> {
        let device = memory.device()?;

        let image = unsafe { device.create_image(create_info)? };
        let image = scopeguard::guard(image, |image| {
            log::debug!("Destroying image {:?} which never got memory", image);
            unsafe { device.destroy_image(image) }
        });

        let mut requirements =
            unsafe { device.get_image_memory_requirements(*image) };
        requirements.alignment = requirements
            .alignment
            .max(device.buffer_image_granularity());
        let pool = memory.request_pool_for(&requirements, properties)?;
        let block = pool.allocate(requirements.size)?;

        unsafe {
            device.bind_image_memory(
                *image,
                block.device_memory(),
                block.offset_in_bytes(),
            )?;
        }

        let image = ScopeGuard::into_inner(image);
        log::trace!("Bound image {:?} to {:?}", image, block);

        Ok(Self {
            image,
            extent: create_info.extent,
            format: create_info.format,
            image_type: create_info.image_type,
            mip_levels: create_info.mip_levels,
            array_layers: create_info.array_layers,
            usage: create_info.usage,
            sharing_mode: create_info.sharing_mode,
            block: ManuallyDrop::new(block),
            device,
        })
    }

    /// Destroy the image and return its memory to the pool right now.
    pub fn release(self) {
        drop(self)
    }

    /// The raw Vulkan image handle.
    ///
    /// # Safety
    ///
    /// Unsafe because ownership is not transferred.
    pub unsafe fn raw(&self) -> vk::Image {
        self.image
    }

    pub fn memory_block(&self) -> &MemoryBlock {
        &self.block
    }

    /// # Safety
    ///
    /// Unsafe because the memory is shared with the rest of the pool.
    pub unsafe fn device_memory(&self) -> vk::DeviceMemory {
        unsafe { self.block.device_memory() }
    }

    pub fn offset_in_bytes(&self) -> vk::DeviceSize {
        self.block.offset_in_bytes()
    }

    pub fn extent(&self) -> vk::Extent3D {
        self.extent
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn image_type(&self) -> vk::ImageType {
        self.image_type
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn array_layers(&self) -> u32 {
        self.array_layers
    }

    pub fn usage(&self) -> vk::ImageUsageFlags {
        self.usage
    }

    pub fn sharing_mode(&self) -> vk::SharingMode {
        self.sharing_mode
    }
}

impl Drop for Image {
    /// # Safety
    ///
    /// The application must ensure no Vulkan Device operations reference this
    /// image when it is dropped.
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image(self.image);
        }

        // safe because the block is never touched again
        let block = unsafe { ManuallyDrop::take(&mut self.block) };
        let pool = Arc::clone(block.pool());
        pool.free(block);
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("image", &self.image)
            .field("extent", &self.extent)
            .field("format", &self.format)
            .field("mip_levels", &self.mip_levels)
            .field("array_layers", &self.array_layers)
            .field("block", &*self.block)
            .finish()
    }
}
