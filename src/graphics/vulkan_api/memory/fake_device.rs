//! An in-memory MemoryDevice for tests.
//!
//! Device memory is backed by host byte vectors and every handle is a
//! counter value. Failures can be injected one call at a time.

use {
    super::{align_up, MemoryDevice},
    crate::graphics::vulkan_api::VulkanError,
    ash::vk::{self, Handle},
    std::{
        collections::HashMap,
        ffi::c_void,
        sync::{Mutex, MutexGuard},
    },
};

pub(crate) const BUFFER_ALIGNMENT: vk::DeviceSize = 256;
pub(crate) const IMAGE_ALIGNMENT: vk::DeviceSize = 1024;
pub(crate) const NON_COHERENT_ATOM_SIZE: vk::DeviceSize = 64;

struct FakeBuffer {
    size: vk::DeviceSize,
    sharing_mode: vk::SharingMode,
    queue_family_indices: Vec<u32>,
}

struct FakeImage {
    extent: vk::Extent3D,
    array_layers: u32,
}

#[derive(Default)]
struct FakeState {
    next_handle: u64,
    allocations: HashMap<u64, Vec<u8>>,
    /// The offset and size of every mapped range, keyed by memory.
    mapped: HashMap<u64, (vk::DeviceSize, vk::DeviceSize)>,
    buffers: HashMap<u64, FakeBuffer>,
    images: HashMap<u64, FakeImage>,
    bindings: HashMap<u64, (vk::DeviceMemory, vk::DeviceSize)>,
    flush_count: usize,
    last_flush: Option<(vk::DeviceSize, vk::DeviceSize)>,
    buffer_image_granularity: Option<vk::DeviceSize>,
    fail_next_allocation: bool,
    fail_next_resource: bool,
    fail_next_bind: bool,
    image_type_bits: Option<u32>,
}

impl FakeState {
    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

pub(crate) struct FakeDevice {
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    state: Mutex<FakeState>,
}

impl FakeDevice {
    /// A device with one device local type and two host visible types.
    pub fn new() -> Self {
        Self::with_memory_types(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE
                | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::HOST_VISIBLE
                | vk::MemoryPropertyFlags::HOST_COHERENT
                | vk::MemoryPropertyFlags::HOST_CACHED,
        ])
    }

    /// Device local types live on heap 0, everything else on heap 1.
    pub fn with_memory_types(types: &[vk::MemoryPropertyFlags]) -> Self {
        let mut memory_properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            memory_heap_count: 2,
            ..Default::default()
        };
        memory_properties.memory_heaps[0] = vk::MemoryHeap {
            size: 1 << 30,
            flags: vk::MemoryHeapFlags::DEVICE_LOCAL,
        };
        memory_properties.memory_heaps[1] = vk::MemoryHeap {
            size: 1 << 28,
            flags: vk::MemoryHeapFlags::empty(),
        };
        for (i, flags) in types.iter().enumerate() {
            let heap_index =
                u32::from(!flags.contains(vk::MemoryPropertyFlags::DEVICE_LOCAL));
            memory_properties.memory_types[i] = vk::MemoryType {
                property_flags: *flags,
                heap_index,
            };
        }
        Self {
            memory_properties,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn fail_next_allocation(&self) {
        self.state().fail_next_allocation = true;
    }

    /// The next create_buffer or create_image call fails.
    pub fn fail_next_resource(&self) {
        self.state().fail_next_resource = true;
    }

    pub fn fail_next_bind(&self) {
        self.state().fail_next_bind = true;
    }

    /// Restrict the memory types images may live in.
    pub fn set_image_type_bits(&self, type_bits: u32) {
        self.state().image_type_bits = Some(type_bits);
    }

    pub fn set_buffer_image_granularity(&self, granularity: vk::DeviceSize) {
        self.state().buffer_image_granularity = Some(granularity);
    }

    pub fn live_allocations(&self) -> usize {
        self.state().allocations.len()
    }

    pub fn allocation_sizes(&self) -> Vec<usize> {
        self.state().allocations.values().map(Vec::len).collect()
    }

    pub fn live_buffers(&self) -> usize {
        self.state().buffers.len()
    }

    pub fn live_images(&self) -> usize {
        self.state().images.len()
    }

    pub fn mapped_count(&self) -> usize {
        self.state().mapped.len()
    }

    pub fn flush_count(&self) -> usize {
        self.state().flush_count
    }

    /// The offset and size of the most recent flush.
    pub fn last_flush(&self) -> Option<(vk::DeviceSize, vk::DeviceSize)> {
        self.state().last_flush
    }

    /// The memory and offset a buffer or image was bound to.
    pub fn binding<H: Handle>(
        &self,
        resource: H,
    ) -> Option<(vk::DeviceMemory, vk::DeviceSize)> {
        self.state().bindings.get(&resource.as_raw()).copied()
    }

    /// The sharing mode and queue families a live buffer was created with.
    pub fn buffer_sharing(
        &self,
        buffer: vk::Buffer,
    ) -> Option<(vk::SharingMode, Vec<u32>)> {
        self.state().buffers.get(&buffer.as_raw()).map(|buffer| {
            (buffer.sharing_mode, buffer.queue_family_indices.clone())
        })
    }

    pub fn read_bytes(
        &self,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
        len: usize,
    ) -> Vec<u8> {
        let state = self.state();
        let bytes = &state.allocations[&memory.as_raw()];
        bytes[offset as usize..offset as usize + len].to_vec()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn bind(
        &self,
        resource: u64,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> Result<(), vk::Result> {
        let mut state = self.state();
        if std::mem::take(&mut state.fail_next_bind) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        if !state.allocations.contains_key(&memory.as_raw()) {
            return Err(vk::Result::ERROR_UNKNOWN);
        }
        state.bindings.insert(resource, (memory, offset));
        Ok(())
    }
}

impl MemoryDevice for FakeDevice {
    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        self.memory_properties
    }

    fn non_coherent_atom_size(&self) -> vk::DeviceSize {
        NON_COHERENT_ATOM_SIZE
    }

    fn buffer_image_granularity(&self) -> vk::DeviceSize {
        self.state().buffer_image_granularity.unwrap_or(1)
    }

    unsafe fn allocate_memory(
        &self,
        allocate_info: &vk::MemoryAllocateInfo,
    ) -> Result<vk::DeviceMemory, VulkanError> {
        let size = allocate_info.allocation_size;
        let mut state = self.state();
        let type_is_valid =
            allocate_info.memory_type_index < self.memory_properties.memory_type_count;
        if std::mem::take(&mut state.fail_next_allocation) || !type_is_valid {
            return Err(VulkanError::UnableToAllocateDeviceMemory(
                size,
                vk::Result::ERROR_OUT_OF_DEVICE_MEMORY,
            ));
        }
        let handle = state.next_handle();
        state.allocations.insert(handle, vec![0; size as usize]);
        Ok(vk::DeviceMemory::from_raw(handle))
    }

    unsafe fn free_memory(&self, memory: vk::DeviceMemory) {
        let mut state = self.state();
        state.mapped.remove(&memory.as_raw());
        state
            .allocations
            .remove(&memory.as_raw())
            .expect("double free of fake device memory");
    }

    unsafe fn map_memory(
        &self,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) -> Result<*mut c_void, VulkanError> {
        let mut state = self.state();
        let raw = memory.as_raw();
        if state.mapped.contains_key(&raw) {
            return Err(VulkanError::UnableToMapDeviceMemory(
                vk::Result::ERROR_MEMORY_MAP_FAILED,
            ));
        }
        state.mapped.insert(raw, (offset, size));
        let bytes = state.allocations.get_mut(&raw).ok_or(
            VulkanError::UnableToMapDeviceMemory(vk::Result::ERROR_UNKNOWN),
        )?;
        assert!(offset + size <= bytes.len() as u64, "mapped out of range");
        Ok(bytes.as_mut_ptr().add(offset as usize) as *mut c_void)
    }

    unsafe fn unmap_memory(&self, memory: vk::DeviceMemory) {
        self.state().mapped.remove(&memory.as_raw());
    }

    unsafe fn flush_mapped_memory(
        &self,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) -> Result<(), VulkanError> {
        let mut state = self.state();
        let (mapped_offset, mapped_size) = *state
            .mapped
            .get(&memory.as_raw())
            .expect("flush while unmapped");
        let memory_size = state.allocations[&memory.as_raw()].len() as u64;
        assert!(
            offset >= mapped_offset
                && offset + size <= mapped_offset + mapped_size,
            "flushed {}..{} outside the mapped range {}..{}",
            offset,
            offset + size,
            mapped_offset,
            mapped_offset + mapped_size
        );
        assert_eq!(offset % NON_COHERENT_ATOM_SIZE, 0, "unaligned flush offset");
        assert!(
            size % NON_COHERENT_ATOM_SIZE == 0 || offset + size == memory_size,
            "unaligned flush size {}",
            size
        );
        state.flush_count += 1;
        state.last_flush = Some((offset, size));
        Ok(())
    }

    unsafe fn create_buffer(
        &self,
        create_info: &vk::BufferCreateInfo,
    ) -> Result<vk::Buffer, VulkanError> {
        let mut state = self.state();
        if std::mem::take(&mut state.fail_next_resource) {
            return Err(VulkanError::UnableToCreateBuffer(
                create_info.size,
                create_info.usage,
                vk::Result::ERROR_OUT_OF_HOST_MEMORY,
            ));
        }
        let queue_family_indices = if create_info.queue_family_index_count > 0
        {
            std::slice::from_raw_parts(
                create_info.p_queue_family_indices,
                create_info.queue_family_index_count as usize,
            )
            .to_vec()
        } else {
            vec![]
        };
        let handle = state.next_handle();
        state.buffers.insert(
            handle,
            FakeBuffer {
                size: create_info.size,
                sharing_mode: create_info.sharing_mode,
                queue_family_indices,
            },
        );
        Ok(vk::Buffer::from_raw(handle))
    }

    unsafe fn destroy_buffer(&self, buffer: vk::Buffer) {
        let mut state = self.state();
        state.bindings.remove(&buffer.as_raw());
        state
            .buffers
            .remove(&buffer.as_raw())
            .expect("double destroy of fake buffer");
    }

    unsafe fn get_buffer_memory_requirements(
        &self,
        buffer: vk::Buffer,
    ) -> vk::MemoryRequirements {
        let size = self.state().buffers[&buffer.as_raw()].size;
        vk::MemoryRequirements {
            size,
            alignment: BUFFER_ALIGNMENT,
            memory_type_bits: (1 << self.memory_properties.memory_type_count) - 1,
        }
    }

    unsafe fn bind_buffer_memory(
        &self,
        buffer: vk::Buffer,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> Result<(), VulkanError> {
        self.bind(buffer.as_raw(), memory, offset)
            .map_err(VulkanError::UnableToBindBufferMemory)
    }

    unsafe fn create_image(
        &self,
        create_info: &vk::ImageCreateInfo,
    ) -> Result<vk::Image, VulkanError> {
        let mut state = self.state();
        if std::mem::take(&mut state.fail_next_resource) {
            return Err(VulkanError::UnableToCreateImage(
                vk::Result::ERROR_OUT_OF_HOST_MEMORY,
            ));
        }
        let handle = state.next_handle();
        state.images.insert(
            handle,
            FakeImage {
                extent: create_info.extent,
                array_layers: create_info.array_layers,
            },
        );
        Ok(vk::Image::from_raw(handle))
    }

    unsafe fn destroy_image(&self, image: vk::Image) {
        let mut state = self.state();
        state.bindings.remove(&image.as_raw());
        state
            .images
            .remove(&image.as_raw())
            .expect("double destroy of fake image");
    }

    unsafe fn get_image_memory_requirements(
        &self,
        image: vk::Image,
    ) -> vk::MemoryRequirements {
        let state = self.state();
        let info = &state.images[&image.as_raw()];
        let texels = u64::from(info.extent.width)
            * u64::from(info.extent.height)
            * u64::from(info.extent.depth)
            * u64::from(info.array_layers);
        vk::MemoryRequirements {
            size: align_up(texels * 4, IMAGE_ALIGNMENT),
            alignment: IMAGE_ALIGNMENT,
            memory_type_bits: state
                .image_type_bits
                .unwrap_or((1 << self.memory_properties.memory_type_count) - 1),
        }
    }

    unsafe fn bind_image_memory(
        &self,
        image: vk::Image,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> Result<(), VulkanError> {
        self.bind(image.as_raw(), memory, offset)
            .map_err(VulkanError::UnableToBindImageMemory)
    }
}
