use std::sync::Arc;

use anyhow::Result;
use ash::vk;
use ccthw_device_memory::{
    graphics::vulkan_api::{
        Buffer, Image, MemoryConfig, MemoryManager, RenderDevice,
    },
    logging,
};

#[repr(C)]
#[derive(Debug, Copy, Clone)]
struct Vertex {
    pos: [f32; 2],
    rgba: [f32; 4],
}

const TRIANGLE: [Vertex; 3] = [
    Vertex {
        pos: [0.0, -0.5],
        rgba: [1.0, 0.0, 0.0, 1.0],
    },
    Vertex {
        pos: [0.5, 0.5],
        rgba: [0.0, 1.0, 0.0, 1.0],
    },
    Vertex {
        pos: [-0.5, 0.5],
        rgba: [0.0, 0.0, 1.0, 1.0],
    },
];

fn main() -> Result<()> {
    let _logger = logging::setup()?;

    let render_device = Arc::new(RenderDevice::new_headless(c"Pool Demo")?);
    let memory = MemoryManager::with_config(MemoryConfig { chunks_per_pool: 4 });
    memory.startup(render_device.clone())?;

    let vertices = Buffer::new(
        &memory,
        std::mem::size_of_val(&TRIANGLE) as u64,
        vk::BufferUsageFlags::VERTEX_BUFFER,
    )?;
    unsafe { vertices.write_data(0, &TRIANGLE)? };
    log::info!("Vertex buffer {:#?}", vertices);

    let uniforms: Vec<Buffer> = (0..3)
        .map(|_| {
            Buffer::new_shared(
                &memory,
                64,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                &[*render_device.graphics_queue()],
            )
        })
        .collect::<Result<_, _>>()?;

    let texture = Image::new(
        &memory,
        vk::Extent3D {
            width: 256,
            height: 256,
            depth: 1,
        },
        vk::ImageType::TYPE_2D,
        1,
        1,
        vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
        vk::Format::R8G8B8A8_SRGB,
        vk::ImageTiling::OPTIMAL,
    )?;
    log::info!("Texture {:#?}", texture);

    let uniform_pool = uniforms[0].memory_block().pool();
    log::info!(
        "{} pools, uniform pool has {}/{} free chunks",
        memory.pool_count(),
        uniform_pool.free_chunk_count(),
        uniform_pool.chunk_count()
    );

    drop(uniforms);
    drop(texture);
    vertices.release();

    memory.shutdown();
    render_device.wait_idle()?;
    Ok(())
}
