use ash::vk;

/// A Vulkan device queue.
#[derive(Debug, Clone, Copy)]
pub struct Queue {
    queue: vk::Queue,
    flags: vk::QueueFlags,
    family_index: u32,
    index: u32,
}

// Public API
// ----------

impl Queue {
    /// Wrap a raw queue handle.
    pub fn from_raw(
        queue: vk::Queue,
        flags: vk::QueueFlags,
        family_index: u32,
        index: u32,
    ) -> Self {
        Self {
            queue,
            flags,
            family_index,
            index,
        }
    }

    /// The queue family flags.
    pub fn family_flags(&self) -> vk::QueueFlags {
        self.flags
    }

    /// The queue family index for this queue.
    pub fn family_index(&self) -> u32 {
        self.family_index
    }

    /// The raw Vulkan queue handle.
    ///
    /// # Safety
    ///
    /// Unsafe because ownership is not transferred and the caller must
    /// externally synchronize submissions.
    pub unsafe fn raw(&self) -> vk::Queue {
        self.queue
    }
}

impl std::fmt::Display for Queue {
    fn fmt(&self, format: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        format.write_fmt(format_args!(
            "Queue {}:{} - {:?}",
            self.family_index, self.index, self.flags,
        ))
    }
}

/// Pick the sharing mode for a resource used by the given queues.
///
/// Resources are exclusive unless they are used by queues from at least two
/// distinct families. Returns the sorted, deduplicated family indices to use
/// with CONCURRENT sharing.
pub fn sharing_mode_for(queues: &[Queue]) -> (vk::SharingMode, Vec<u32>) {
    let mut families: Vec<u32> =
        queues.iter().map(Queue::family_index).collect();
    families.sort_unstable();
    families.dedup();
    if families.len() < 2 {
        if !queues.is_empty() {
            log::debug!(
                "Queues {:?} share one family, using exclusive sharing",
                families
            );
        }
        return (vk::SharingMode::EXCLUSIVE, vec![]);
    }
    (vk::SharingMode::CONCURRENT, families)
}
