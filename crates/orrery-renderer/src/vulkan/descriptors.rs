//! Descriptor pool, layout and sets for the per-frame uniform buffer.

use ash::vk;

use super::memory::Buffer;
use super::swapchain::MAX_FRAMES_IN_FLIGHT;
use super::VulkanContext;

/// Manages the descriptor pool, the per-frame set layout and one descriptor
/// set per frame in flight, each pointing at that frame's uniform buffer.
pub struct DescriptorManager {
    pool: vk::DescriptorPool,
    layout: vk::DescriptorSetLayout,
    sets: Vec<vk::DescriptorSet>,
}

impl DescriptorManager {
    /// Create the pool and layout. Sets are allocated separately once the
    /// uniform buffers exist.
    pub unsafe fn new(ctx: &VulkanContext) -> Result<Self, String> {
        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: MAX_FRAMES_IN_FLIGHT as u32,
        }];

        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(MAX_FRAMES_IN_FLIGHT as u32);

        let pool = ctx
            .device
            .create_descriptor_pool(&pool_info, None)
            .map_err(|e| format!("Failed to create descriptor pool: {:?}", e))?;

        // Set 0, binding 0: the scene uniform block, read by the vertex stage.
        let bindings = [vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX)];

        let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

        let layout = ctx
            .device
            .create_descriptor_set_layout(&layout_info, None)
            .map_err(|e| format!("Failed to create descriptor set layout: {:?}", e))?;

        Ok(Self {
            pool,
            layout,
            sets: Vec::new(),
        })
    }

    /// Allocate one set per frame in flight and bind each to its uniform
    /// buffer for the full `range`.
    pub unsafe fn allocate_per_frame_sets(
        &mut self,
        ctx: &VulkanContext,
        uniform_buffers: &[Buffer],
        range: vk::DeviceSize,
    ) -> Result<(), String> {
        if uniform_buffers.len() != MAX_FRAMES_IN_FLIGHT {
            return Err(format!(
                "Expected {} uniform buffers, got {}",
                MAX_FRAMES_IN_FLIGHT,
                uniform_buffers.len()
            ));
        }

        let layouts = [self.layout; MAX_FRAMES_IN_FLIGHT];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        self.sets = ctx
            .device
            .allocate_descriptor_sets(&alloc_info)
            .map_err(|e| format!("Failed to allocate descriptor sets: {:?}", e))?;

        for (set, buffer) in self.sets.iter().zip(uniform_buffers) {
            let buffer_info = [vk::DescriptorBufferInfo::default()
                .buffer(buffer.handle)
                .offset(0)
                .range(range)];

            let write = vk::WriteDescriptorSet::default()
                .dst_set(*set)
                .dst_binding(0)
                .dst_array_element(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(&buffer_info);

            ctx.device.update_descriptor_sets(&[write], &[]);
        }

        Ok(())
    }

    /// The per-frame descriptor set layout (for pipeline-layout creation).
    pub fn set_layout(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// The descriptor set for a frame in flight.
    pub fn frame_set(&self, frame_index: usize) -> vk::DescriptorSet {
        self.sets[frame_index]
    }

    /// Destroy the pool and layout (sets go down with the pool).
    pub unsafe fn destroy(&mut self, ctx: &VulkanContext) {
        ctx.device.destroy_descriptor_pool(self.pool, None);
        ctx.device.destroy_descriptor_set_layout(self.layout, None);
        self.sets.clear();
    }
}
