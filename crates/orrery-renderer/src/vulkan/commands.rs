//! Command buffer management and submission.

use ash::vk;

use super::swapchain::MAX_FRAMES_IN_FLIGHT;
use super::VulkanContext;

/// Command pool and primary buffer for a single frame in flight.
pub struct FrameCommands {
    pub pool: vk::CommandPool,
    pub primary: vk::CommandBuffer,
}

/// Command buffer manager with per-frame pools and a transient pool for
/// one-shot transfer work.
pub struct CommandManager {
    frames: Vec<FrameCommands>,
    transient_pool: vk::CommandPool,
    device: ash::Device,
}

impl CommandManager {
    /// Create a new command manager.
    pub unsafe fn new(ctx: &VulkanContext) -> Result<Self, String> {
        let graphics_family = ctx
            .queue_families
            .graphics
            .ok_or("No graphics queue family")?;

        // Per-frame command pools
        let mut frames = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let pool = ctx
                .device
                .create_command_pool(&pool_info, None)
                .map_err(|e| format!("Failed to create command pool: {:?}", e))?;

            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let primary = ctx
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| format!("Failed to allocate command buffer: {:?}", e))?[0];

            frames.push(FrameCommands { pool, primary });
        }

        // Transient pool for one-shot commands (staging uploads)
        let transient_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(graphics_family)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT);

        let transient_pool = ctx
            .device
            .create_command_pool(&transient_info, None)
            .map_err(|e| format!("Failed to create transient pool: {:?}", e))?;

        Ok(Self {
            frames,
            transient_pool,
            device: ctx.device.clone(),
        })
    }

    /// Begin recording commands for a frame.
    ///
    /// The frame's fence must have been waited on before this; the buffer is
    /// reset and restarted.
    pub unsafe fn begin_frame(&self, frame_index: usize) -> Result<vk::CommandBuffer, String> {
        let frame = &self.frames[frame_index];

        self.device
            .reset_command_buffer(frame.primary, vk::CommandBufferResetFlags::empty())
            .map_err(|e| format!("Failed to reset command buffer: {:?}", e))?;

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        self.device
            .begin_command_buffer(frame.primary, &begin_info)
            .map_err(|e| format!("Failed to begin command buffer: {:?}", e))?;

        Ok(frame.primary)
    }

    /// End recording commands for a frame.
    pub unsafe fn end_frame(&self, frame_index: usize) -> Result<(), String> {
        let frame = &self.frames[frame_index];
        self.device
            .end_command_buffer(frame.primary)
            .map_err(|e| format!("Failed to end command buffer: {:?}", e))
    }

    /// Submit the frame's commands to the graphics queue.
    ///
    /// Waits on `wait_semaphore` at color-attachment output (the swapchain
    /// image must be available before anything is written to it), signals
    /// `signal_semaphore` for present and `fence` for the CPU.
    pub unsafe fn submit_frame(
        &self,
        ctx: &VulkanContext,
        frame_index: usize,
        wait_semaphore: vk::Semaphore,
        signal_semaphore: vk::Semaphore,
        fence: vk::Fence,
    ) -> Result<(), String> {
        let frame = &self.frames[frame_index];

        let wait_semaphores = [wait_semaphore];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [signal_semaphore];
        let command_buffers = [frame.primary];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        ctx.device
            .queue_submit(ctx.graphics_queue, &[submit_info], fence)
            .map_err(|e| format!("Failed to submit command buffer: {:?}", e))
    }

    /// Begin a single-use command buffer from the transient pool.
    pub unsafe fn begin_single_time(&self) -> Result<vk::CommandBuffer, String> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.transient_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let cmd = self
            .device
            .allocate_command_buffers(&alloc_info)
            .map_err(|e| format!("Failed to allocate command buffer: {:?}", e))?[0];

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        self.device
            .begin_command_buffer(cmd, &begin_info)
            .map_err(|e| format!("Failed to begin command buffer: {:?}", e))?;

        Ok(cmd)
    }

    /// End and submit a single-use command buffer, waiting for completion.
    pub unsafe fn end_single_time(
        &self,
        ctx: &VulkanContext,
        cmd: vk::CommandBuffer,
    ) -> Result<(), String> {
        self.device
            .end_command_buffer(cmd)
            .map_err(|e| format!("Failed to end command buffer: {:?}", e))?;

        let command_buffers = [cmd];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        ctx.device
            .queue_submit(ctx.graphics_queue, &[submit_info], vk::Fence::null())
            .map_err(|e| format!("Failed to submit command buffer: {:?}", e))?;

        // Blocking wait so the caller may free staging resources immediately.
        ctx.device
            .queue_wait_idle(ctx.graphics_queue)
            .map_err(|e| format!("Failed to wait for queue: {:?}", e))?;

        self.device
            .free_command_buffers(self.transient_pool, &command_buffers);

        Ok(())
    }

    /// Record a buffer-to-buffer copy.
    pub unsafe fn copy_buffer(
        &self,
        cmd: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Buffer,
        size: vk::DeviceSize,
    ) {
        let region = vk::BufferCopy::default()
            .src_offset(0)
            .dst_offset(0)
            .size(size);
        self.device.cmd_copy_buffer(cmd, src, dst, &[region]);
    }

    /// Destroy all command pools.
    pub unsafe fn destroy(&mut self, ctx: &VulkanContext) {
        for frame in &self.frames {
            ctx.device.destroy_command_pool(frame.pool, None);
        }
        self.frames.clear();
        ctx.device.destroy_command_pool(self.transient_pool, None);
    }
}
