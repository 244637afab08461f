//! Renderer orchestration: bring-up, the per-frame loop, recreation, teardown.

use std::time::Instant;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::mesh::{QUAD_INDICES, QUAD_VERTICES};
use crate::scene::SceneUniforms;
use crate::shader;
use crate::vulkan::pipeline::{create_framebuffers, destroy_framebuffers};
use crate::vulkan::surface::SurfaceDetails;
use crate::vulkan::{
    Buffer, CommandManager, DescriptorManager, MemoryManager, RenderPipeline, Swapchain,
    VulkanContext, MAX_FRAMES_IN_FLIGHT,
};

/// Clear color for the single render pass (opaque black).
const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// The renderer: owns every GPU object and drives the frame loop.
///
/// Field order matters for teardown: the memory manager must drop before the
/// context (its allocator frees device memory), and the context drops last.
pub struct Renderer {
    // Frame resources
    vertex_buffer: Option<Buffer>,
    index_buffer: Option<Buffer>,
    uniform_buffers: Vec<Buffer>,
    index_count: u32,

    framebuffers: Vec<vk::Framebuffer>,
    pipeline: RenderPipeline,
    descriptors: DescriptorManager,
    commands: CommandManager,
    swapchain: Swapchain,
    surface: SurfaceDetails,

    // Frame-loop state
    start_time: Instant,
    window_size: (u32, u32),
    swapchain_stale: bool,

    // Dropped last: allocator before device, device/surface/instance at the end.
    memory: MemoryManager,
    ctx: VulkanContext,
}

impl Renderer {
    /// Run the full bring-up sequence against an existing window.
    ///
    /// The window must already have a non-zero inner size.
    pub fn new(window: &winit::window::Window, config: &RendererConfig) -> Result<Self, RenderError> {
        let display_handle = window
            .display_handle()
            .map_err(|e| RenderError::Other(format!("failed to get display handle: {:?}", e)))?
            .as_raw();
        let window_handle = window
            .window_handle()
            .map_err(|e| RenderError::Other(format!("failed to get window handle: {:?}", e)))?
            .as_raw();

        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        // Everything below is raw Vulkan; handles stay valid because the
        // renderer owns them until teardown.
        unsafe {
            let ctx = VulkanContext::new(
                display_handle,
                window_handle,
                &config.app_name,
                config.validation,
            )
            .map_err(RenderError::NoSuitableDevice)?;

            let surface = SurfaceDetails::query(&ctx, config.vsync)?;
            let swapchain = Swapchain::new(&ctx, &surface, width, height)?;

            let vert_spv = shader::load_spirv(&config.shader_path("mesh.vert.spv"))?;
            let frag_spv = shader::load_spirv(&config.shader_path("mesh.frag.spv"))?;

            let mut descriptors = DescriptorManager::new(&ctx)?;
            let pipeline = RenderPipeline::new(
                &ctx.device,
                swapchain.format,
                descriptors.set_layout(),
                &vert_spv,
                &frag_spv,
            )?;

            let framebuffers = create_framebuffers(
                &ctx.device,
                pipeline.render_pass,
                &swapchain.image_views,
                swapchain.extent,
            )?;

            let commands = CommandManager::new(&ctx)?;
            let memory = MemoryManager::new(&ctx)?;

            let vertex_buffer =
                Self::upload_mesh_buffer(&ctx, &memory, &commands, &QUAD_VERTICES, true)?;
            let index_buffer =
                Self::upload_mesh_buffer(&ctx, &memory, &commands, &QUAD_INDICES, false)?;

            let mut uniform_buffers = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
            for i in 0..MAX_FRAMES_IN_FLIGHT {
                uniform_buffers.push(
                    memory.create_uniform_buffer(SceneUniforms::size(), &format!("scene ubo {}", i))?,
                );
            }

            descriptors.allocate_per_frame_sets(&ctx, &uniform_buffers, SceneUniforms::size())?;

            log::info!("renderer initialized at {}x{}", width, height);

            Ok(Self {
                vertex_buffer: Some(vertex_buffer),
                index_buffer: Some(index_buffer),
                uniform_buffers,
                index_count: QUAD_INDICES.len() as u32,
                framebuffers,
                pipeline,
                descriptors,
                commands,
                swapchain,
                surface,
                start_time: Instant::now(),
                window_size: (width, height),
                swapchain_stale: false,
                memory,
                ctx,
            })
        }
    }

    /// Upload a mesh buffer through a staging buffer and a one-shot copy.
    unsafe fn upload_mesh_buffer<T: bytemuck::Pod>(
        ctx: &VulkanContext,
        memory: &MemoryManager,
        commands: &CommandManager,
        data: &[T],
        vertex: bool,
    ) -> Result<Buffer, String> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let size = bytes.len() as vk::DeviceSize;

        let staging = memory.create_staging_buffer(size, "mesh staging")?;
        staging.write(bytes);

        let buffer = if vertex {
            memory.create_vertex_buffer(size, "mesh vertices")?
        } else {
            memory.create_index_buffer(size, "mesh indices")?
        };

        let cmd = commands.begin_single_time()?;
        commands.copy_buffer(cmd, staging.handle, buffer.handle, size);
        commands.end_single_time(ctx, cmd)?;

        memory.destroy_buffer(staging);

        Ok(buffer)
    }

    /// Note a window resize. The swapchain is rebuilt lazily on the next
    /// frame; a zero-sized window suspends rendering entirely.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
        self.swapchain_stale = true;
    }

    /// True while the window is minimized (nothing to render to).
    fn suspended(&self) -> bool {
        self.window_size.0 == 0 || self.window_size.1 == 0
    }

    /// Render one frame: acquire, update uniforms, record, submit, present.
    pub fn draw_frame(&mut self) -> Result<(), RenderError> {
        if self.suspended() {
            return Ok(());
        }

        if self.swapchain_stale {
            self.recreate_swapchain()?;
        }

        unsafe {
            // Waits on this frame's fence, so its command and uniform buffers
            // are free for reuse.
            if !self.swapchain.acquire(&self.ctx)? {
                self.swapchain_stale = true;
                return Ok(());
            }

            let frame_index = self.swapchain.current_frame;

            let elapsed = self.start_time.elapsed().as_secs_f32();
            let uniforms = SceneUniforms::for_frame(
                elapsed,
                self.swapchain.extent.width,
                self.swapchain.extent.height,
            );
            self.uniform_buffers[frame_index].write(&[uniforms]);

            self.swapchain.reset_fence(&self.ctx)?;

            let cmd = self.commands.begin_frame(frame_index)?;
            self.record_frame(cmd, frame_index);
            self.commands.end_frame(frame_index)?;

            let sync = self.swapchain.current_sync();
            self.commands.submit_frame(
                &self.ctx,
                frame_index,
                sync.image_available,
                sync.render_finished,
                sync.in_flight,
            )?;

            if !self.swapchain.present(&self.ctx)? {
                self.swapchain_stale = true;
            }
        }

        Ok(())
    }

    /// Record the frame's render pass into `cmd`.
    unsafe fn record_frame(&self, cmd: vk::CommandBuffer, frame_index: usize) {
        let device = &self.ctx.device;
        let extent = self.swapchain.extent;

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: CLEAR_COLOR,
            },
        }];

        let render_pass_begin = vk::RenderPassBeginInfo::default()
            .render_pass(self.pipeline.render_pass)
            .framebuffer(self.framebuffers[self.swapchain.image_index as usize])
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values);

        device.cmd_begin_render_pass(cmd, &render_pass_begin, vk::SubpassContents::INLINE);
        device.cmd_bind_pipeline(
            cmd,
            vk::PipelineBindPoint::GRAPHICS,
            self.pipeline.pipeline,
        );

        // Viewport and scissor are dynamic pipeline state.
        let viewport = vk::Viewport::default()
            .width(extent.width as f32)
            .height(extent.height as f32)
            .min_depth(0.0)
            .max_depth(1.0);
        device.cmd_set_viewport(cmd, 0, &[viewport]);

        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        device.cmd_set_scissor(cmd, 0, &[scissor]);

        if let (Some(vertex_buffer), Some(index_buffer)) =
            (&self.vertex_buffer, &self.index_buffer)
        {
            device.cmd_bind_vertex_buffers(cmd, 0, &[vertex_buffer.handle], &[0]);
            device.cmd_bind_index_buffer(cmd, index_buffer.handle, 0, vk::IndexType::UINT32);
            device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.layout,
                0,
                &[self.descriptors.frame_set(frame_index)],
                &[],
            );
            device.cmd_draw_indexed(cmd, self.index_count, 1, 0, 0, 0);
        }

        device.cmd_end_render_pass(cmd);
    }

    /// Rebuild the swapchain and framebuffers after a resize or an
    /// out-of-date report from acquire/present.
    fn recreate_swapchain(&mut self) -> Result<(), RenderError> {
        let (width, height) = self.window_size;
        if self.suspended() {
            return Ok(());
        }

        unsafe {
            self.surface.refresh(&self.ctx)?;
            self.swapchain
                .recreate(&self.ctx, &self.surface, width, height)?;

            destroy_framebuffers(&self.ctx.device, &mut self.framebuffers);
            self.framebuffers = create_framebuffers(
                &self.ctx.device,
                self.pipeline.render_pass,
                &self.swapchain.image_views,
                self.swapchain.extent,
            )?;
        }

        self.swapchain_stale = false;
        log::debug!(
            "swapchain recreated at {}x{}",
            self.swapchain.extent.width,
            self.swapchain.extent.height
        );
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Reverse creation order; the GPU must be idle before anything goes.
        self.ctx.wait_idle();
        unsafe {
            if let Some(buffer) = self.vertex_buffer.take() {
                self.memory.destroy_buffer(buffer);
            }
            if let Some(buffer) = self.index_buffer.take() {
                self.memory.destroy_buffer(buffer);
            }
            for buffer in self.uniform_buffers.drain(..) {
                self.memory.destroy_buffer(buffer);
            }

            destroy_framebuffers(&self.ctx.device, &mut self.framebuffers);
            self.pipeline.destroy(&self.ctx.device);
            self.descriptors.destroy(&self.ctx);
            self.commands.destroy(&self.ctx);
            self.swapchain.destroy(&self.ctx);
        }
        // `memory` (the allocator) and `ctx` drop afterwards, in field order.
    }
}
