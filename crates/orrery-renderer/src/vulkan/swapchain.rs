//! Vulkan swapchain management with per-frame synchronization.

use ash::vk;

use super::surface::SurfaceDetails;
use super::VulkanContext;

/// Number of frames the CPU may record ahead of the GPU (double-buffering).
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Per-frame synchronization primitives.
pub struct FrameSync {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    pub in_flight: vk::Fence,
}

/// Vulkan swapchain with synchronization.
pub struct Swapchain {
    pub handle: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub frame_sync: Vec<FrameSync>,
    pub current_frame: usize,
    pub image_index: u32,
}

impl Swapchain {
    /// Create a new swapchain for the context's surface.
    pub unsafe fn new(
        ctx: &VulkanContext,
        surface: &SurfaceDetails,
        width: u32,
        height: u32,
    ) -> Result<Self, String> {
        let (handle, images, image_views, extent) =
            Self::create_resources(ctx, surface, width, height, None)?;

        let frame_sync = Self::create_sync_objects(ctx)?;

        Ok(Self {
            handle,
            images,
            image_views,
            format: surface.format.format,
            extent,
            frame_sync,
            current_frame: 0,
            image_index: 0,
        })
    }

    /// Create the swapchain handle, images and views.
    ///
    /// Passing the previous swapchain as `old_swapchain` lets the driver
    /// recycle its resources; the old handle is destroyed once the new one
    /// exists.
    unsafe fn create_resources(
        ctx: &VulkanContext,
        surface: &SurfaceDetails,
        width: u32,
        height: u32,
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> Result<(vk::SwapchainKHR, Vec<vk::Image>, Vec<vk::ImageView>, vk::Extent2D), String> {
        let extent = surface.clamped_extent(width, height);
        let image_count = select_image_count(
            surface.capabilities.min_image_count,
            surface.capabilities.max_image_count,
        );

        let queue_family_indices = [
            ctx.queue_families.graphics.unwrap_or(0),
            ctx.queue_families.present.unwrap_or(0),
        ];

        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(ctx.surface)
            .min_image_count(image_count)
            .image_format(surface.format.format)
            .image_color_space(surface.format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(surface.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(surface.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain.unwrap_or(vk::SwapchainKHR::null()));

        // Images shared across two queue families need concurrent mode.
        create_info = if ctx.unified_queue_family() {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        } else {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&queue_family_indices)
        };

        let handle = ctx
            .swapchain_loader
            .create_swapchain(&create_info, None)
            .map_err(|e| format!("Failed to create swapchain: {:?}", e))?;

        if let Some(old) = old_swapchain {
            ctx.swapchain_loader.destroy_swapchain(old, None);
        }

        let images = ctx
            .swapchain_loader
            .get_swapchain_images(handle)
            .map_err(|e| format!("Failed to get swapchain images: {:?}", e))?;

        let image_views = Self::create_image_views(ctx, &images, surface.format.format)?;

        log::debug!(
            "swapchain: {} images at {}x{}",
            images.len(),
            extent.width,
            extent.height
        );

        Ok((handle, images, image_views, extent))
    }

    /// Create image views for swapchain images.
    unsafe fn create_image_views(
        ctx: &VulkanContext,
        images: &[vk::Image],
        format: vk::Format,
    ) -> Result<Vec<vk::ImageView>, String> {
        images
            .iter()
            .map(|&image| {
                let create_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                ctx.device
                    .create_image_view(&create_info, None)
                    .map_err(|e| format!("Failed to create image view: {:?}", e))
            })
            .collect()
    }

    /// Create synchronization objects for each frame in flight.
    ///
    /// Fences start signaled so the first wait on each frame passes.
    unsafe fn create_sync_objects(ctx: &VulkanContext) -> Result<Vec<FrameSync>, String> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

        (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| {
                let image_available = ctx
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .map_err(|e| format!("Failed to create semaphore: {:?}", e))?;
                let render_finished = ctx
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .map_err(|e| format!("Failed to create semaphore: {:?}", e))?;
                let in_flight = ctx
                    .device
                    .create_fence(&fence_info, None)
                    .map_err(|e| format!("Failed to create fence: {:?}", e))?;

                Ok(FrameSync {
                    image_available,
                    render_finished,
                    in_flight,
                })
            })
            .collect()
    }

    /// Acquire the next swapchain image.
    ///
    /// Waits for the current frame's fence first, so the frame's command
    /// buffer and uniform buffer are no longer in use by the GPU.
    ///
    /// Returns `Ok(true)` if an image was acquired, `Ok(false)` if the
    /// swapchain is out of date and must be recreated.
    pub unsafe fn acquire(&mut self, ctx: &VulkanContext) -> Result<bool, String> {
        let sync = &self.frame_sync[self.current_frame];

        ctx.device
            .wait_for_fences(&[sync.in_flight], true, u64::MAX)
            .map_err(|e| format!("Failed to wait for fence: {:?}", e))?;

        let result = ctx.swapchain_loader.acquire_next_image(
            self.handle,
            u64::MAX,
            sync.image_available,
            vk::Fence::null(),
        );

        match result {
            // Suboptimal at acquire time: keep rendering this frame, present
            // will report it again and trigger recreation.
            Ok((index, _suboptimal)) => {
                self.image_index = index;
                Ok(true)
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(false),
            Err(e) => Err(format!("Failed to acquire swapchain image: {:?}", e)),
        }
    }

    /// Present the current frame.
    ///
    /// Returns `Ok(true)` if presented, `Ok(false)` if the swapchain needs
    /// recreation. Either way the frame index advances.
    pub unsafe fn present(&mut self, ctx: &VulkanContext) -> Result<bool, String> {
        let sync = &self.frame_sync[self.current_frame];

        let swapchains = [self.handle];
        let image_indices = [self.image_index];
        let wait_semaphores = [sync.render_finished];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = ctx
            .swapchain_loader
            .queue_present(ctx.present_queue, &present_info);

        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;

        match result {
            Ok(false) => Ok(true),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(false),
            Err(e) => Err(format!("Failed to present: {:?}", e)),
        }
    }

    /// Get the current frame's synchronization primitives.
    pub fn current_sync(&self) -> &FrameSync {
        &self.frame_sync[self.current_frame]
    }

    /// Reset the current frame's fence (call right before submitting).
    pub unsafe fn reset_fence(&self, ctx: &VulkanContext) -> Result<(), String> {
        let sync = &self.frame_sync[self.current_frame];
        ctx.device
            .reset_fences(&[sync.in_flight])
            .map_err(|e| format!("Failed to reset fence: {:?}", e))
    }

    /// Recreate the swapchain (e.g., after window resize).
    ///
    /// Sync objects survive recreation; only the handle, images and views are
    /// rebuilt.
    pub unsafe fn recreate(
        &mut self,
        ctx: &VulkanContext,
        surface: &SurfaceDetails,
        width: u32,
        height: u32,
    ) -> Result<(), String> {
        ctx.wait_idle();

        for view in &self.image_views {
            ctx.device.destroy_image_view(*view, None);
        }

        let (handle, images, image_views, extent) =
            Self::create_resources(ctx, surface, width, height, Some(self.handle))?;

        self.handle = handle;
        self.images = images;
        self.image_views = image_views;
        self.format = surface.format.format;
        self.extent = extent;

        Ok(())
    }

    /// Destroy the swapchain and all associated resources.
    pub unsafe fn destroy(&mut self, ctx: &VulkanContext) {
        ctx.wait_idle();

        for sync in &self.frame_sync {
            ctx.device.destroy_semaphore(sync.image_available, None);
            ctx.device.destroy_semaphore(sync.render_finished, None);
            ctx.device.destroy_fence(sync.in_flight, None);
        }
        self.frame_sync.clear();

        for view in &self.image_views {
            ctx.device.destroy_image_view(*view, None);
        }
        self.image_views.clear();

        ctx.swapchain_loader.destroy_swapchain(self.handle, None);
        self.handle = vk::SwapchainKHR::null();
    }
}

/// One more image than the driver minimum, clamped to the maximum
/// (`max == 0` means unbounded).
fn select_image_count(min_image_count: u32, max_image_count: u32) -> u32 {
    let desired = min_image_count + 1;
    if max_image_count == 0 {
        desired
    } else {
        desired.min(max_image_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================
    // select_image_count
    // ============================================================

    #[test]
    fn test_one_more_than_minimum() {
        assert_eq!(select_image_count(2, 8), 3);
    }

    #[test]
    fn test_clamped_to_maximum() {
        assert_eq!(select_image_count(3, 3), 3);
    }

    #[test]
    fn test_zero_maximum_means_unbounded() {
        assert_eq!(select_image_count(4, 0), 5);
    }

    #[test]
    fn test_frames_in_flight_is_double_buffered() {
        assert_eq!(MAX_FRAMES_IN_FLIGHT, 2);
    }
}
