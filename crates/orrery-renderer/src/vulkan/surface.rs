//! Surface capability queries and format/present-mode selection.

use ash::vk;

use super::VulkanContext;

/// Presentation parameters chosen for the context's surface.
///
/// Capabilities go stale on resize; call [`SurfaceDetails::refresh`] before
/// recreating the swapchain.
pub struct SurfaceDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
}

impl SurfaceDetails {
    /// Query the surface and choose a format and present mode.
    pub unsafe fn query(ctx: &VulkanContext, vsync: bool) -> Result<Self, String> {
        let capabilities = ctx
            .surface_loader
            .get_physical_device_surface_capabilities(ctx.physical_device, ctx.surface)
            .map_err(|e| format!("Failed to get surface capabilities: {:?}", e))?;

        let formats = ctx
            .surface_loader
            .get_physical_device_surface_formats(ctx.physical_device, ctx.surface)
            .map_err(|e| format!("Failed to get surface formats: {:?}", e))?;
        let format = choose_surface_format(&formats);

        let present_modes = ctx
            .surface_loader
            .get_physical_device_surface_present_modes(ctx.physical_device, ctx.surface)
            .map_err(|e| format!("Failed to get present modes: {:?}", e))?;
        let present_mode = choose_present_mode(&present_modes, vsync);

        log::info!(
            "surface: {:?} / {:?}, present mode {:?}",
            format.format,
            format.color_space,
            present_mode
        );

        Ok(Self {
            capabilities,
            format,
            present_mode,
        })
    }

    /// Refresh surface capabilities (e.g., after window resize).
    pub unsafe fn refresh(&mut self, ctx: &VulkanContext) -> Result<(), String> {
        self.capabilities = ctx
            .surface_loader
            .get_physical_device_surface_capabilities(ctx.physical_device, ctx.surface)
            .map_err(|e| format!("Failed to refresh surface capabilities: {:?}", e))?;
        Ok(())
    }

    /// Get the swapchain extent, clamped to surface capabilities.
    pub fn clamped_extent(&self, desired_width: u32, desired_height: u32) -> vk::Extent2D {
        clamp_extent(&self.capabilities, desired_width, desired_height)
    }
}

/// Choose the best surface format, preferring SRGB B8G8R8A8.
fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    for format in formats {
        if format.format == vk::Format::B8G8R8A8_SRGB
            && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        {
            return *format;
        }
    }

    // Fallback to UNORM B8G8R8A8
    for format in formats {
        if format.format == vk::Format::B8G8R8A8_UNORM {
            return *format;
        }
    }

    // Just use the first available
    formats.first().copied().unwrap_or(vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_UNORM,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    })
}

/// Choose the best present mode.
fn choose_present_mode(modes: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        // FIFO is guaranteed to be available
        return vk::PresentModeKHR::FIFO;
    }

    // Prefer mailbox (triple-buffering with low latency)
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        return vk::PresentModeKHR::MAILBOX;
    }

    // Immediate (no vsync, may tear)
    if modes.contains(&vk::PresentModeKHR::IMMEDIATE) {
        return vk::PresentModeKHR::IMMEDIATE;
    }

    vk::PresentModeKHR::FIFO
}

/// Resolve the extent: the surface dictates it unless `current_extent` is the
/// u32::MAX sentinel, in which case the framebuffer size is clamped in.
fn clamp_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(f: vk::Format, cs: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format: f,
            color_space: cs,
        }
    }

    // ============================================================
    // choose_surface_format
    // ============================================================

    #[test]
    fn test_prefers_bgra8_srgb() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn test_falls_back_to_bgra8_unorm() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn test_falls_back_to_first_format() {
        let formats = [format(
            vk::Format::R16G16B16A16_SFLOAT,
            vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
        )];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::R16G16B16A16_SFLOAT);
    }

    #[test]
    fn test_empty_format_list_synthesizes_default() {
        let chosen = choose_surface_format(&[]);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
    }

    // ============================================================
    // choose_present_mode
    // ============================================================

    #[test]
    fn test_vsync_always_fifo() {
        let modes = [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes, true), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_no_vsync_prefers_mailbox() {
        let modes = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
        ];
        assert_eq!(
            choose_present_mode(&modes, false),
            vk::PresentModeKHR::MAILBOX
        );
    }

    #[test]
    fn test_no_vsync_falls_back_to_immediate() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(
            choose_present_mode(&modes, false),
            vk::PresentModeKHR::IMMEDIATE
        );
    }

    #[test]
    fn test_no_vsync_falls_back_to_fifo() {
        let modes = [vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes, false), vk::PresentModeKHR::FIFO);
    }

    // ============================================================
    // clamp_extent
    // ============================================================

    fn caps(current: (u32, u32), min: (u32, u32), max: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D {
                width: min.0,
                height: min.1,
            },
            max_image_extent: vk::Extent2D {
                width: max.0,
                height: max.1,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_surface_defined_extent_wins() {
        let capabilities = caps((1920, 1080), (1, 1), (4096, 4096));
        let extent = clamp_extent(&capabilities, 640, 480);
        assert_eq!(extent.width, 1920);
        assert_eq!(extent.height, 1080);
    }

    #[test]
    fn test_undefined_extent_clamps_desired() {
        let capabilities = caps((u32::MAX, u32::MAX), (200, 200), (1000, 1000));
        let extent = clamp_extent(&capabilities, 4000, 100);
        assert_eq!(extent.width, 1000);
        assert_eq!(extent.height, 200);
    }

    #[test]
    fn test_undefined_extent_passes_in_range_values() {
        let capabilities = caps((u32::MAX, u32::MAX), (1, 1), (4096, 4096));
        let extent = clamp_extent(&capabilities, 800, 600);
        assert_eq!(extent.width, 800);
        assert_eq!(extent.height, 600);
    }
}
