//! Direct Vulkan backend via ash.
//!
//! Bring-up order mirrors the renderer's needs: context (instance + device),
//! surface, swapchain, then the frame-level managers (memory, commands,
//! descriptors) and the single render pass + pipeline.

pub mod commands;
pub mod context;
pub mod descriptors;
pub mod memory;
pub mod pipeline;
pub mod surface;
pub mod swapchain;

pub use commands::CommandManager;
pub use context::VulkanContext;
pub use descriptors::DescriptorManager;
pub use memory::{Buffer, MemoryManager};
pub use pipeline::RenderPipeline;
pub use surface::SurfaceDetails;
pub use swapchain::{Swapchain, MAX_FRAMES_IN_FLIGHT};

use ash::vk;
use std::ffi::CStr;

/// Minimum Vulkan version the renderer requires.
pub const REQUIRED_VK_VERSION: u32 = vk::make_api_version(0, 1, 3, 0);

/// Engine name reported to the Vulkan instance.
pub const ENGINE_NAME: &CStr = c"Orrery Engine";

/// Engine version reported to the Vulkan instance.
pub const ENGINE_VERSION: u32 = vk::make_api_version(0, 0, 1, 0);
