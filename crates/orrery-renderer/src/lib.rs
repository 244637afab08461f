//! Orrery renderer: a single-mesh Vulkan renderer.
//!
//! The crate owns the full GPU bring-up sequence and per-frame loop:
//! - instance/device initialization with optional validation layers
//! - swapchain management including resize/recreation
//! - render pass and graphics pipeline construction
//! - buffer allocation (staged vertex/index data, mapped per-frame uniforms)
//! - double-buffered frame submission with explicit CPU-GPU synchronization
//!
//! Windowing is the caller's concern: [`Renderer::new`] takes a winit window
//! and everything else happens behind [`Renderer::draw_frame`].

pub mod config;
pub mod error;
pub mod mesh;
pub mod renderer;
pub mod scene;
pub mod shader;
pub mod vulkan;

pub use config::RendererConfig;
pub use error::RenderError;
pub use renderer::Renderer;
