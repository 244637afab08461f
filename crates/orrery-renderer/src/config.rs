//! Renderer configuration.
//!
//! Plain data with validated defaults. Environment variables override the
//! defaults so behavior can be changed without recompiling:
//! `ORRERY_VALIDATION`, `ORRERY_VSYNC`, `ORRERY_SHADER_DIR`.

use std::path::PathBuf;

/// Renderer options, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Application name reported to the Vulkan instance.
    pub app_name: String,
    /// Initial window width in physical pixels.
    pub window_width: u32,
    /// Initial window height in physical pixels.
    pub window_height: u32,
    /// When true, presentation uses FIFO; otherwise MAILBOX is preferred.
    pub vsync: bool,
    /// Whether to request VK_LAYER_KHRONOS_validation.
    pub validation: bool,
    /// Directory holding the pre-compiled `.spv` shader blobs.
    pub shader_dir: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "Orrery".to_string(),
            window_width: 1280,
            window_height: 720,
            vsync: true,
            validation: cfg!(debug_assertions),
            shader_dir: PathBuf::from("shaders"),
        }
    }
}

impl RendererConfig {
    /// Build a config from defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(validation) = env_flag("ORRERY_VALIDATION") {
            config.validation = validation;
        }
        if let Some(vsync) = env_flag("ORRERY_VSYNC") {
            config.vsync = vsync;
        }
        if let Ok(dir) = std::env::var("ORRERY_SHADER_DIR") {
            if !dir.is_empty() {
                config.shader_dir = PathBuf::from(dir);
            }
        }

        config.sanitized()
    }

    /// Clamp out-of-range values instead of failing startup.
    pub fn sanitized(mut self) -> Self {
        if self.window_width == 0 {
            log::warn!("window width 0 requested, clamping to 1");
            self.window_width = 1;
        }
        if self.window_height == 0 {
            log::warn!("window height 0 requested, clamping to 1");
            self.window_height = 1;
        }
        self
    }

    /// Path of a shader blob inside the configured shader directory.
    pub fn shader_path(&self, name: &str) -> PathBuf {
        self.shader_dir.join(name)
    }
}

/// Parse a boolean environment flag: "1"/"true" => true, "0"/"false" => false.
fn env_flag(name: &str) -> Option<bool> {
    match std::env::var(name).ok()?.as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        other => {
            log::warn!("{}: unrecognized value {:?}, ignoring", name, other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_size() {
        let config = RendererConfig::default();
        assert_eq!(config.window_width, 1280);
        assert_eq!(config.window_height, 720);
        assert!(config.vsync);
    }

    #[test]
    fn test_sanitized_clamps_zero_dimensions() {
        let config = RendererConfig {
            window_width: 0,
            window_height: 0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(config.window_width, 1);
        assert_eq!(config.window_height, 1);
    }

    #[test]
    fn test_sanitized_keeps_valid_dimensions() {
        let config = RendererConfig {
            window_width: 2560,
            window_height: 1440,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(config.window_width, 2560);
        assert_eq!(config.window_height, 1440);
    }

    #[test]
    fn test_shader_path_joins_dir() {
        let config = RendererConfig {
            shader_dir: PathBuf::from("assets/spv"),
            ..Default::default()
        };
        assert_eq!(
            config.shader_path("mesh.vert.spv"),
            PathBuf::from("assets/spv/mesh.vert.spv")
        );
    }
}
