//! Renderer error type.

/// Errors surfaced by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Vulkan object creation or submission failed.
    Vulkan(String),
    /// A shader blob could not be loaded or is not valid SPIR-V.
    Shader(String),
    /// No usable GPU / queue configuration was found.
    NoSuitableDevice(String),
    /// Generic error.
    Other(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Vulkan(msg) => write!(f, "Vulkan error: {}", msg),
            RenderError::Shader(msg) => write!(f, "Shader error: {}", msg),
            RenderError::NoSuitableDevice(msg) => write!(f, "No suitable device: {}", msg),
            RenderError::Other(msg) => write!(f, "Render error: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<String> for RenderError {
    fn from(msg: String) -> Self {
        RenderError::Vulkan(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_message() {
        let err = RenderError::Vulkan("queue submit failed".to_string());
        assert_eq!(err.to_string(), "Vulkan error: queue submit failed");
    }

    #[test]
    fn test_from_string_is_vulkan() {
        let err: RenderError = "boom".to_string().into();
        assert_eq!(err, RenderError::Vulkan("boom".to_string()));
    }
}
