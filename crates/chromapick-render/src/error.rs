//! Rendering error types.

use chromapick_core::PickError;
use thiserror::Error;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Shader parsing or interface validation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// The viewport has a zero dimension.
    #[error("invalid viewport size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    /// Mapping a readback buffer failed.
    #[error("GPU buffer mapping failed: {0}")]
    BufferMapFailed(String),

    /// Waiting for the GPU failed.
    #[error("device poll failed: {0}")]
    PollFailed(String),

    /// A draw call was issued in an invalid state.
    #[error("invalid draw: {0}")]
    InvalidDraw(String),

    /// Saving a captured image failed.
    #[error("image save failed: {0}")]
    ImageSaveFailed(String),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl From<RenderError> for PickError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::ShaderCompilationFailed(what) => PickError::Configuration { what },
            other => PickError::Render(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_errors_become_configuration_errors() {
        let err: PickError =
            RenderError::ShaderCompilationFailed("missing entry point 'fs_main'".into()).into();
        assert!(matches!(err, PickError::Configuration { .. }));

        let err: PickError = RenderError::PollFailed("device lost".into()).into();
        assert!(matches!(err, PickError::Render(_)));
        assert!(!err.is_recoverable());
    }
}
