//! RHI-specific error types.

use ash::vk;
use thiserror::Error;

/// RHI-specific error type.
///
/// The surface conditions the frame loop recovers from (`SurfaceOutOfDate`,
/// `SurfaceSuboptimal`) are their own variants so callers can match on them.
/// Everything else is fatal and unwinds to the application loop.
#[derive(Error, Debug)]
pub enum RhiError {
    /// The logical device was lost; no recovery path exists
    #[error("Device lost")]
    DeviceLost,

    /// The surface no longer matches the swapchain; recreate and retry
    #[error("Surface out of date")]
    SurfaceOutOfDate,

    /// Presentation succeeded but the swapchain is stale; recreate soon
    #[error("Surface suboptimal")]
    SurfaceSuboptimal,

    /// A required GPU object could not be created at startup
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// No device memory type satisfies both the type filter and the flags
    #[error("No suitable memory type (type bits {type_bits:#010x}, flags {flags:?})")]
    NoSuitableMemoryType {
        type_bits: u32,
        flags: vk::MemoryPropertyFlags,
    },

    /// None of the candidate formats supports the requested usage
    #[error("No suitable format among {0:?}")]
    NoSuitableFormat(Vec<vk::Format>),

    /// An image-layout transition pair outside the enumerated set
    #[error("Unsupported layout transition: {old:?} -> {new:?}")]
    UnsupportedLayoutTransition {
        old: vk::ImageLayout,
        new: vk::ImageLayout,
    },

    /// Misuse of an RHI object, such as writing past the end of a buffer
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Any other Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(vk::Result),

    /// Failed to load Vulkan library
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// No suitable GPU found
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// Shader loading error
    #[error("Shader error: {0}")]
    ShaderError(String),

    /// Surface query error
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Swapchain error
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// Pipeline creation error
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl From<vk::Result> for RhiError {
    /// Classify raw Vulkan results so `?` sorts frame-loop conditions onto
    /// their taxonomy variants at the call site.
    fn from(result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_DEVICE_LOST => Self::DeviceLost,
            vk::Result::ERROR_OUT_OF_DATE_KHR => Self::SurfaceOutOfDate,
            vk::Result::SUBOPTIMAL_KHR => Self::SurfaceSuboptimal,
            other => Self::VulkanError(other),
        }
    }
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_lost_classifies_as_fatal_variant() {
        let err = RhiError::from(vk::Result::ERROR_DEVICE_LOST);
        assert!(matches!(err, RhiError::DeviceLost));
    }

    #[test]
    fn test_surface_results_classify_as_recoverable_variants() {
        let err = RhiError::from(vk::Result::ERROR_OUT_OF_DATE_KHR);
        assert!(matches!(err, RhiError::SurfaceOutOfDate));

        let err = RhiError::from(vk::Result::SUBOPTIMAL_KHR);
        assert!(matches!(err, RhiError::SurfaceSuboptimal));
    }

    #[test]
    fn test_other_results_stay_wrapped() {
        let err = RhiError::from(vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        assert!(matches!(
            err,
            RhiError::VulkanError(vk::Result::ERROR_OUT_OF_HOST_MEMORY)
        ));
    }
}
