//! Depth buffer management.
//!
//! One depth image backs every swapchain image: frames never overlap inside
//! a render pass, so a single attachment is enough. The buffer matches the
//! swapchain extent and is rebuilt together with it on recreation.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use meshview_rhi::RhiResult;
use meshview_rhi::device::Device;
use meshview_rhi::image::{DeviceImage, find_depth_format};
use meshview_rhi::instance::Instance;

/// Depth attachment for depth testing.
///
/// The format is probed from the device at creation time (D32_SFLOAT
/// preferred, packed depth/stencil formats as fallback). The image is
/// device-local with optimal tiling; the render pass takes care of the
/// initial `UNDEFINED` to `DEPTH_STENCIL_ATTACHMENT_OPTIMAL` transition.
pub struct DepthBuffer {
    image: DeviceImage,
}

impl DepthBuffer {
    /// Creates a depth buffer covering `extent`.
    ///
    /// # Errors
    ///
    /// Returns [`meshview_rhi::RhiError::NoSuitableFormat`] if the device
    /// supports none of the depth format candidates, or an error if image
    /// creation fails.
    pub fn new(instance: &Instance, device: Arc<Device>, extent: vk::Extent2D) -> RhiResult<Self> {
        let format = find_depth_format(instance, device.physical_device())?;

        let image = DeviceImage::new(
            device,
            extent.width,
            extent.height,
            format,
            vk::ImageTiling::OPTIMAL,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::ImageAspectFlags::DEPTH,
        )?;

        debug!(
            "Created depth buffer: {}x{} ({:?})",
            extent.width, extent.height, format
        );

        Ok(Self { image })
    }

    /// Returns the Vulkan image view handle.
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Returns the probed depth format.
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.image.format()
    }

    /// Returns the depth buffer extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.image.extent()
    }
}
