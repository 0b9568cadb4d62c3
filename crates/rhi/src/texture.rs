//! Sampled textures uploaded through a staging buffer.
//!
//! # Overview
//!
//! [`Texture`] owns a device-local sampled image filled from decoded RGBA
//! pixels. The upload path is:
//!
//! 1. copy the pixels into a host-visible staging buffer
//! 2. transition the image UNDEFINED to TRANSFER_DST_OPTIMAL
//! 3. copy the staging buffer into the image
//! 4. transition TRANSFER_DST_OPTIMAL to SHADER_READ_ONLY_OPTIMAL
//!
//! Each step blocks on a one-time command buffer, so uploads happen at load
//! time, never during the frame loop. Pixel decoding is not done here; the
//! caller hands over raw RGBA8 data.

use std::sync::Arc;

use ash::vk;
use tracing::info;

use crate::buffer::{Buffer, BufferUsage};
use crate::command::{self, CommandPool};
use crate::device::Device;
use crate::error::RhiError;
use crate::image::DeviceImage;

const BYTES_PER_PIXEL: usize = 4;

/// A sampled 2D texture in SHADER_READ_ONLY_OPTIMAL layout.
pub struct Texture {
    image: DeviceImage,
}

impl Texture {
    /// Creates a texture from tightly packed RGBA8 pixels.
    ///
    /// The image is created as R8G8B8A8_SRGB with optimal tiling and is
    /// ready for sampling when this returns.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::InvalidOperation`] if `pixels` does not match
    /// `width * height * 4` bytes, or an error if any upload step fails.
    pub fn from_rgba8(
        device: Arc<Device>,
        upload_pool: &CommandPool,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Self, RhiError> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(RhiError::InvalidOperation(format!(
                "texture data is {} bytes, expected {} for {}x{} RGBA",
                pixels.len(),
                expected,
                width,
                height
            )));
        }

        let staging = Buffer::new(
            device.clone(),
            BufferUsage::Staging,
            expected as vk::DeviceSize,
        )?;
        staging.write(0, pixels)?;

        let image = DeviceImage::new(
            device.clone(),
            width,
            height,
            vk::Format::R8G8B8A8_SRGB,
            vk::ImageTiling::OPTIMAL,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::ImageAspectFlags::COLOR,
        )?;

        image.transition_layout(
            upload_pool,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )?;

        copy_buffer_to_image(&device, upload_pool, &staging, &image, width, height)?;

        image.transition_layout(
            upload_pool,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )?;

        info!("Uploaded {}x{} texture ({} bytes)", width, height, expected);

        Ok(Self { image })
    }

    /// Returns the image view for descriptor updates.
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Returns the texture extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.image.extent()
    }
}

/// Records and submits a full-image copy from a staging buffer.
fn copy_buffer_to_image(
    device: &Arc<Device>,
    pool: &CommandPool,
    staging: &Buffer,
    image: &DeviceImage,
    width: u32,
    height: u32,
) -> Result<(), RhiError> {
    let region = vk::BufferImageCopy::default()
        .buffer_offset(0)
        .buffer_row_length(0)
        .buffer_image_height(0)
        .image_subresource(
            vk::ImageSubresourceLayers::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .mip_level(0)
                .base_array_layer(0)
                .layer_count(1),
        )
        .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
        .image_extent(vk::Extent3D {
            width,
            height,
            depth: 1,
        });

    command::one_time_submit(device, pool, |device, cmd| unsafe {
        device.cmd_copy_buffer_to_image(
            cmd,
            staging.handle(),
            image.handle(),
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );
    })
}
