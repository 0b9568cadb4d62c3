//! Texture sampler management.
//!
//! A single linear sampler with repeat addressing covers every texture in
//! the renderer, so this wrapper stays deliberately small.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiError;

/// Vulkan sampler wrapper.
///
/// Linear filtering, repeat addressing on all axes, and anisotropic
/// filtering at the device's maximum supported level.
pub struct Sampler {
    /// Reference to the logical device
    device: Arc<Device>,
    /// Sampler handle
    sampler: vk::Sampler,
}

impl Sampler {
    /// Creates a linear sampler with anisotropic filtering.
    ///
    /// The anisotropy level comes from the device limits queried at device
    /// selection time; the sampler_anisotropy feature is always enabled on
    /// the logical device.
    ///
    /// # Errors
    ///
    /// Returns an error if sampler creation fails.
    pub fn new(device: Arc<Device>) -> Result<Self, RhiError> {
        let max_anisotropy = device.max_sampler_anisotropy();

        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(true)
            .max_anisotropy(max_anisotropy)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(0.0);

        let sampler = unsafe {
            device
                .handle()
                .create_sampler(&create_info, None)
                .map_err(|e| {
                    RhiError::ResourceCreationFailed(format!("sampler creation failed: {e:?}"))
                })?
        };

        debug!("Sampler created (anisotropy {:.1})", max_anisotropy);

        Ok(Self { device, sampler })
    }

    /// Returns the sampler handle.
    #[inline]
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_sampler(self.sampler, None);
        }
    }
}
