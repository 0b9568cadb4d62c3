//! Device-local images and layout transitions.
//!
//! This module handles VkImage creation, memory binding, image views, and
//! the small set of layout transitions the renderer needs.
//!
//! # Overview
//!
//! [`DeviceImage`] owns an image, its memory, and a view, and destroys them
//! together. Layout transitions are restricted to the two pairs used for
//! texture uploads; any other pair is a programming error and is rejected
//! with [`RhiError::UnsupportedLayoutTransition`]. Depth attachments never
//! go through here because the render pass transitions them implicitly.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::command::{self, CommandPool};
use crate::device::Device;
use crate::error::RhiError;
use crate::instance::Instance;
use crate::memory;

/// Access and stage masks for a supported layout transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionMasks {
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
}

/// Returns the barrier masks for a layout transition.
///
/// Only the transitions needed for texture uploads are supported:
///
/// - UNDEFINED to TRANSFER_DST_OPTIMAL (before the staging copy)
/// - TRANSFER_DST_OPTIMAL to SHADER_READ_ONLY_OPTIMAL (after it)
///
/// # Errors
///
/// Returns [`RhiError::UnsupportedLayoutTransition`] for any other pair.
pub fn transition_masks(
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> Result<TransitionMasks, RhiError> {
    match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => {
            Ok(TransitionMasks {
                src_access: vk::AccessFlags::empty(),
                dst_access: vk::AccessFlags::TRANSFER_WRITE,
                src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
                dst_stage: vk::PipelineStageFlags::TRANSFER,
            })
        }
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Ok(TransitionMasks {
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
            })
        }
        (old, new) => Err(RhiError::UnsupportedLayoutTransition { old, new }),
    }
}

/// Returns true when a format supports the requested features under the
/// given tiling.
pub fn format_supports(
    props: &vk::FormatProperties,
    tiling: vk::ImageTiling,
    features: vk::FormatFeatureFlags,
) -> bool {
    match tiling {
        vk::ImageTiling::LINEAR => props.linear_tiling_features.contains(features),
        vk::ImageTiling::OPTIMAL => props.optimal_tiling_features.contains(features),
        _ => false,
    }
}

/// Finds the first candidate format the physical device supports with the
/// given tiling and features.
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableFormat`] listing the rejected candidates
/// when none qualifies.
pub fn find_supported_format(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    candidates: &[vk::Format],
    tiling: vk::ImageTiling,
    features: vk::FormatFeatureFlags,
) -> Result<vk::Format, RhiError> {
    for &format in candidates {
        let props = unsafe {
            instance
                .handle()
                .get_physical_device_format_properties(physical_device, format)
        };
        if format_supports(&props, tiling, features) {
            return Ok(format);
        }
    }
    Err(RhiError::NoSuitableFormat(candidates.to_vec()))
}

/// Finds a depth attachment format supported by the physical device.
///
/// Probes D32_SFLOAT, D32_SFLOAT_S8_UINT, and D24_UNORM_S8_UINT in that
/// order, requiring optimal-tiling depth/stencil attachment support.
pub fn find_depth_format(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<vk::Format, RhiError> {
    find_supported_format(
        instance,
        physical_device,
        &[
            vk::Format::D32_SFLOAT,
            vk::Format::D32_SFLOAT_S8_UINT,
            vk::Format::D24_UNORM_S8_UINT,
        ],
        vk::ImageTiling::OPTIMAL,
        vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
    )
}

/// A device-local image with bound memory and a view.
///
/// Used for sampled textures and the depth attachment. All images are 2D,
/// single-mip, single-layer, and exclusively owned by the graphics queue.
pub struct DeviceImage {
    /// Reference to the logical device
    device: Arc<Device>,
    /// Image handle
    image: vk::Image,
    /// Backing memory
    memory: vk::DeviceMemory,
    /// Image view over the whole image
    view: vk::ImageView,
    /// Image format
    format: vk::Format,
    /// Aspect the view and any barriers address
    aspect: vk::ImageAspectFlags,
    /// Image extent
    extent: vk::Extent2D,
}

impl DeviceImage {
    /// Creates an image, binds device-local memory, and creates a view.
    ///
    /// # Errors
    ///
    /// Returns an error if image creation, memory allocation, or view
    /// creation fails. No suitable memory type yields
    /// [`RhiError::NoSuitableMemoryType`].
    pub fn new(
        device: Arc<Device>,
        width: u32,
        height: u32,
        format: vk::Format,
        tiling: vk::ImageTiling,
        usage: vk::ImageUsageFlags,
        memory_flags: vk::MemoryPropertyFlags,
        aspect: vk::ImageAspectFlags,
    ) -> Result<Self, RhiError> {
        let create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(tiling)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe {
            device.handle().create_image(&create_info, None).map_err(|e| {
                RhiError::ResourceCreationFailed(format!("image creation failed: {e:?}"))
            })?
        };

        let requirements = unsafe { device.handle().get_image_memory_requirements(image) };

        let memory = match memory::allocate(&device, requirements, memory_flags) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.handle().destroy_image(image, None) };
                return Err(e);
            }
        };

        unsafe { device.handle().bind_image_memory(image, memory, 0)? };

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(aspect)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let view = match unsafe { device.handle().create_image_view(&view_info, None) } {
            Ok(view) => view,
            Err(e) => {
                unsafe {
                    device.handle().destroy_image(image, None);
                    device.handle().free_memory(memory, None);
                }
                return Err(RhiError::ResourceCreationFailed(format!(
                    "image view creation failed: {e:?}"
                )));
            }
        };

        debug!(
            "Created {}x{} image ({:?}, usage {:?})",
            width, height, format, usage
        );

        Ok(Self {
            device,
            image,
            memory,
            view,
            format,
            aspect,
            extent: vk::Extent2D { width, height },
        })
    }

    /// Transitions the image between layouts with a one-time command buffer.
    ///
    /// Blocks until the transition has executed.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::UnsupportedLayoutTransition`] for pairs outside
    /// the supported set, or an error if submission fails.
    pub fn transition_layout(
        &self,
        pool: &CommandPool,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) -> Result<(), RhiError> {
        let masks = transition_masks(old_layout, new_layout)?;

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(self.aspect)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            )
            .src_access_mask(masks.src_access)
            .dst_access_mask(masks.dst_access);

        command::one_time_submit(&self.device, pool, |device, cmd| unsafe {
            device.cmd_pipeline_barrier(
                cmd,
                masks.src_stage,
                masks.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        })?;

        debug!("Image transitioned {:?} -> {:?}", old_layout, new_layout);
        Ok(())
    }

    /// Returns the image handle.
    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// Returns the image view.
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Returns the image format.
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Returns the image extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for DeviceImage {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_image_view(self.view, None);
            self.device.handle().destroy_image(self.image, None);
            self.device.handle().free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_transition_masks() {
        let masks = transition_masks(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )
        .unwrap();

        assert_eq!(masks.src_access, vk::AccessFlags::empty());
        assert_eq!(masks.dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(masks.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(masks.dst_stage, vk::PipelineStageFlags::TRANSFER);
    }

    #[test]
    fn test_sample_transition_masks() {
        let masks = transition_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();

        assert_eq!(masks.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(masks.dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(masks.src_stage, vk::PipelineStageFlags::TRANSFER);
        assert_eq!(masks.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn test_unknown_transition_is_rejected() {
        let result = transition_masks(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::PRESENT_SRC_KHR,
        );

        match result {
            Err(RhiError::UnsupportedLayoutTransition { old, new }) => {
                assert_eq!(old, vk::ImageLayout::UNDEFINED);
                assert_eq!(new, vk::ImageLayout::PRESENT_SRC_KHR);
            }
            other => panic!("expected UnsupportedLayoutTransition, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_reverse_transition_is_rejected() {
        // Supported pairs are directional
        let result = transition_masks(
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );
        assert!(matches!(
            result,
            Err(RhiError::UnsupportedLayoutTransition { .. })
        ));
    }

    #[test]
    fn test_format_supports_respects_tiling() {
        let props = vk::FormatProperties {
            linear_tiling_features: vk::FormatFeatureFlags::empty(),
            optimal_tiling_features: vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            buffer_features: vk::FormatFeatureFlags::empty(),
        };

        assert!(format_supports(
            &props,
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
        ));
        assert!(!format_supports(
            &props,
            vk::ImageTiling::LINEAR,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
        ));
    }

    #[test]
    fn test_format_supports_requires_all_features() {
        let props = vk::FormatProperties {
            linear_tiling_features: vk::FormatFeatureFlags::empty(),
            optimal_tiling_features: vk::FormatFeatureFlags::SAMPLED_IMAGE,
            buffer_features: vk::FormatFeatureFlags::empty(),
        };

        assert!(!format_supports(
            &props,
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::SAMPLED_IMAGE | vk::FormatFeatureFlags::TRANSFER_DST
        ));
    }
}
