//! Render pass and framebuffer management.
//!
//! This module handles VkRenderPass and VkFramebuffer creation.
//!
//! # Overview
//!
//! A single-subpass render pass with one color attachment and one depth
//! attachment. The color attachment is cleared on load and transitioned to
//! PRESENT_SRC_KHR at the end of the pass, so no explicit layout transitions
//! are needed for swapchain images. The depth attachment contents are
//! discarded after the pass.
//!
//! Framebuffers bind concrete image views (one color view per swapchain
//! image plus a shared depth view) to the render pass. They are recreated
//! together with the swapchain.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::RhiError;

/// Describes the color attachment for a given swapchain format.
///
/// Cleared on load, stored for presentation, and handed to the presentation
/// engine in PRESENT_SRC_KHR layout at the end of the pass.
pub fn color_attachment_description(format: vk::Format) -> vk::AttachmentDescription {
    vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
}

/// Describes the depth attachment for a given depth format.
///
/// Cleared on load; the contents are not needed after the pass, so the
/// store op is DONT_CARE.
pub fn depth_attachment_description(format: vk::Format) -> vk::AttachmentDescription {
    vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::DONT_CARE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
}

/// Describes the dependency that orders this pass after the previous use of
/// the attachments.
///
/// Waiting on COLOR_ATTACHMENT_OUTPUT and EARLY_FRAGMENT_TESTS makes the
/// clears wait for the acquire semaphore and for any earlier frame still
/// touching the depth buffer.
pub fn subpass_dependency() -> vk::SubpassDependency {
    vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        )
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        )
        .dst_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
}

/// Vulkan render pass wrapper.
///
/// Owns a single-subpass render pass with a color and a depth attachment.
/// The render pass itself does not depend on the swapchain images, only on
/// their formats, so it survives swapchain recreation as long as the surface
/// format does not change.
pub struct RenderPass {
    /// Reference to the logical device
    device: Arc<Device>,
    /// Render pass handle
    render_pass: vk::RenderPass,
}

impl RenderPass {
    /// Creates a render pass for the given color and depth formats.
    ///
    /// # Errors
    ///
    /// Returns an error if render pass creation fails.
    pub fn new(
        device: Arc<Device>,
        color_format: vk::Format,
        depth_format: vk::Format,
    ) -> Result<Self, RhiError> {
        let attachments = [
            color_attachment_description(color_format),
            depth_attachment_description(depth_format),
        ];

        let color_refs = [vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];
        let depth_ref = vk::AttachmentReference::default()
            .attachment(1)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&depth_ref)];

        let dependencies = [subpass_dependency()];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe {
            device
                .handle()
                .create_render_pass(&create_info, None)
                .map_err(|e| {
                    RhiError::ResourceCreationFailed(format!("render pass creation failed: {e:?}"))
                })?
        };

        info!(
            "Render pass created (color {:?}, depth {:?})",
            color_format, depth_format
        );

        Ok(Self {
            device,
            render_pass,
        })
    }

    /// Returns the render pass handle.
    #[inline]
    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_render_pass(self.render_pass, None);
        }
        debug!("Render pass destroyed");
    }
}

/// Vulkan framebuffer wrapper.
///
/// Binds a set of image views to a render pass at a fixed extent. One
/// framebuffer exists per swapchain image; all of them share the depth view.
pub struct Framebuffer {
    /// Reference to the logical device
    device: Arc<Device>,
    /// Framebuffer handle
    framebuffer: vk::Framebuffer,
    /// Framebuffer extent
    extent: vk::Extent2D,
}

impl Framebuffer {
    /// Creates a framebuffer for the given render pass and attachments.
    ///
    /// Attachment order must match the render pass: color view first, then
    /// the depth view.
    ///
    /// # Errors
    ///
    /// Returns an error if framebuffer creation fails.
    pub fn new(
        device: Arc<Device>,
        render_pass: &RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<Self, RhiError> {
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.handle())
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe {
            device
                .handle()
                .create_framebuffer(&create_info, None)
                .map_err(|e| {
                    RhiError::ResourceCreationFailed(format!("framebuffer creation failed: {e:?}"))
                })?
        };

        Ok(Self {
            device,
            framebuffer,
            extent,
        })
    }

    /// Returns the framebuffer handle.
    #[inline]
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }

    /// Returns the framebuffer extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_framebuffer(self.framebuffer, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_attachment_clears_and_presents() {
        let desc = color_attachment_description(vk::Format::B8G8R8A8_SRGB);
        assert_eq!(desc.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(desc.samples, vk::SampleCountFlags::TYPE_1);
        assert_eq!(desc.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(desc.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(desc.initial_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(desc.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }

    #[test]
    fn test_depth_attachment_discards_after_pass() {
        let desc = depth_attachment_description(vk::Format::D32_SFLOAT);
        assert_eq!(desc.format, vk::Format::D32_SFLOAT);
        assert_eq!(desc.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(desc.store_op, vk::AttachmentStoreOp::DONT_CARE);
        assert_eq!(desc.initial_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(
            desc.final_layout,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        );
    }

    #[test]
    fn test_dependency_covers_color_and_depth_writes() {
        let dep = subpass_dependency();
        assert_eq!(dep.src_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(dep.dst_subpass, 0);

        let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
            | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
        assert_eq!(dep.src_stage_mask, stages);
        assert_eq!(dep.dst_stage_mask, stages);

        assert_eq!(dep.src_access_mask, vk::AccessFlags::empty());
        assert_eq!(
            dep.dst_access_mask,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
        );
    }
}
