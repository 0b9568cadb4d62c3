//! Frame command buffer recording.
//!
//! One primary command buffer exists per swapchain image, allocated from a
//! long-lived graphics pool. The buffers are recorded wholesale after every
//! swapchain (re)build and then left untouched: the scene is a single draw,
//! so nothing in the commands varies per frame. Per-frame variation flows
//! through the uniform buffers instead.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use meshview_rhi::buffer::Buffer;
use meshview_rhi::command::{CommandBuffer, CommandPool};
use meshview_rhi::device::Device;
use meshview_rhi::pipeline::{Pipeline, PipelineLayout};
use meshview_rhi::render_pass::{Framebuffer, RenderPass};
use meshview_rhi::{RhiError, RhiResult};

/// Clear values for one render pass instance: opaque black color, far depth.
fn clear_values() -> [vk::ClearValue; 2] {
    [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.0, 0.0, 0.0, 1.0],
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        },
    ]
}

/// Everything one recorded frame references, borrowed from the renderer.
///
/// The handles stay baked into the command buffers until the next
/// [`CommandRecorder::record_all`], so the renderer must re-record whenever
/// any of these objects is rebuilt.
pub struct DrawResources<'a> {
    pub render_pass: &'a RenderPass,
    pub framebuffers: &'a [Framebuffer],
    pub pipeline: &'a Pipeline,
    pub pipeline_layout: &'a PipelineLayout,
    pub extent: vk::Extent2D,
    pub vertex_buffer: &'a Buffer,
    pub index_buffer: &'a Buffer,
    pub index_count: u32,
    pub descriptor_sets: &'a [vk::DescriptorSet],
}

/// Records and owns the per-image frame command buffers.
pub struct CommandRecorder {
    device: Arc<Device>,
    pool: CommandPool,
    buffers: Vec<CommandBuffer>,
}

impl CommandRecorder {
    /// Creates the long-lived graphics command pool with no buffers yet.
    ///
    /// Call [`reallocate`](Self::reallocate) once the swapchain image count
    /// is known.
    ///
    /// # Errors
    ///
    /// Returns an error if pool creation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let pool = CommandPool::new(device.clone(), device.graphics_family_index())?;

        Ok(Self {
            device,
            pool,
            buffers: Vec::new(),
        })
    }

    /// Frees the old frame buffers and allocates one per swapchain image.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn reallocate(&mut self, image_count: usize) -> RhiResult<()> {
        self.free_buffers();

        let raw = self.pool.allocate_command_buffers(image_count as u32)?;
        self.buffers = raw
            .into_iter()
            .map(|handle| CommandBuffer::from_handle(self.device.clone(), handle))
            .collect();

        debug!("Allocated {} frame command buffers", image_count);
        Ok(())
    }

    /// Re-records every frame command buffer against `draw`.
    ///
    /// Each buffer clears its framebuffer, binds the pipeline, geometry,
    /// and that image's descriptor set, then issues a single indexed draw.
    ///
    /// # Errors
    ///
    /// Returns an error if the framebuffer or descriptor set counts do not
    /// match the buffer count, or if recording fails.
    pub fn record_all(&self, draw: &DrawResources<'_>) -> RhiResult<()> {
        if draw.framebuffers.len() != self.buffers.len()
            || draw.descriptor_sets.len() != self.buffers.len()
        {
            return Err(RhiError::InvalidOperation(format!(
                "frame recording needs one framebuffer and descriptor set per image: \
                 {} buffers, {} framebuffers, {} sets",
                self.buffers.len(),
                draw.framebuffers.len(),
                draw.descriptor_sets.len()
            )));
        }

        for (image_index, buffer) in self.buffers.iter().enumerate() {
            Self::record_one(buffer, image_index, draw)?;
        }

        info!("Recorded {} frame command buffers", self.buffers.len());
        Ok(())
    }

    fn record_one(
        buffer: &CommandBuffer,
        image_index: usize,
        draw: &DrawResources<'_>,
    ) -> RhiResult<()> {
        buffer.begin()?;

        let clear = clear_values();
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(draw.render_pass.handle())
            .framebuffer(draw.framebuffers[image_index].handle())
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: draw.extent,
            })
            .clear_values(&clear);

        buffer.begin_render_pass(&begin_info);
        buffer.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, draw.pipeline.handle());
        buffer.bind_vertex_buffers(0, &[draw.vertex_buffer.handle()], &[0]);
        buffer.bind_index_buffer(draw.index_buffer.handle(), 0, vk::IndexType::UINT32);
        buffer.bind_descriptor_sets(
            vk::PipelineBindPoint::GRAPHICS,
            draw.pipeline_layout.handle(),
            0,
            &[draw.descriptor_sets[image_index]],
            &[],
        );
        buffer.draw_indexed(draw.index_count, 1, 0, 0, 0);
        buffer.end_render_pass();
        buffer.end()?;

        Ok(())
    }

    /// Returns the recorded command buffer for a swapchain image.
    #[inline]
    pub fn buffer(&self, image_index: usize) -> vk::CommandBuffer {
        self.buffers[image_index].handle()
    }

    /// Returns the number of frame command buffers.
    #[inline]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    fn free_buffers(&mut self) {
        if self.buffers.is_empty() {
            return;
        }

        let handles: Vec<vk::CommandBuffer> = self.buffers.iter().map(|b| b.handle()).collect();
        unsafe {
            self.device
                .handle()
                .free_command_buffers(self.pool.handle(), &handles);
        }
        self.buffers.clear();
    }
}

impl Drop for CommandRecorder {
    fn drop(&mut self) {
        // The pool destroys its remaining buffers with itself; freeing here
        // keeps the wrapper handles from dangling first.
        self.free_buffers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_values_are_opaque_black_and_far_depth() {
        let values = clear_values();

        let color = unsafe { values[0].color.float32 };
        assert_eq!(color, [0.0, 0.0, 0.0, 1.0]);

        let depth_stencil = unsafe { values[1].depth_stencil };
        assert_eq!(depth_stencil.depth, 1.0);
        assert_eq!(depth_stencil.stencil, 0);
    }

    #[test]
    fn test_recorder_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CommandRecorder>();
    }
}
