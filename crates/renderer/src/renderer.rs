//! Renderer orchestration.
//!
//! This module provides the main [`Renderer`] struct that owns the whole
//! Vulkan object graph for the viewer, from the instance down to the
//! per-image command buffers, and draws one frame per
//! [`draw_frame`](Renderer::draw_frame) call.
//!
//! # Frame loop
//!
//! Each frame walks the same sequence: wait for the current frame slot's
//! fence, acquire a swapchain image, wait out any earlier frame still
//! rendering to that image, write the image's uniform buffer, submit the
//! image's pre-recorded command buffer, present, then advance the slot
//! ring. Out-of-date and suboptimal surfaces feed into
//! [`recreate_swapchain`](Renderer::recreate_swapchain), which rebuilds
//! everything that depends on the swapchain.
//!
//! # Teardown
//!
//! Fields are declared so that GPU resources drop before the [`Device`],
//! the device before the [`Surface`], and the surface before the
//! [`Instance`]. The `Drop` impl only waits for the device to go idle so
//! that no field is destroyed while the GPU still reads it.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info};

use meshview_core::{AppConfig, FrameClock};
use meshview_platform::{Surface, Window};
use meshview_resources::{Model, TextureData};
use meshview_rhi::buffer::{Buffer, BufferUsage};
use meshview_rhi::command::CommandPool;
use meshview_rhi::descriptor::{
    self, DescriptorPool, DescriptorSetLayout, update_descriptor_sets,
};
use meshview_rhi::device::Device;
use meshview_rhi::instance::Instance;
use meshview_rhi::physical_device::select_physical_device;
use meshview_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use meshview_rhi::render_pass::{Framebuffer, RenderPass};
use meshview_rhi::sampler::Sampler;
use meshview_rhi::shader::{Shader, ShaderStage};
use meshview_rhi::swapchain::{AcquireOutcome, PresentOutcome, Swapchain};
use meshview_rhi::texture::Texture;
use meshview_rhi::vertex::Vertex;
use meshview_rhi::{RhiError, RhiResult};

use crate::depth_buffer::DepthBuffer;
use crate::frame_scheduler::FrameScheduler;
use crate::recorder::{CommandRecorder, DrawResources};
use crate::ubo::UniformBufferObject;

/// Main renderer that draws a rotating textured model into a window.
///
/// Field order doubles as destruction order: everything that holds an
/// `Arc<Device>` is declared before `device`, and `surface` before
/// `instance`, so the implicit drops release the object graph leaf-first.
pub struct Renderer {
    /// Wall-clock driving the model rotation.
    clock: FrameClock,
    /// Frame slot ring and image ownership tracking.
    scheduler: FrameScheduler,
    /// Per-image command buffers, re-recorded on swapchain rebuild.
    recorder: CommandRecorder,

    /// Descriptor pool for the per-image sets; replaced wholesale on rebuild.
    descriptor_pool: DescriptorPool,
    /// One descriptor set per swapchain image.
    descriptor_sets: Vec<vk::DescriptorSet>,
    /// One uniform buffer per swapchain image, rewritten each frame.
    uniform_buffers: Vec<Buffer>,

    /// Sampler for the model texture.
    texture_sampler: Sampler,
    /// Model texture in shader-read layout.
    texture: Texture,
    /// Number of indices in the index buffer.
    index_count: u32,
    /// Device-local index buffer.
    index_buffer: Buffer,
    /// Device-local vertex buffer.
    vertex_buffer: Buffer,

    /// Graphics pipeline, rebuilt with the swapchain (fixed viewport).
    pipeline: Pipeline,
    /// Pipeline layout; survives swapchain rebuilds.
    pipeline_layout: PipelineLayout,
    /// Layout of the per-image descriptor sets.
    descriptor_set_layout: DescriptorSetLayout,
    /// Fragment shader module, kept for pipeline rebuilds.
    fragment_shader: Shader,
    /// Vertex shader module, kept for pipeline rebuilds.
    vertex_shader: Shader,

    /// One framebuffer per swapchain image.
    framebuffers: Vec<Framebuffer>,
    /// Shared depth attachment, sized to the swapchain.
    depth_buffer: DepthBuffer,
    /// Render pass the framebuffers and pipeline are built against.
    render_pass: RenderPass,
    /// Swapchain and its image views.
    swapchain: Swapchain,

    /// Last framebuffer size reported by the window.
    framebuffer_size: (u32, u32),
    /// Set when the framebuffer size changed since the last rebuild.
    framebuffer_resized: bool,

    /// Logical device; dropped after every wrapper above.
    device: Arc<Device>,
    /// Presentation surface; must outlive the swapchain, not the instance.
    surface: Surface,
    /// Vulkan instance; dropped last.
    instance: Instance,
}

impl Renderer {
    /// Creates a renderer for the given window and loads the configured
    /// model, texture, and shaders.
    ///
    /// Validation layers are enabled in debug builds when available.
    ///
    /// # Errors
    ///
    /// Returns an error if any Vulkan object creation or asset load fails.
    pub fn new(window: &Window, config: &AppConfig) -> RhiResult<Self> {
        let (width, height) = window.framebuffer_size();
        info!("Initializing Vulkan renderer ({}x{})", width, height);

        let surface_extensions = window
            .surface_extensions()
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let enable_validation = cfg!(debug_assertions);
        let instance = Instance::new(enable_validation, &surface_extensions)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &physical_device_info)?;

        let swapchain = Swapchain::new(&instance, device.clone(), surface.handle(), width, height)?;

        let depth_buffer = DepthBuffer::new(&instance, device.clone(), swapchain.extent())?;
        let render_pass =
            RenderPass::new(device.clone(), swapchain.format(), depth_buffer.format())?;
        let framebuffers =
            Self::create_framebuffers(&device, &swapchain, &render_pass, &depth_buffer)?;

        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            &config.assets.vertex_shader,
            ShaderStage::Vertex,
            "main",
        )?;
        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            &config.assets.fragment_shader,
            ShaderStage::Fragment,
            "main",
        )?;

        // Binding 0: transformation matrices, binding 1: model texture.
        let bindings = [
            descriptor::uniform_buffer_binding(0, vk::ShaderStageFlags::VERTEX),
            descriptor::combined_image_sampler_binding(1, vk::ShaderStageFlags::FRAGMENT),
        ];
        let descriptor_set_layout = DescriptorSetLayout::new(device.clone(), &bindings)?;
        let pipeline_layout =
            PipelineLayout::new(device.clone(), &[descriptor_set_layout.handle()], &[])?;

        let pipeline = Self::build_pipeline(
            &device,
            &vertex_shader,
            &fragment_shader,
            &render_pass,
            swapchain.extent(),
            &pipeline_layout,
        )?;

        // Transient pool for the one-time staging uploads below.
        let upload_pool =
            CommandPool::new_transient(device.clone(), device.graphics_family_index())?;

        let model = Model::load_obj(&config.assets.model).map_err(|e| {
            RhiError::ResourceCreationFailed(format!(
                "model {}: {}",
                config.assets.model.display(),
                e
            ))
        })?;
        info!(
            "Loaded model: {} vertices, {} indices",
            model.vertices.len(),
            model.indices.len()
        );

        let vertex_buffer = Buffer::device_local_with_data(
            device.clone(),
            BufferUsage::Vertex,
            bytemuck::cast_slice(&model.vertices),
            &upload_pool,
        )?;
        let index_buffer = Buffer::device_local_with_data(
            device.clone(),
            BufferUsage::Index,
            bytemuck::cast_slice(&model.indices),
            &upload_pool,
        )?;
        let index_count = model.indices.len() as u32;

        let texture_data = TextureData::load(&config.assets.texture).map_err(|e| {
            RhiError::ResourceCreationFailed(format!(
                "texture {}: {}",
                config.assets.texture.display(),
                e
            ))
        })?;
        let texture = Texture::from_rgba8(
            device.clone(),
            &upload_pool,
            texture_data.width,
            texture_data.height,
            &texture_data.pixels,
        )?;
        let texture_sampler = Sampler::new(device.clone())?;

        drop(upload_pool);

        let image_count = swapchain.image_count() as usize;
        let uniform_buffers = Self::create_uniform_buffers(&device, image_count)?;
        let (descriptor_pool, descriptor_sets) = Self::create_descriptor_sets(
            &device,
            &descriptor_set_layout,
            &uniform_buffers,
            &texture,
            &texture_sampler,
        )?;

        let mut recorder = CommandRecorder::new(device.clone())?;
        recorder.reallocate(image_count)?;
        recorder.record_all(&DrawResources {
            render_pass: &render_pass,
            framebuffers: &framebuffers,
            pipeline: &pipeline,
            pipeline_layout: &pipeline_layout,
            extent: swapchain.extent(),
            vertex_buffer: &vertex_buffer,
            index_buffer: &index_buffer,
            index_count,
            descriptor_sets: &descriptor_sets,
        })?;

        let scheduler = FrameScheduler::new(device.clone(), image_count)?;
        let clock = FrameClock::new();

        info!("Renderer initialized");

        Ok(Self {
            clock,
            scheduler,
            recorder,
            descriptor_pool,
            descriptor_sets,
            uniform_buffers,
            texture_sampler,
            texture,
            index_count,
            index_buffer,
            vertex_buffer,
            pipeline,
            pipeline_layout,
            descriptor_set_layout,
            fragment_shader,
            vertex_shader,
            framebuffers,
            depth_buffer,
            render_pass,
            swapchain,
            framebuffer_size: (width, height),
            framebuffer_resized: false,
            device,
            surface,
            instance,
        })
    }

    /// Records a framebuffer size change.
    ///
    /// The swapchain is not rebuilt here; the pending size is folded into
    /// the next [`draw_frame`](Self::draw_frame) after its present.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == self.framebuffer_size {
            return;
        }

        debug!("Framebuffer resized to {}x{}", width, height);
        self.framebuffer_size = (width, height);
        self.framebuffer_resized = true;
    }

    /// Draws one frame.
    ///
    /// While the framebuffer has zero area (minimized window) this returns
    /// immediately without touching the swapchain; rendering resumes once a
    /// restore reports a usable size.
    ///
    /// # Errors
    ///
    /// Returns an error if a wait, submit, present, or swapchain rebuild
    /// fails. Out-of-date and suboptimal surfaces are handled internally
    /// and are not errors.
    pub fn draw_frame(&mut self) -> RhiResult<()> {
        let (width, height) = self.framebuffer_size;
        if width == 0 || height == 0 {
            return Ok(());
        }

        // 1. Wait until this slot's previous submission has retired.
        self.scheduler.wait_for_current_slot()?;

        let image_available = self.scheduler.current_slot().image_available_handle();
        let render_finished = self.scheduler.current_slot().render_finished_handle();
        let in_flight = self.scheduler.current_slot().in_flight_fence_handle();

        // 2. Acquire a swapchain image. A suboptimal image is still
        //    presentable, so the frame proceeds and the rebuild happens
        //    after present; out-of-date means nothing was acquired.
        let (image_index, mut needs_recreate) =
            match self.swapchain.acquire_next_image(image_available)? {
                AcquireOutcome::Ready { image_index } => (image_index, false),
                AcquireOutcome::Suboptimal { image_index } => {
                    debug!("Swapchain suboptimal on acquire");
                    (image_index, true)
                }
                AcquireOutcome::OutOfDate => {
                    debug!("Swapchain out of date on acquire");
                    self.recreate_swapchain()?;
                    return Ok(());
                }
            };

        // 3. Wait until the frame that last rendered to this image is done,
        //    then mark the image as owned by this slot's fence.
        self.scheduler.claim_image(image_index)?;

        // 4. Write this image's uniform buffer.
        let ubo = UniformBufferObject::new(self.clock.elapsed_secs(), self.swapchain.extent());
        self.uniform_buffers[image_index as usize].write(0, bytemuck::bytes_of(&ubo))?;

        // 5. Submit the image's pre-recorded commands. Color output waits
        //    for the acquire semaphore; the fence tracks the whole frame.
        self.scheduler.reset_current_fence()?;

        let wait_semaphores = [image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.recorder.buffer(image_index as usize)];
        let signal_semaphores = [render_finished];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device.submit_graphics(&[submit_info], in_flight)?;
        }

        // 6. Present, then fold in any resize reported since the last frame.
        match self
            .swapchain
            .present(self.device.present_queue(), image_index, render_finished)?
        {
            PresentOutcome::Presented => {}
            PresentOutcome::Suboptimal => {
                debug!("Swapchain suboptimal on present");
                needs_recreate = true;
            }
            PresentOutcome::OutOfDate => {
                debug!("Swapchain out of date on present");
                needs_recreate = true;
            }
        }

        if self.framebuffer_resized {
            needs_recreate = true;
        }

        if needs_recreate {
            self.recreate_swapchain()?;
        }

        // 7. Advance to the next frame slot.
        self.scheduler.advance();

        Ok(())
    }

    /// Rebuilds the swapchain and everything sized or formatted by it.
    ///
    /// Waits for the device to go idle, recreates the swapchain at the last
    /// reported framebuffer size, then rebuilds the depth buffer, render
    /// pass, framebuffers, pipeline, per-image uniform buffers, descriptor
    /// sets, and command buffers. Skipped while the framebuffer has zero
    /// area.
    ///
    /// # Errors
    ///
    /// Returns an error if any rebuild step fails.
    fn recreate_swapchain(&mut self) -> RhiResult<()> {
        let (width, height) = self.framebuffer_size;
        if width == 0 || height == 0 {
            debug!("Deferring swapchain rebuild while minimized");
            return Ok(());
        }

        // recreate() waits for device idle before tearing anything down.
        self.swapchain
            .recreate(&self.instance, self.surface.handle(), width, height)?;

        self.depth_buffer =
            DepthBuffer::new(&self.instance, self.device.clone(), self.swapchain.extent())?;
        self.render_pass = RenderPass::new(
            self.device.clone(),
            self.swapchain.format(),
            self.depth_buffer.format(),
        )?;
        self.framebuffers = Self::create_framebuffers(
            &self.device,
            &self.swapchain,
            &self.render_pass,
            &self.depth_buffer,
        )?;
        self.pipeline = Self::build_pipeline(
            &self.device,
            &self.vertex_shader,
            &self.fragment_shader,
            &self.render_pass,
            self.swapchain.extent(),
            &self.pipeline_layout,
        )?;

        let image_count = self.swapchain.image_count() as usize;
        self.uniform_buffers = Self::create_uniform_buffers(&self.device, image_count)?;

        // Replacing the pool reclaims every old set at once.
        let (descriptor_pool, descriptor_sets) = Self::create_descriptor_sets(
            &self.device,
            &self.descriptor_set_layout,
            &self.uniform_buffers,
            &self.texture,
            &self.texture_sampler,
        )?;
        self.descriptor_pool = descriptor_pool;
        self.descriptor_sets = descriptor_sets;

        self.recorder.reallocate(image_count)?;
        self.recorder.record_all(&self.draw_resources())?;

        // Old images are gone, so their fence associations are stale.
        self.scheduler.reset_image_owners(image_count);
        self.framebuffer_resized = false;

        info!(
            "Swapchain resources recreated ({}x{}, {} images)",
            width, height, image_count
        );

        Ok(())
    }

    fn draw_resources(&self) -> DrawResources<'_> {
        DrawResources {
            render_pass: &self.render_pass,
            framebuffers: &self.framebuffers,
            pipeline: &self.pipeline,
            pipeline_layout: &self.pipeline_layout,
            extent: self.swapchain.extent(),
            vertex_buffer: &self.vertex_buffer,
            index_buffer: &self.index_buffer,
            index_count: self.index_count,
            descriptor_sets: &self.descriptor_sets,
        }
    }

    fn create_framebuffers(
        device: &Arc<Device>,
        swapchain: &Swapchain,
        render_pass: &RenderPass,
        depth_buffer: &DepthBuffer,
    ) -> RhiResult<Vec<Framebuffer>> {
        swapchain
            .image_views()
            .iter()
            .map(|&color_view| {
                Framebuffer::new(
                    device.clone(),
                    render_pass,
                    &[color_view, depth_buffer.view()],
                    swapchain.extent(),
                )
            })
            .collect()
    }

    fn create_uniform_buffers(device: &Arc<Device>, image_count: usize) -> RhiResult<Vec<Buffer>> {
        (0..image_count)
            .map(|_| {
                Buffer::new(
                    device.clone(),
                    BufferUsage::Uniform,
                    UniformBufferObject::SIZE as vk::DeviceSize,
                )
            })
            .collect()
    }

    fn create_descriptor_sets(
        device: &Arc<Device>,
        layout: &DescriptorSetLayout,
        uniform_buffers: &[Buffer],
        texture: &Texture,
        sampler: &Sampler,
    ) -> RhiResult<(DescriptorPool, Vec<vk::DescriptorSet>)> {
        let image_count = uniform_buffers.len() as u32;

        let pool_sizes = [
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(image_count),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(image_count),
        ];
        let pool = DescriptorPool::new(device.clone(), image_count, &pool_sizes)?;

        let layouts = vec![layout.handle(); uniform_buffers.len()];
        let sets = pool.allocate(&layouts)?;

        for (set, buffer) in sets.iter().zip(uniform_buffers) {
            let buffer_infos = [descriptor::buffer_info(
                buffer.handle(),
                0,
                UniformBufferObject::SIZE as vk::DeviceSize,
            )];
            let image_infos = [descriptor::image_info(
                sampler.handle(),
                texture.view(),
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )];

            let writes = [
                vk::WriteDescriptorSet::default()
                    .dst_set(*set)
                    .dst_binding(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&buffer_infos),
                vk::WriteDescriptorSet::default()
                    .dst_set(*set)
                    .dst_binding(1)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(&image_infos),
            ];

            update_descriptor_sets(device, &writes);
        }

        Ok((pool, sets))
    }

    fn build_pipeline(
        device: &Arc<Device>,
        vertex_shader: &Shader,
        fragment_shader: &Shader,
        render_pass: &RenderPass,
        extent: vk::Extent2D,
        layout: &PipelineLayout,
    ) -> RhiResult<Pipeline> {
        GraphicsPipelineBuilder::new()
            .vertex_shader(vertex_shader)
            .fragment_shader(fragment_shader)
            .vertex_binding(Vertex::binding_description())
            .vertex_attributes(&Vertex::attribute_descriptions())
            .render_pass(render_pass)
            .extent(extent)
            .build(device.clone(), layout)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Field drops run after this body; the GPU must be quiet first.
        if let Err(e) = self.device.wait_idle() {
            error!("Failed to wait for device idle during teardown: {:?}", e);
        }
        info!("Renderer destroyed");
    }
}
