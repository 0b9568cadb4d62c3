//! Main rendering pipeline.
//!
//! This crate orchestrates drawing the textured model:
//! - Frame scheduling across in-flight slots and swapchain images
//! - Pre-recorded per-image command buffers
//! - Uniform buffer animation and the depth attachment
//! - Swapchain-dependent resource lifecycles
//!
//! The entry point is [`Renderer`]; everything else supports it.

pub mod depth_buffer;
pub mod frame_scheduler;
pub mod recorder;
pub mod renderer;
pub mod ubo;

pub use renderer::Renderer;
