//! Platform abstraction layer for the viewer.
//!
//! This crate provides platform-specific functionality:
//! - Window management via winit
//! - Vulkan surface creation and ownership
//! - The surface-event queue drained by the render loop

mod events;
mod window;

pub use events::{EventQueue, SurfaceEvent};
pub use window::{Surface, Window, required_surface_extensions};
