//! Asset loading for the viewer.
//!
//! This crate handles loading of external assets:
//! - Wavefront OBJ model loading with vertex deduplication
//! - Image decoding into RGBA8 texture data
//!
//! Loaders return CPU-side data; turning it into device buffers and images
//! is the renderer's job.

pub mod error;
pub mod model;
pub mod texture;

pub use error::{AssetError, AssetResult};
pub use model::Model;
pub use texture::TextureData;
