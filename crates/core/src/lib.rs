//! Core utilities for the meshview workspace.
//!
//! This crate provides foundational types used across the viewer:
//! - Error types and result aliases
//! - Logging initialization
//! - Frame timing
//! - Configuration loading

mod clock;
mod config;
mod error;
mod logging;

pub use clock::FrameClock;
pub use config::{AppConfig, AssetConfig, WindowConfig};
pub use error::{Error, Result};
pub use logging::init_logging;
