//! Error types shared across the viewer workspace.

use thiserror::Error;

/// Errors produced by the platform and configuration layers.
///
/// GPU-side failures have their own taxonomy in `meshview_rhi`; this type
/// covers everything that happens before a device exists.
#[derive(Error, Debug)]
pub enum Error {
    /// Window creation or management errors
    #[error("Window error: {0}")]
    Window(String),

    /// Surface or loader errors raised before the RHI owns the failure
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// Configuration file errors
    #[error("Config error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using the viewer's Error type.
pub type Result<T> = std::result::Result<T, Error>;
