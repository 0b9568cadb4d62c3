//! Error types for asset loading.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for asset loading operations.
#[derive(Error, Debug)]
pub enum AssetError {
    /// A directive in an OBJ file could not be parsed.
    #[error("Malformed OBJ data in '{path}' line {line}: {message}")]
    ObjParse {
        /// Path to the file that failed to parse.
        path: PathBuf,
        /// One-based line number of the offending directive.
        line: usize,
        /// What was wrong with it.
        message: String,
    },

    /// An OBJ file parsed cleanly but defined no faces.
    #[error("OBJ file '{0}' contains no faces")]
    EmptyModel(PathBuf),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type alias for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;
