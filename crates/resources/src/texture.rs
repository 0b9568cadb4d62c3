//! Texture image loading and decoding.

use std::path::Path;

use tracing::info;

use crate::error::AssetResult;

/// Decoded RGBA8 image data ready for upload.
///
/// Pixels are tightly packed row-major with no padding, so the buffer is
/// always `width * height * 4` bytes.
#[derive(Debug, Clone)]
pub struct TextureData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA8 pixel data.
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Loads and decodes an image file into RGBA8.
    ///
    /// Any format the `image` crate understands is accepted; images with
    /// other channel layouts are converted, so a gray or RGB source still
    /// comes out as four bytes per pixel.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn load(path: &Path) -> AssetResult<Self> {
        let image = image::open(path)?.into_rgba8();
        let (width, height) = image.dimensions();
        let pixels = image.into_raw();

        info!(
            "Loaded texture '{}': {}x{} ({} bytes)",
            path.display(),
            width,
            height,
            pixels.len()
        );

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Returns the byte length implied by the dimensions.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_len_matches_dimensions() {
        let data = TextureData {
            width: 16,
            height: 8,
            pixels: vec![0; 16 * 8 * 4],
        };
        assert_eq!(data.byte_len(), 512);
        assert_eq!(data.pixels.len(), data.byte_len());
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let result = TextureData::load(Path::new("does/not/exist.png"));
        assert!(result.is_err());
    }
}
