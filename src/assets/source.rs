use std::path::Path;

use image::RgbImage;

use crate::foundation::error::{LarmError, LarmResult};

/// Decoded original image. Immutable once loaded.
///
/// Alpha is discarded at decode time; nothing downstream reconstructs it.
#[derive(Clone, Debug)]
pub struct SourceImage {
    pixels: RgbImage,
}

impl SourceImage {
    /// Decode any format the `image` crate recognizes from memory.
    #[tracing::instrument(skip(bytes), fields(len = bytes.len()))]
    pub fn decode(bytes: &[u8]) -> LarmResult<Self> {
        if bytes.is_empty() {
            return Err(LarmError::decode("image payload is empty"));
        }
        let img = image::load_from_memory(bytes)
            .map_err(|e| LarmError::decode(format!("could not decode image: {e}")))?;
        Self::from_rgb(img.into_rgb8())
    }

    /// Read and decode an image file.
    pub fn open(path: &Path) -> LarmResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes).map_err(|e| match e {
            LarmError::Decode(msg) => {
                LarmError::decode(format!("could not read image '{}': {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Wrap an already decoded RGB image, rejecting zero-area images.
    pub fn from_rgb(pixels: RgbImage) -> LarmResult<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(LarmError::decode("image has zero width or height"));
        }
        Ok(Self { pixels })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Borrow the pixel grid.
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}
