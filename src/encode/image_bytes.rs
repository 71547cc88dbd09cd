use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};

use crate::foundation::error::{LarmError, LarmResult};

/// JPEG quality used for previews unless configured otherwise.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// File name suggested to browsers for full-resolution exports.
pub const EXPORT_FILE_NAME: &str = "grain_export.png";

/// Encode an RGB image as baseline JPEG.
pub fn to_jpeg_bytes(img: &RgbImage, quality: u8) -> LarmResult<Vec<u8>> {
    if !(1..=100).contains(&quality) {
        return Err(LarmError::validation("jpeg quality must be in 1..=100"));
    }
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| LarmError::encode(format!("jpeg encode failed: {e}")))?;
    Ok(out)
}

/// Encode an RGB image as PNG.
pub fn to_png_bytes(img: &RgbImage) -> LarmResult<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| LarmError::encode(format!("png encode failed: {e}")))?;
    Ok(out)
}

/// Write an RGB image as a PNG file, creating parent directories as needed.
pub fn write_png(img: &RgbImage, path: &Path) -> LarmResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = to_png_bytes(img)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
