use image::{GenericImageView, Pixel, RgbImage};
use rayon::prelude::*;

use crate::foundation::error::{LarmError, LarmResult};

/// Bytes per pixel in every buffer this crate hands to the engine.
pub const RGB_BYTES_PER_PIXEL: usize = 3;

/// Byte length of a tightly packed RGB8 buffer for `width × height` pixels.
pub fn rgb_byte_len(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(RGB_BYTES_PER_PIXEL)
}

/// Flat RGB8 pixel buffer, row-major, 3 bytes per pixel in R,G,B order.
///
/// The length always equals `width * height * 3`; no constructor can produce anything else and
/// the buffer is never resized after creation.
#[derive(Clone, PartialEq, Eq)]
pub struct RgbBuffer {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for RgbBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RgbBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl RgbBuffer {
    /// Allocate a zero-filled buffer.
    pub fn zeroed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bytes: vec![0u8; rgb_byte_len(width, height)],
        }
    }

    /// Wrap existing bytes, rejecting any length other than `width * height * 3`.
    pub fn from_bytes(bytes: Vec<u8>, width: u32, height: u32) -> LarmResult<Self> {
        check_len(bytes.len(), width, height)?;
        Ok(Self {
            width,
            height,
            bytes,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Byte length (`width * height * 3`).
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Return `true` for a zero-area buffer.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutably borrow the raw bytes. The length cannot change through this view.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Unwrap into the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Return `true` when `other` has the same dimensions (and therefore the same length).
    pub fn same_shape(&self, other: &RgbBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }
}

fn check_len(actual: usize, width: u32, height: u32) -> LarmResult<()> {
    let expected = rgb_byte_len(width, height);
    if actual != expected {
        return Err(LarmError::size_mismatch(expected, actual));
    }
    Ok(())
}

/// Flatten a pixel grid into an [`RgbBuffer`].
///
/// Any 8-bit pixel type is accepted; alpha (if present) is dropped and not reconstructed.
/// Rows are filled in parallel.
pub fn encode<I>(grid: &I) -> RgbBuffer
where
    I: GenericImageView + Sync,
    I::Pixel: Pixel<Subpixel = u8>,
{
    let (width, height) = grid.dimensions();
    let mut out = RgbBuffer::zeroed(width, height);
    if out.is_empty() {
        return out;
    }

    let row_len = width as usize * RGB_BYTES_PER_PIXEL;
    out.bytes
        .par_chunks_exact_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as u32;
            for (x, px) in row.chunks_exact_mut(RGB_BYTES_PER_PIXEL).enumerate() {
                let rgb = grid.get_pixel(x as u32, y).to_rgb();
                px.copy_from_slice(&rgb.0);
            }
        });
    out
}

/// Rebuild a pixel grid from raw RGB8 bytes; the exact inverse of [`encode`].
pub fn decode(bytes: &[u8], width: u32, height: u32) -> LarmResult<RgbImage> {
    check_len(bytes.len(), width, height)?;
    RgbImage::from_raw(width, height, bytes.to_vec())
        .ok_or_else(|| LarmError::size_mismatch(rgb_byte_len(width, height), bytes.len()))
}

/// Decode a whole [`RgbBuffer`], always reading from its first byte.
pub fn decode_buffer(buf: &RgbBuffer) -> LarmResult<RgbImage> {
    decode(buf.as_bytes(), buf.width, buf.height)
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/codec.rs"]
mod tests;
