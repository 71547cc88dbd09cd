use crate::foundation::core::{CropRect, FocusPoint};

/// Map a normalized focus point and a desired square crop edge to pixel bounds.
///
/// The origin is `round(extent * focus - size / 2)` clamped to `[0, max(0, extent - size)]` on
/// each axis; the crop shrinks for sources smaller than `size`. The focus point is clamped into
/// `[0, 1]` first.
pub fn crop_bounds(src_width: u32, src_height: u32, focus: FocusPoint, size: u32) -> CropRect {
    let focus = focus.clamped();
    let x = axis_start(src_width, focus.x, size);
    let y = axis_start(src_height, focus.y, size);
    CropRect {
        x,
        y,
        width: size.min(src_width - x),
        height: size.min(src_height - y),
    }
}

/// Crop of edge `size` centered on the image, origin `(extent - edge) / 2` rounded down.
///
/// For odd size differences this sits one pixel up/left of `crop_bounds` at the center focus.
pub fn center_crop(src_width: u32, src_height: u32, size: u32) -> CropRect {
    let width = size.min(src_width);
    let height = size.min(src_height);
    CropRect {
        x: (src_width - width) / 2,
        y: (src_height - height) / 2,
        width,
        height,
    }
}

fn axis_start(extent: u32, focus: f64, size: u32) -> u32 {
    let max_start = extent.saturating_sub(size);
    let ideal = (f64::from(extent) * focus - f64::from(size) / 2.0).round();
    // `max_start` fits in u32, so clamping in f64 first keeps the cast lossless.
    ideal.clamp(0.0, f64::from(max_start)) as u32
}

#[cfg(test)]
#[path = "../../tests/unit/workspace/crop.rs"]
mod tests;
