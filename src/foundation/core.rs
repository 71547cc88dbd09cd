/// Which preview tier a render request targets.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Downscaled full-frame preview ("fit").
    #[default]
    Proxy,
    /// True-resolution crop for 1:1 inspection ("100%").
    Loupe,
}

impl ViewMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            Self::Proxy => Self::Loupe,
            Self::Loupe => Self::Proxy,
        }
    }
}

/// Normalized focus point in `[0, 1]²`, relative to the source image.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FocusPoint {
    /// Horizontal position, `0` = left edge, `1` = right edge.
    pub x: f64,
    /// Vertical position, `0` = top edge, `1` = bottom edge.
    pub y: f64,
}

impl Default for FocusPoint {
    fn default() -> Self {
        Self::CENTER
    }
}

impl FocusPoint {
    /// Image center.
    pub const CENTER: Self = Self { x: 0.5, y: 0.5 };

    /// Build a focus point, clamping each coordinate into `[0, 1]`.
    ///
    /// Non-finite coordinates fall back to the center on that axis.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    /// Return a copy with both coordinates clamped into `[0, 1]`.
    pub fn clamped(self) -> Self {
        Self::new(self.x, self.y)
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.5 }
}

/// Integer crop rectangle in source pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CropRect {
    /// Left edge (inclusive).
    pub x: u32,
    /// Top edge (inclusive).
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CropRect {
    /// Rectangle covering a whole `width × height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Return `true` when the rectangle fits inside a `width × height` image.
    pub fn fits_within(self, width: u32, height: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
