use std::sync::{Mutex, PoisonError};

use image::RgbImage;
use image::imageops::{self, FilterType};

use crate::assets::source::SourceImage;
use crate::engine::bridge::{GrainEngine, apply_engine};
use crate::engine::params::EffectParameters;
use crate::foundation::core::{CropRect, FocusPoint};
use crate::foundation::error::{LarmError, LarmResult};
use crate::pixel::codec::{self, RgbBuffer};
use crate::workspace::crop::{center_crop, crop_bounds};

/// Default proxy width threshold.
pub const DEFAULT_PROXY_MAX_WIDTH: u32 = 1200;
/// Default loupe / crop edge length.
pub const DEFAULT_LOUPE_SIZE: u32 = 512;

/// Tier geometry configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierOpts {
    /// Sources wider than this get a downscaled proxy exactly this wide.
    pub proxy_max_width: u32,
    /// Edge length of the loupe / crop tier (clamped to the source extent).
    pub loupe_size: u32,
}

impl Default for TierOpts {
    fn default() -> Self {
        Self {
            proxy_max_width: DEFAULT_PROXY_MAX_WIDTH,
            loupe_size: DEFAULT_LOUPE_SIZE,
        }
    }
}

impl TierOpts {
    /// Reject zero-sized geometry.
    pub fn validate(&self) -> LarmResult<()> {
        if self.proxy_max_width == 0 {
            return Err(LarmError::validation("proxy_max_width must be > 0"));
        }
        if self.loupe_size == 0 {
            return Err(LarmError::validation("loupe_size must be > 0"));
        }
        Ok(())
    }
}

/// Role of a tier within a workspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierKind {
    /// Downscaled full frame for fast preview.
    Proxy,
    /// Fixed center crop at native resolution (interactive shape).
    Loupe,
    /// Focus-driven crop at native resolution (server shape).
    Crop,
    /// Full native resolution, export only.
    Original,
}

/// Proxy scale factor for a source of `width` pixels: `max_width / width` when wider, else `1.0`.
pub fn proxy_scale(width: u32, max_width: u32) -> f64 {
    if width > max_width {
        f64::from(max_width) / f64::from(width)
    } else {
        1.0
    }
}

fn scaled_dim(dim: u32, scale: f64) -> u32 {
    (f64::from(dim) * scale).round().max(1.0) as u32
}

/// One resolution variant of a loaded image with its own input/output buffer pair.
///
/// The input buffer is filled at construction and never written again. The tier's own output
/// buffer is allocated at the same size on the first in-place render and reused afterwards;
/// tiers that are only rendered detached never hold one.
#[derive(Debug)]
pub struct Tier {
    kind: TierKind,
    scale_factor: f64,
    region: CropRect,
    input: RgbBuffer,
    output: Mutex<Option<RgbBuffer>>,
}

impl Tier {
    fn from_grid(kind: TierKind, scale_factor: f64, region: CropRect, grid: &RgbImage) -> Self {
        let input = codec::encode(grid);
        tracing::debug!(
            ?kind,
            width = input.width(),
            height = input.height(),
            scale_factor,
            "tier built"
        );
        Self {
            kind,
            scale_factor,
            region,
            input,
            output: Mutex::new(None),
        }
    }

    /// Downscaled full frame, bilinear filtered, at most `max_width` pixels wide.
    pub fn proxy(source: &SourceImage, max_width: u32) -> Self {
        let (w, h) = source.dimensions();
        let scale = proxy_scale(w, max_width);
        let region = CropRect::full(w, h);
        if scale == 1.0 {
            return Self::from_grid(TierKind::Proxy, 1.0, region, source.pixels());
        }

        let pw = scaled_dim(w, scale);
        let ph = scaled_dim(h, scale);
        let resized = imageops::resize(source.pixels(), pw, ph, FilterType::Triangle);
        Self::from_grid(TierKind::Proxy, scale, region, &resized)
    }

    /// Center crop of edge `size` at native resolution, origin `(extent - edge) / 2` rounded
    /// down.
    pub fn loupe(source: &SourceImage, size: u32) -> Self {
        let (w, h) = source.dimensions();
        Self::native_region(TierKind::Loupe, source, center_crop(w, h, size))
    }

    /// Crop of edge `size` around `focus` at native resolution.
    pub fn crop(source: &SourceImage, focus: FocusPoint, size: u32) -> Self {
        let (w, h) = source.dimensions();
        Self::native_region(TierKind::Crop, source, crop_bounds(w, h, focus, size))
    }

    /// The full source at native resolution.
    pub fn original(source: &SourceImage) -> Self {
        let (w, h) = source.dimensions();
        Self::from_grid(
            TierKind::Original,
            1.0,
            CropRect::full(w, h),
            source.pixels(),
        )
    }

    fn native_region(kind: TierKind, source: &SourceImage, rect: CropRect) -> Self {
        let view = imageops::crop_imm(source.pixels(), rect.x, rect.y, rect.width, rect.height);
        Self::from_grid(kind, 1.0, rect, &view.to_image())
    }

    /// Tier role.
    pub fn kind(&self) -> TierKind {
        self.kind
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.input.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.input.height()
    }

    /// Scale relative to the original (`<= 1.0`; `1.0` for native-resolution tiers).
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Region of the original image this tier covers.
    pub fn region(&self) -> CropRect {
        self.region
    }

    /// Multiplier applied to the grain size for this tier. Only proxies scale grain.
    pub fn grain_scale(&self) -> f64 {
        match self.kind {
            TierKind::Proxy => self.scale_factor,
            TierKind::Loupe | TierKind::Crop | TierKind::Original => 1.0,
        }
    }

    /// The pre-filled input buffer.
    pub fn input(&self) -> &RgbBuffer {
        &self.input
    }

    /// Whether the tier's own output buffer has been allocated.
    pub fn holds_output_buffer(&self) -> bool {
        self.output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Decode the unprocessed tier pixels.
    pub fn input_image(&self) -> LarmResult<RgbImage> {
        codec::decode_buffer(&self.input)
    }

    /// Render into this tier's own output buffer and decode the result.
    ///
    /// The output buffer is held exclusively for the whole call, so concurrent renders of the
    /// same tier run one after another.
    pub fn render_in_place(
        &self,
        engine: &dyn GrainEngine,
        params: &EffectParameters,
    ) -> LarmResult<RgbImage> {
        let mut slot = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        let output = slot.get_or_insert_with(|| RgbBuffer::zeroed(self.width(), self.height()));
        apply_engine(
            engine,
            &self.input,
            output,
            &params.to_engine(self.grain_scale()),
        )?;
        codec::decode_buffer(output)
    }

    /// Render into a freshly allocated output buffer, leaving the tier's own buffer untouched.
    pub fn render_detached(
        &self,
        engine: &dyn GrainEngine,
        params: &EffectParameters,
    ) -> LarmResult<RgbImage> {
        let mut output = RgbBuffer::zeroed(self.width(), self.height());
        apply_engine(
            engine,
            &self.input,
            &mut output,
            &params.to_engine(self.grain_scale()),
        )?;
        codec::decode_buffer(&output)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/workspace/tier.rs"]
mod tests;
