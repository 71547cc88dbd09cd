use std::path::Path;

use image::RgbImage;

use crate::assets::source::SourceImage;
use crate::encode::image_bytes::write_png;
use crate::engine::bridge::GrainEngine;
use crate::engine::params::EffectParameters;
use crate::foundation::core::ViewMode;
use crate::foundation::error::LarmResult;
use crate::workspace::tier::{Tier, TierOpts};

/// Geometry summary of a loaded workspace.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSummary {
    /// Original width.
    pub width: u32,
    /// Original height.
    pub height: u32,
    /// Proxy width.
    pub proxy_width: u32,
    /// Proxy height.
    pub proxy_height: u32,
    /// Proxy scale relative to the original.
    pub proxy_scale: f64,
    /// Loupe width.
    pub loupe_width: u32,
    /// Loupe height.
    pub loupe_height: u32,
}

/// The single live image of the interactive shape: source plus its prebuilt preview tiers.
///
/// A reload builds a new `Workspace`; tiers are never resized in place.
#[derive(Debug)]
pub struct Workspace {
    source: SourceImage,
    proxy: Tier,
    loupe: Tier,
}

impl Workspace {
    /// Build every preview tier for `source`, filling their input buffers up front.
    pub fn from_source(source: SourceImage, opts: TierOpts) -> LarmResult<Self> {
        opts.validate()?;
        let (proxy, loupe) = rayon::join(
            || Tier::proxy(&source, opts.proxy_max_width),
            || Tier::loupe(&source, opts.loupe_size),
        );
        Ok(Self {
            source,
            proxy,
            loupe,
        })
    }

    /// Decode `path` and build its tiers.
    #[tracing::instrument(skip(opts), fields(path = %path.display()))]
    pub fn load(path: &Path, opts: TierOpts) -> LarmResult<Self> {
        let ws = Self::from_source(SourceImage::open(path)?, opts)?;
        let s = ws.summary();
        tracing::info!(
            width = s.width,
            height = s.height,
            proxy_width = s.proxy_width,
            proxy_height = s.proxy_height,
            "workspace loaded"
        );
        Ok(ws)
    }

    /// Borrow the original image.
    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    /// Tier backing a preview mode.
    pub fn tier(&self, view: ViewMode) -> &Tier {
        match view {
            ViewMode::Proxy => &self.proxy,
            ViewMode::Loupe => &self.loupe,
        }
    }

    /// Geometry summary.
    pub fn summary(&self) -> WorkspaceSummary {
        let (width, height) = self.source.dimensions();
        WorkspaceSummary {
            width,
            height,
            proxy_width: self.proxy.width(),
            proxy_height: self.proxy.height(),
            proxy_scale: self.proxy.scale_factor(),
            loupe_width: self.loupe.width(),
            loupe_height: self.loupe.height(),
        }
    }

    /// Render a preview tier, reusing that tier's buffers.
    pub fn render_preview(
        &self,
        engine: &dyn GrainEngine,
        params: &EffectParameters,
        view: ViewMode,
    ) -> LarmResult<RgbImage> {
        self.tier(view).render_in_place(engine, params)
    }

    /// Render the full-resolution image with unscaled parameters into fresh buffers.
    #[tracing::instrument(skip_all)]
    pub fn export(
        &self,
        engine: &dyn GrainEngine,
        params: &EffectParameters,
    ) -> LarmResult<RgbImage> {
        let (w, h) = self.source.dimensions();
        tracing::info!(width = w, height = h, "exporting full resolution image");
        Tier::original(&self.source).render_detached(engine, params)
    }

    /// [`Self::export`] and write the result as PNG.
    pub fn export_to(
        &self,
        engine: &dyn GrainEngine,
        params: &EffectParameters,
        out: &Path,
    ) -> LarmResult<()> {
        let img = self.export(engine, params)?;
        write_png(&img, out)?;
        tracing::info!(path = %out.display(), "export written");
        Ok(())
    }
}
