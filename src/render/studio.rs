use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use image::RgbImage;

use crate::engine::bridge::GrainEngine;
use crate::engine::params::EffectParameters;
use crate::foundation::core::ViewMode;
use crate::foundation::error::{LarmError, LarmResult};
use crate::render::coordinator::{
    CoordinatorOpts, CoordinatorPhase, CoordinatorStats, RenderCoordinator, Rendered,
};
use crate::render::request::RenderRequest;
use crate::workspace::tier::TierOpts;
use crate::workspace::workspace::{Workspace, WorkspaceSummary};

/// Interactive shape configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StudioOpts {
    /// Tier geometry of loaded workspaces.
    pub tiers: TierOpts,
    /// Render coordination.
    pub coordinator: CoordinatorOpts,
}

/// A rendered preview frame.
#[derive(Debug)]
pub struct Preview {
    /// Tier the frame was rendered from.
    pub view: ViewMode,
    /// Load generation of the workspace that produced the frame.
    pub generation: u64,
    /// Rendered pixels.
    pub image: RgbImage,
}

#[derive(Clone)]
struct Loaded {
    generation: u64,
    workspace: Arc<Workspace>,
}

type WorkspaceSlot = Arc<RwLock<Option<Loaded>>>;

/// Interactive desktop shape: one current workspace, one coordinated preview stream.
///
/// Every state change (parameters, view) becomes an immutable [`RenderRequest`] handed to a
/// [`RenderCoordinator`]. Rendering happens on the coordinator's worker thread and the newest
/// finished frame is read back through [`Studio::latest_preview`].
pub struct Studio {
    engine: Arc<dyn GrainEngine>,
    opts: StudioOpts,
    workspace: WorkspaceSlot,
    generation: AtomicU64,
    current: Mutex<RenderRequest>,
    coordinator: RenderCoordinator<Preview>,
}

impl Studio {
    /// Create an empty studio bound to `engine`.
    pub fn new(engine: Arc<dyn GrainEngine>, opts: StudioOpts) -> LarmResult<Self> {
        opts.tiers.validate()?;
        let workspace: WorkspaceSlot = Arc::new(RwLock::new(None));

        let coordinator = {
            let slot = workspace.clone();
            let engine = engine.clone();
            RenderCoordinator::spawn(
                opts.coordinator,
                move |req: &RenderRequest| -> LarmResult<Preview> {
                    let loaded = slot
                        .read()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone()
                        .ok_or_else(|| LarmError::validation("no image loaded"))?;
                    let image =
                        loaded
                            .workspace
                            .render_preview(engine.as_ref(), &req.params, req.view)?;
                    Ok(Preview {
                        view: req.view,
                        generation: loaded.generation,
                        image,
                    })
                },
            )?
        };

        Ok(Self {
            engine,
            opts,
            workspace,
            generation: AtomicU64::new(0),
            current: Mutex::new(RenderRequest::default()),
            coordinator,
        })
    }

    /// Load `path` as the new workspace, replacing the current one, and re-render.
    pub fn load(&self, path: &Path) -> LarmResult<WorkspaceSummary> {
        let ws = Workspace::load(path, self.opts.tiers)?;
        Ok(self.install(ws))
    }

    /// [`Self::load`] on a background thread.
    pub fn load_in_background(
        self: &Arc<Self>,
        path: PathBuf,
    ) -> JoinHandle<LarmResult<WorkspaceSummary>> {
        let studio = self.clone();
        std::thread::spawn(move || studio.load(&path))
    }

    /// Replace the current workspace with `ws` and re-submit the current request.
    pub fn install(&self, ws: Workspace) -> WorkspaceSummary {
        let summary = ws.summary();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self
            .workspace
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Loaded {
            generation,
            workspace: Arc::new(ws),
        });
        tracing::debug!(generation, "workspace installed");
        let cur = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        self.coordinator.submit(cur.clone());
        summary
    }

    /// Whether an image is loaded.
    pub fn has_workspace(&self) -> bool {
        self.loaded().is_some()
    }

    /// Geometry of the loaded workspace.
    pub fn workspace_summary(&self) -> Option<WorkspaceSummary> {
        self.loaded().map(|l| l.workspace.summary())
    }

    /// The request describing the current parameters and view.
    pub fn request(&self) -> RenderRequest {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the effect parameters. Returns the render sequence number, if one was queued.
    pub fn set_params(&self, params: EffectParameters) -> Option<u64> {
        self.update(|req| req.params = params)
    }

    /// Switch preview mode.
    pub fn set_view(&self, view: ViewMode) -> Option<u64> {
        self.update(|req| req.view = view)
    }

    /// Flip between proxy and loupe.
    pub fn toggle_view(&self) -> Option<u64> {
        self.update(|req| req.view = req.view.toggled())
    }

    /// Replace the whole current request.
    pub fn submit(&self, request: RenderRequest) -> Option<u64> {
        self.update(|req| *req = request)
    }

    fn update(&self, f: impl FnOnce(&mut RenderRequest)) -> Option<u64> {
        // The guard stays held across submit so submissions arrive in edit order.
        let mut cur = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cur);
        // Without a workspace the request is only recorded; install() submits it later.
        if self.has_workspace() {
            Some(self.coordinator.submit(cur.clone()))
        } else {
            None
        }
    }

    /// Newest finished preview.
    pub fn latest_preview(&self) -> Option<Arc<Rendered<Preview>>> {
        self.coordinator.latest()
    }

    /// Wait until the preview for render `seq` (or a newer one) is available.
    pub fn wait_for_preview(&self, seq: u64, timeout: Duration) -> Option<Arc<Rendered<Preview>>> {
        self.coordinator.wait_for(seq, timeout)
    }

    /// Wait until no render is pending or running.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.coordinator.wait_idle(timeout)
    }

    /// Coordinator phase.
    pub fn phase(&self) -> CoordinatorPhase {
        self.coordinator.phase()
    }

    /// Coordinator counters.
    pub fn stats(&self) -> CoordinatorStats {
        self.coordinator.stats()
    }

    /// Message of the last failed preview render.
    pub fn last_error(&self) -> Option<String> {
        self.coordinator.last_error()
    }

    /// Render the loaded image at full resolution with unscaled `params`.
    pub fn export(&self, params: &EffectParameters) -> LarmResult<RgbImage> {
        self.require_loaded()?
            .workspace
            .export(self.engine.as_ref(), params)
    }

    /// [`Self::export`] and write the result as PNG.
    pub fn export_to(&self, out: &Path, params: &EffectParameters) -> LarmResult<()> {
        self.require_loaded()?
            .workspace
            .export_to(self.engine.as_ref(), params, out)
    }

    /// [`Self::export_to`] on a background thread.
    ///
    /// The workspace is captured up front, so a reload during the export does not change it.
    pub fn export_in_background(
        &self,
        out: PathBuf,
        params: EffectParameters,
    ) -> LarmResult<JoinHandle<LarmResult<()>>> {
        let loaded = self.require_loaded()?;
        let engine = self.engine.clone();
        Ok(std::thread::spawn(move || {
            loaded.workspace.export_to(engine.as_ref(), &params, &out)
        }))
    }

    fn loaded(&self) -> Option<Loaded> {
        self.workspace
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn require_loaded(&self) -> LarmResult<Loaded> {
        self.loaded()
            .ok_or_else(|| LarmError::validation("no image loaded"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/studio.rs"]
mod tests;
