//! Larm is the image workspace and render coordination layer around an external film-grain
//! engine.
//!
//! It derives preview tiers from a loaded image, moves pixels in and out of the engine's flat
//! RGB byte layout, and coalesces bursts of parameter edits into few engine calls. Two shapes
//! share that core:
//!
//! - [`Studio`]: one current workspace with a debounced live preview (desktop style)
//! - [`SessionStore`] and the [`server`] router: many independent upload sessions over HTTP
//!
//! The engine itself is reached through [`GrainEngine`]; [`NativeEngine`] binds it from a
//! shared library.
#![deny(unsafe_code)]

pub mod assets;
pub mod encode;
pub mod engine;
pub mod foundation;
pub mod pixel;
pub mod render;
pub mod server;
pub mod session;
pub mod workspace;

pub use crate::assets::source::SourceImage;
pub use crate::engine::bridge::{GrainEngine, apply_engine};
pub use crate::engine::native::{DEFAULT_ENGINE_SYMBOL, NativeEngine};
pub use crate::engine::params::{EffectParameters, EngineParams};
pub use crate::foundation::core::{CropRect, FocusPoint, ViewMode};
pub use crate::foundation::error::{LarmError, LarmResult};
pub use crate::pixel::codec::RgbBuffer;
pub use crate::render::coordinator::{
    CoordinatorOpts, CoordinatorPhase, CoordinatorStats, RenderCoordinator, Rendered,
};
pub use crate::render::request::RenderRequest;
pub use crate::render::studio::{Preview, Studio, StudioOpts};
pub use crate::server::{AppState, ServerOpts};
pub use crate::session::store::{Session, SessionId, SessionStore};
pub use crate::workspace::crop::crop_bounds;
pub use crate::workspace::tier::{Tier, TierKind, TierOpts};
pub use crate::workspace::workspace::{Workspace, WorkspaceSummary};
