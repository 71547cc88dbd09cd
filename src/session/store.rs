use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use image::RgbImage;

use crate::assets::source::SourceImage;
use crate::engine::bridge::GrainEngine;
use crate::engine::params::EffectParameters;
use crate::foundation::core::ViewMode;
use crate::foundation::error::{LarmError, LarmResult};
use crate::render::request::RenderRequest;
use crate::workspace::tier::{Tier, TierOpts};

/// Opaque session token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = LarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| LarmError::session_not_found(s))
    }
}

/// One uploaded image: its source and prebuilt proxy tier.
///
/// Sessions are immutable after creation. Every render allocates its own output buffer, so any
/// number of requests may use the same session at once.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    source: SourceImage,
    proxy: Tier,
}

impl Session {
    /// Build a session around a decoded image.
    pub fn new(id: SessionId, source: SourceImage, opts: TierOpts) -> LarmResult<Self> {
        opts.validate()?;
        let proxy = Tier::proxy(&source, opts.proxy_max_width);
        Ok(Self { id, source, proxy })
    }

    /// Session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Original image.
    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    /// Proxy tier.
    pub fn proxy(&self) -> &Tier {
        &self.proxy
    }

    /// Unprocessed proxy pixels.
    pub fn proxy_image(&self) -> LarmResult<RgbImage> {
        self.proxy.input_image()
    }

    /// Render a preview.
    ///
    /// Proxy mode renders the proxy tier with grain size scaled to it. Loupe mode builds a crop
    /// of edge `crop_size` around the request's focus (center when absent) and renders it
    /// unscaled.
    pub fn preview(
        &self,
        engine: &dyn GrainEngine,
        request: &RenderRequest,
        crop_size: u32,
    ) -> LarmResult<RgbImage> {
        match request.view {
            ViewMode::Proxy => self.proxy.render_detached(engine, &request.params),
            ViewMode::Loupe => {
                let focus = request.focus.unwrap_or_default();
                Tier::crop(&self.source, focus, crop_size).render_detached(engine, &request.params)
            }
        }
    }

    /// Render the full-resolution image with unscaled `params`.
    #[tracing::instrument(skip_all, fields(session = %self.id))]
    pub fn export(
        &self,
        engine: &dyn GrainEngine,
        params: &EffectParameters,
    ) -> LarmResult<RgbImage> {
        Tier::original(&self.source).render_detached(engine, params)
    }
}

/// Concurrent map of live sessions.
///
/// One owner per session, explicit removal, no eviction.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Arc<Session>>,
    opts: TierOpts,
}

impl SessionStore {
    /// Empty store building tiers with `opts`.
    pub fn new(opts: TierOpts) -> Self {
        Self {
            sessions: DashMap::new(),
            opts,
        }
    }

    /// Tier geometry used for new sessions.
    pub fn opts(&self) -> TierOpts {
        self.opts
    }

    /// Decode `bytes` and register a new session for it.
    pub fn store_image(&self, bytes: &[u8]) -> LarmResult<Arc<Session>> {
        let source = SourceImage::decode(bytes)?;
        self.insert(source)
    }

    /// Register a new session for an already decoded image.
    pub fn insert(&self, source: SourceImage) -> LarmResult<Arc<Session>> {
        let session = Arc::new(Session::new(SessionId::new(), source, self.opts)?);
        let (w, h) = session.source.dimensions();
        tracing::info!(
            session = %session.id,
            width = w,
            height = h,
            proxy_width = session.proxy.width(),
            proxy_height = session.proxy.height(),
            "session created"
        );
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    /// Look up a session.
    pub fn get(&self, id: &SessionId) -> LarmResult<Arc<Session>> {
        match self.sessions.get(id) {
            Some(entry) => Ok(entry.value().clone()),
            None => {
                tracing::debug!(session = %id, "unknown session");
                Err(LarmError::session_not_found(id.to_string()))
            }
        }
    }

    /// Remove a session. Returns whether it existed.
    pub fn remove(&self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "session removed");
        }
        removed
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
