//! HTTP surface of the server shape.
//!
//! Each request resolves its session, then does its heavy work (decode, render, encode) on the
//! blocking pool with freshly allocated buffers. Sessions are never mutated after upload.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

use crate::encode::image_bytes::DEFAULT_JPEG_QUALITY;
use crate::engine::bridge::GrainEngine;
use crate::foundation::error::{LarmError, LarmResult};
use crate::session::store::SessionStore;
use crate::workspace::tier::{DEFAULT_LOUPE_SIZE, TierOpts};

pub mod error;
pub mod handlers;

/// Default upload body limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Server configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerOpts {
    /// Proxy geometry of uploaded sessions.
    pub tiers: TierOpts,
    /// Edge length of loupe previews.
    pub crop_size: u32,
    /// JPEG quality of proxy and preview responses.
    pub jpeg_quality: u8,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
}

impl Default for ServerOpts {
    fn default() -> Self {
        Self {
            tiers: TierOpts::default(),
            crop_size: DEFAULT_LOUPE_SIZE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerOpts {
    /// Reject unusable settings.
    pub fn validate(&self) -> LarmResult<()> {
        self.tiers.validate()?;
        if self.crop_size == 0 {
            return Err(LarmError::validation("crop_size must be > 0"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(LarmError::validation("jpeg_quality must be in 1..=100"));
        }
        if self.max_upload_bytes == 0 {
            return Err(LarmError::validation("max_upload_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    store: Arc<SessionStore>,
    engine: Arc<dyn GrainEngine>,
    opts: ServerOpts,
}

impl AppState {
    /// State with an empty session store.
    pub fn new(engine: Arc<dyn GrainEngine>, opts: ServerOpts) -> LarmResult<Self> {
        opts.validate()?;
        Ok(Self {
            store: Arc::new(SessionStore::new(opts.tiers)),
            engine,
            opts,
        })
    }

    /// Session store.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Server configuration.
    pub fn opts(&self) -> ServerOpts {
        self.opts
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.opts.max_upload_bytes;
    Router::new()
        .route("/upload", post(handlers::upload))
        .route("/proxy/:id", get(handlers::proxy))
        .route("/preview/:id", post(handlers::preview))
        .route("/export/:id", post(handlers::export))
        .route("/session/:id", delete(handlers::remove_session))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> LarmResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
