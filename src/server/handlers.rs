use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::encode::image_bytes::{EXPORT_FILE_NAME, to_jpeg_bytes, to_png_bytes};
use crate::engine::params::EffectParameters;
use crate::foundation::core::{FocusPoint, ViewMode};
use crate::render::request::RenderRequest;
use crate::server::AppState;
use crate::server::error::ApiError;
use crate::session::store::{Session, SessionId};

/// Body of a successful upload.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Id to address the new session with.
    pub session_id: String,
    /// Original width.
    pub width: u32,
    /// Original height.
    pub height: u32,
    /// Proxy width.
    pub proxy_width: u32,
    /// Proxy height.
    pub proxy_height: u32,
}

/// `?mode=proxy|loupe&x=&y=`
#[derive(Clone, Copy, Debug, Default, serde::Deserialize)]
pub struct PreviewQuery {
    /// Preview tier.
    #[serde(default)]
    pub mode: ViewMode,
    /// Normalized horizontal focus (loupe only).
    pub x: Option<f64>,
    /// Normalized vertical focus (loupe only).
    pub y: Option<f64>,
}

impl PreviewQuery {
    fn focus(&self) -> FocusPoint {
        FocusPoint::new(self.x.unwrap_or(0.5), self.y.unwrap_or(0.5))
    }
}

fn lookup(state: &AppState, raw: &str) -> Result<Arc<Session>, ApiError> {
    let id: SessionId = raw.parse()?;
    Ok(state.store.get(&id)?)
}

/// Empty bodies mean defaults; otherwise JSON with per-field defaults, range checked.
fn parse_params(body: &[u8]) -> Result<EffectParameters, ApiError> {
    let params = if body.iter().all(u8::is_ascii_whitespace) {
        EffectParameters::default()
    } else {
        serde_json::from_slice(body)
            .map_err(|e| ApiError::bad_request(format!("invalid parameters: {e}")))?
    };
    params.validate()?;
    Ok(params)
}

fn jpeg(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response()
}

/// `POST /upload`
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.file_name().is_some() {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?;
            file = Some(bytes);
            break;
        }
    }
    let bytes = file.ok_or_else(|| ApiError::bad_request("No image file provided"))?;

    let store = state.store.clone();
    let session = tokio::task::spawn_blocking(move || store.store_image(&bytes))
        .await?
        .map_err(ApiError::upload)?;

    let (width, height) = session.source().dimensions();
    Ok(Json(UploadResponse {
        session_id: session.id().to_string(),
        width,
        height,
        proxy_width: session.proxy().width(),
        proxy_height: session.proxy().height(),
    }))
}

/// `GET /proxy/:id`
pub async fn proxy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let session = lookup(&state, &id)?;
    let quality = state.opts.jpeg_quality;
    let bytes = tokio::task::spawn_blocking(move || {
        let img = session.proxy_image()?;
        to_jpeg_bytes(&img, quality)
    })
    .await??;
    Ok(jpeg(bytes))
}

/// `POST /preview/:id`
pub async fn preview(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PreviewQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let session = lookup(&state, &id)?;
    let params = parse_params(&body)?;
    let mut request = RenderRequest::new(params, query.mode);
    if query.mode == ViewMode::Loupe {
        request = request.with_focus(query.focus());
    }

    let engine = state.engine.clone();
    let opts = state.opts;
    let bytes = tokio::task::spawn_blocking(move || {
        let img = session.preview(engine.as_ref(), &request, opts.crop_size)?;
        to_jpeg_bytes(&img, opts.jpeg_quality)
    })
    .await??;
    Ok(jpeg(bytes))
}

/// `POST /export/:id`
pub async fn export(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let session = lookup(&state, &id)?;
    let params = parse_params(&body)?;

    let engine = state.engine.clone();
    let bytes = tokio::task::spawn_blocking(move || {
        let img = session.export(engine.as_ref(), &params)?;
        to_png_bytes(&img)
    })
    .await??;

    let disposition = format!("attachment; filename=\"{EXPORT_FILE_NAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// `DELETE /session/:id`
pub async fn remove_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> &'static str {
    if let Ok(id) = id.parse::<SessionId>() {
        state.store.remove(&id);
    }
    "Session removed"
}

/// `GET /health`
pub async fn health() -> &'static str {
    "OK"
}
