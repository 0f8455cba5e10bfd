//! HTTP boundary: routes requests into the preview service and the
//! resolution resolver, and streams bytes back.
//!
//! Handlers stay small; everything stateful lives in [`AppState`]. Decode
//! work runs on blocking worker threads so a burst of scrub requests never
//! stalls the async executor.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path as AxumPath, Query, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::{fs::File, task};
use tokio_util::io::ReaderStream;
use tower::util::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::{PreviewError, ResolveError};
use crate::library::{Library, is_safe_segment};
use crate::pool::{HandlePool, VideoKey};
use crate::preview::FramePreviewService;
use crate::resolve::{ORIGINAL_QUALITY, ResolutionResolver};
use crate::subtitles::srt_to_vtt;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<Library>,
    pub previews: Arc<FramePreviewService>,
    pub resolver: Arc<ResolutionResolver>,
    pub pool: Arc<HandlePool>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PreviewError> for ApiError {
    fn from(err: PreviewError) -> Self {
        if err.is_not_found() {
            ApiError::not_found(err.to_string())
        } else {
            log::error!(target: "anisub::http", "preview failed: {err}");
            ApiError::internal(err.to_string())
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        ApiError::not_found(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/shows", get(list_shows))
        .route("/api/shows/{folder}", get(show_detail))
        .route("/preview/{folder}/{video}", get(preview_frame))
        .route("/stream/{folder}/{video}", get(stream_episode))
        .route("/poster/{folder}/{file}", get(poster))
        .route("/sub/{folder}/{file}", get(subtitle))
        .with_state(state)
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ShowSummary {
    pub name: String,
    /// Route to the poster sidecar, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShowDetail {
    pub name: String,
    pub episodes: Vec<String>,
    /// Quality tags with a variant subdirectory, ladder order.
    pub qualities: Vec<&'static str>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PreviewQuery {
    /// Seconds into the episode. Absent or unparsable means 0.
    pub t: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct StreamQuery {
    pub res: Option<String>,
}

async fn list_shows(State(state): State<AppState>) -> ApiResult<Json<Vec<ShowSummary>>> {
    let shows = state
        .library
        .list_shows()
        .map_err(|e| ApiError::internal(format!("listing library: {e}")))?;
    let summaries = shows
        .into_iter()
        .map(|name| {
            let poster = state
                .library
                .find_poster(&name)
                .map(|file| format!("/poster/{name}/{file}"));
            ShowSummary { name, poster }
        })
        .collect();
    Ok(Json(summaries))
}

async fn show_detail(
    State(state): State<AppState>,
    AxumPath(folder): AxumPath<String>,
) -> ApiResult<Json<ShowDetail>> {
    let episodes = state
        .library
        .list_episodes(&folder)
        .map_err(|_| ApiError::not_found("show not found"))?;
    let qualities = state.resolver.available_qualities(&folder);
    Ok(Json(ShowDetail {
        name: folder,
        episodes,
        qualities,
    }))
}

async fn preview_frame(
    State(state): State<AppState>,
    AxumPath((folder, video)): AxumPath<(String, String)>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<Response> {
    let dir = state
        .library
        .show_dir(&folder)
        .ok_or_else(|| ApiError::not_found("show not found"))?;
    if !is_safe_segment(&video) {
        return Err(ApiError::not_found("episode not found"));
    }
    let timestamp = query
        .t
        .as_deref()
        .and_then(|raw| raw.parse::<f64>().ok())
        .unwrap_or(0.0);

    let key = VideoKey::new(dir.join(&video));
    let previews = Arc::clone(&state.previews);
    let jpeg = task::spawn_blocking(move || previews.get_preview(&key, timestamp))
        .await
        .map_err(|err| ApiError::internal(format!("task join error: {err}")))??;

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response())
}

async fn stream_episode(
    State(state): State<AppState>,
    AxumPath((folder, video)): AxumPath<(String, String)>,
    Query(query): Query<StreamQuery>,
    request: Request,
) -> ApiResult<Response> {
    let requested = query.res.as_deref().unwrap_or(ORIGINAL_QUALITY);
    if !is_safe_segment(&folder) || !is_safe_segment(&video) || !is_safe_segment(requested) {
        return Err(ApiError::not_found("episode not found"));
    }
    let path = state.resolver.resolve(&folder, &video, requested)?;

    // ServeFile answers Range requests itself.
    ServeFile::new(path)
        .oneshot(request)
        .await
        .map(IntoResponse::into_response)
        .map_err(|err| ApiError::internal(format!("streaming file: {err}")))
}

async fn poster(
    State(state): State<AppState>,
    AxumPath((folder, file)): AxumPath<(String, String)>,
) -> ApiResult<Response> {
    let dir = state
        .library
        .show_dir(&folder)
        .ok_or_else(|| ApiError::not_found("show not found"))?;
    if !is_safe_segment(&file) {
        return Err(ApiError::not_found("poster not found"));
    }
    stream_small_file(dir.join(&file)).await
}

async fn subtitle(
    State(state): State<AppState>,
    AxumPath((folder, file)): AxumPath<(String, String)>,
) -> ApiResult<Response> {
    let dir = state
        .library
        .show_dir(&folder)
        .ok_or_else(|| ApiError::not_found("show not found"))?;
    if !is_safe_segment(&file) {
        return Err(ApiError::not_found("subtitles not found"));
    }
    let bytes = tokio::fs::read(dir.join(&file))
        .await
        .map_err(|_| ApiError::not_found("subtitles not found"))?;
    // Sidecars in the wild carry odd encodings; decode lossily.
    let vtt = srt_to_vtt(&String::from_utf8_lossy(&bytes));
    Ok(([(header::CONTENT_TYPE, "text/vtt")], vtt).into_response())
}

/// Streams a small static file (posters) with a sniffed content type.
async fn stream_small_file(path: PathBuf) -> ApiResult<Response> {
    let file = File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("file not found"))?;
    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let body = Body::from_stream(ReaderStream::new(file));
    let mut response = body.into_response();
    if let Ok(value) = mime.to_string().parse() {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    Ok(response)
}
