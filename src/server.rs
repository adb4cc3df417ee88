//! HTTP API server: axum router and request handlers.
//!
//! Every control of the animation editor is one endpoint. Handlers lock the
//! shared [`Editor`], apply the command and answer with the new
//! [`EditorStatus`]. Image decoding, scaling and PNG encoding run on the
//! blocking pool against a snapshot, never while the lock is held. Play/pause go through the playback thread instead, which
//! owns the frame timer (see [`crate::playback::playback_loop`]).
//!
//! ## Rust concepts
//! - axum extractors: `State`, `Json`, `Bytes`
//! - `Arc<Mutex<T>>` for the session shared with the playback thread
//! - `std::sync::mpsc::Sender` to talk to a plain `std::thread`
//! - `tower-http` middleware for CORS and request tracing

use crate::addressing::GridPos;
use crate::convert::{self, ConvertError, Nudge, Viewport};
use crate::editor::{Editor, EditorStatus};
use crate::frame::LedCell;
use crate::playback::PlaybackCommand;
use crate::{Color, preview};
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Pixel size of one LED in frame previews.
const PREVIEW_CELL_PX: u32 = 40;

type ApiError = (StatusCode, String);

// ── App State ────────────────────────────────────────────────────────

/// Shared application state, passed to every handler via axum's `State` extractor.
///
/// Rust concept: CLONE for Arc
/// axum clones the state for each request, so everything inside must be
/// cheap to clone. Cloning the `Arc` only bumps a counter; every clone
/// points at the same editing session.
#[derive(Clone)]
pub struct AppState {
    /// The editing session (playback thread advances frames in it too)
    pub editor: Arc<Mutex<Editor>>,
    /// Channel to send play/pause commands to the playback thread
    pub playback_tx: Sender<PlaybackCommand>,
}

impl AppState {
    fn editor(&self) -> Result<MutexGuard<'_, Editor>, ApiError> {
        self.editor.lock().map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Editor state poisoned".to_string(),
            )
        })
    }

    fn send_playback(&self, cmd: PlaybackCommand) -> Result<StatusCode, ApiError> {
        self.playback_tx.send(cmd).map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Playback thread gone".to_string(),
            )
        })?;
        Ok(StatusCode::OK)
    }
}

// ── OpenAPI Documentation ────────────────────────────────────────────

#[derive(OpenApi)]
#[openapi(
    paths(
        get_status,
        get_current_frame,
        post_frame_add,
        post_frame_select,
        post_frame_clone,
        post_frame_clear,
        post_frame_delete,
        post_frame_delete_all,
        post_frame_wait,
        post_frame_led,
        post_color,
        post_palette_add,
        post_palette_remove,
        post_letter,
        post_playback_play,
        post_playback_pause,
        post_playback_toggle,
        get_export,
        post_image_nudge,
        post_image_decode,
    ),
    components(schemas(
        EditorStatus,
        FrameDetail,
        LedCell,
        Viewport,
        Nudge,
        SelectRequest,
        WaitRequest,
        LedRequest,
        ColorRequest,
        LetterRequest,
        NudgeRequest,
    )),
    tags(
        (name = "frames", description = "Frame editing endpoints"),
        (name = "colors", description = "Active color and palette"),
        (name = "playback", description = "Animation preview playback"),
        (name = "image", description = "Image-to-frame converter"),
        (name = "export", description = "Arduino export"),
        (name = "system", description = "Session status"),
    ),
    info(
        title = "LED Matrix Animator API",
        version = env!("CARGO_PKG_VERSION"),
        description = "HTTP API for designing 8x8 LED matrix animations"
    )
)]
pub struct ApiDoc;

// ── Request/Response types ───────────────────────────────────────────

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SelectRequest {
    /// Zero-based frame index
    #[schema(example = 0)]
    index: usize,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct WaitRequest {
    /// Time the frame stays on screen, in milliseconds. Negative values are ignored.
    #[schema(example = 100)]
    wait_ms: i64,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LedRequest {
    /// Column, 0 (left) to 7
    #[schema(example = 0, minimum = 0, maximum = 7)]
    col: usize,
    /// Row, 0 (top) to 7
    #[schema(example = 0, minimum = 0, maximum = 7)]
    row: usize,
}

impl LedRequest {
    fn position(&self) -> Result<GridPos, ApiError> {
        GridPos::new(self.col, self.row).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("LED ({}, {}) is outside the 8x8 grid", self.col, self.row),
            )
        })
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ColorRequest {
    /// Hex color, `#rrggbb` or `#rgb`
    #[schema(value_type = String, example = "#ff00ae")]
    color: Color,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LetterRequest {
    /// Text typed by the user; only its first character is used
    #[schema(example = "a")]
    letter: String,
}

impl LetterRequest {
    fn first_char(&self) -> Result<char, ApiError> {
        self.letter
            .chars()
            .next()
            .ok_or_else(|| (StatusCode::BAD_REQUEST, "Empty letter".to_string()))
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct NudgeRequest {
    /// Which converter button was pressed
    nudge: Nudge,
}

/// The selected frame, cell by cell.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FrameDetail {
    /// Frame index
    index: usize,
    /// Wait in milliseconds
    wait_ms: u32,
    /// Cells indexed `[row][col]`
    rows: Vec<Vec<LedCell>>,
}

fn convert_error(e: ConvertError) -> ApiError {
    let status = match e {
        ConvertError::Decode(_) | ConvertError::EmptyImage => StatusCode::UNPROCESSABLE_ENTITY,
        ConvertError::NoImageLoaded => StatusCode::CONFLICT,
    };
    (status, e.to_string())
}

fn internal_error(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Run CPU-heavy image work on tokio's blocking pool, off the editor lock.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(internal_error)
}

/// Encode `img` on the blocking pool and answer with it as a PNG.
async fn png_response(img: image::RgbaImage) -> Result<impl IntoResponse, ApiError> {
    let bytes = run_blocking(move || preview::encode_png(&img))
        .await?
        .map_err(internal_error)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

// ── Router ───────────────────────────────────────────────────────────

/// Build the axum router with all API endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(
            SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", ApiDoc::openapi())
                .config(utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"]).validator_url("none")),
        )
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/frames", post(post_frame_add))
        .route("/api/v1/frames/current", get(get_current_frame))
        .route("/api/v1/frames/current/preview.png", get(get_current_frame_png))
        .route("/api/v1/frames/select", post(post_frame_select))
        .route("/api/v1/frames/clone", post(post_frame_clone))
        .route("/api/v1/frames/clear", post(post_frame_clear))
        .route("/api/v1/frames/delete", post(post_frame_delete))
        .route("/api/v1/frames/delete-all", post(post_frame_delete_all))
        .route("/api/v1/frames/wait", post(post_frame_wait))
        .route("/api/v1/frames/led", post(post_frame_led))
        .route("/api/v1/color", post(post_color))
        .route("/api/v1/palette/add", post(post_palette_add))
        .route("/api/v1/palette/remove", post(post_palette_remove))
        .route("/api/v1/letter", post(post_letter))
        .route("/api/v1/playback/play", post(post_playback_play))
        .route("/api/v1/playback/pause", post(post_playback_pause))
        .route("/api/v1/playback/toggle", post(post_playback_toggle))
        .route("/api/v1/export", get(get_export))
        .route("/api/v1/image", post(post_image))
        .route("/api/v1/image/nudge", post(post_image_nudge))
        .route("/api/v1/image/preview.png", get(get_image_png))
        .route("/api/v1/image/decode", post(post_image_decode))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Handlers: status ─────────────────────────────────────────────────

/// GET /api/v1/status — return the current session state
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "system",
    responses(
        (status = 200, description = "Current session status", body = EditorStatus)
    )
)]
async fn get_status(State(state): State<AppState>) -> Result<Json<EditorStatus>, ApiError> {
    Ok(Json(state.editor()?.status()))
}

// ── Handlers: frames ─────────────────────────────────────────────────

/// GET /api/v1/frames/current — cells of the selected frame
#[utoipa::path(
    get,
    path = "/api/v1/frames/current",
    tag = "frames",
    responses(
        (status = 200, description = "Selected frame", body = FrameDetail)
    )
)]
async fn get_current_frame(State(state): State<AppState>) -> Result<Json<FrameDetail>, ApiError> {
    let editor = state.editor()?;
    let animation = editor.animation();
    let frame = animation.current_frame();
    Ok(Json(FrameDetail {
        index: animation.current(),
        wait_ms: frame.wait_ms,
        rows: frame.grid.rows().iter().map(|row| row.to_vec()).collect(),
    }))
}

/// GET /api/v1/frames/current/preview.png — the selected frame as a PNG
async fn get_current_frame_png(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let grid = state.editor()?.animation().current_frame().grid.clone();
    let img = run_blocking(move || preview::render_grid(&grid, PREVIEW_CELL_PX)).await?;
    png_response(img).await
}

/// POST /api/v1/frames — append a blank frame and select it
#[utoipa::path(
    post,
    path = "/api/v1/frames",
    tag = "frames",
    responses(
        (status = 200, description = "Frame added", body = EditorStatus)
    )
)]
async fn post_frame_add(State(state): State<AppState>) -> Result<Json<EditorStatus>, ApiError> {
    let mut editor = state.editor()?;
    editor.add_frame();
    Ok(Json(editor.status()))
}

/// POST /api/v1/frames/select — select a frame for editing
#[utoipa::path(
    post,
    path = "/api/v1/frames/select",
    tag = "frames",
    request_body = SelectRequest,
    responses(
        (status = 200, description = "Frame selected", body = EditorStatus),
        (status = 404, description = "No such frame")
    )
)]
async fn post_frame_select(
    State(state): State<AppState>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<EditorStatus>, ApiError> {
    let mut editor = state.editor()?;
    if !editor.select_frame(req.index) {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Frame {} does not exist", req.index),
        ));
    }
    Ok(Json(editor.status()))
}

/// POST /api/v1/frames/clone — duplicate the selected frame at the end
#[utoipa::path(
    post,
    path = "/api/v1/frames/clone",
    tag = "frames",
    responses(
        (status = 200, description = "Frame cloned", body = EditorStatus)
    )
)]
async fn post_frame_clone(State(state): State<AppState>) -> Result<Json<EditorStatus>, ApiError> {
    let mut editor = state.editor()?;
    editor.clone_frame();
    Ok(Json(editor.status()))
}

/// POST /api/v1/frames/clear — turn every LED of the selected frame off
#[utoipa::path(
    post,
    path = "/api/v1/frames/clear",
    tag = "frames",
    responses(
        (status = 200, description = "Frame cleared", body = EditorStatus)
    )
)]
async fn post_frame_clear(State(state): State<AppState>) -> Result<Json<EditorStatus>, ApiError> {
    let mut editor = state.editor()?;
    editor.clear_frame();
    Ok(Json(editor.status()))
}

/// POST /api/v1/frames/delete — delete the selected frame (never the last one)
#[utoipa::path(
    post,
    path = "/api/v1/frames/delete",
    tag = "frames",
    responses(
        (status = 200, description = "Frame deleted, or left alone if it was the only one", body = EditorStatus)
    )
)]
async fn post_frame_delete(State(state): State<AppState>) -> Result<Json<EditorStatus>, ApiError> {
    let mut editor = state.editor()?;
    editor.delete_frame();
    Ok(Json(editor.status()))
}

/// POST /api/v1/frames/delete-all — start over with one blank frame
#[utoipa::path(
    post,
    path = "/api/v1/frames/delete-all",
    tag = "frames",
    responses(
        (status = 200, description = "Animation reset", body = EditorStatus)
    )
)]
async fn post_frame_delete_all(
    State(state): State<AppState>,
) -> Result<Json<EditorStatus>, ApiError> {
    let mut editor = state.editor()?;
    editor.delete_all();
    Ok(Json(editor.status()))
}

/// POST /api/v1/frames/wait — set how long the selected frame is shown
#[utoipa::path(
    post,
    path = "/api/v1/frames/wait",
    tag = "frames",
    request_body = WaitRequest,
    responses(
        (status = 200, description = "Wait updated (negative values are ignored)", body = EditorStatus)
    )
)]
async fn post_frame_wait(
    State(state): State<AppState>,
    Json(req): Json<WaitRequest>,
) -> Result<Json<EditorStatus>, ApiError> {
    let mut editor = state.editor()?;
    editor.set_wait(req.wait_ms);
    Ok(Json(editor.status()))
}

/// POST /api/v1/frames/led — toggle one LED of the selected frame
#[utoipa::path(
    post,
    path = "/api/v1/frames/led",
    tag = "frames",
    request_body = LedRequest,
    responses(
        (status = 200, description = "LED toggled", body = EditorStatus),
        (status = 400, description = "Coordinates outside the grid")
    )
)]
async fn post_frame_led(
    State(state): State<AppState>,
    Json(req): Json<LedRequest>,
) -> Result<Json<EditorStatus>, ApiError> {
    let pos = req.position()?;
    let mut editor = state.editor()?;
    editor.toggle_led(pos);
    Ok(Json(editor.status()))
}

// ── Handlers: colors ─────────────────────────────────────────────────

/// POST /api/v1/color — set the active color
#[utoipa::path(
    post,
    path = "/api/v1/color",
    tag = "colors",
    request_body = ColorRequest,
    responses(
        (status = 200, description = "Active color set", body = EditorStatus),
        (status = 422, description = "Not a hex color")
    )
)]
async fn post_color(
    State(state): State<AppState>,
    Json(req): Json<ColorRequest>,
) -> Result<Json<EditorStatus>, ApiError> {
    let mut editor = state.editor()?;
    editor.set_active_color(req.color);
    Ok(Json(editor.status()))
}

/// POST /api/v1/palette/add — save the active color to the palette
#[utoipa::path(
    post,
    path = "/api/v1/palette/add",
    tag = "colors",
    responses(
        (status = 200, description = "Color saved", body = EditorStatus)
    )
)]
async fn post_palette_add(State(state): State<AppState>) -> Result<Json<EditorStatus>, ApiError> {
    let mut editor = state.editor()?;
    editor.save_active_color();
    Ok(Json(editor.status()))
}

/// POST /api/v1/palette/remove — drop the active color from the palette
#[utoipa::path(
    post,
    path = "/api/v1/palette/remove",
    tag = "colors",
    responses(
        (status = 200, description = "Color removed", body = EditorStatus)
    )
)]
async fn post_palette_remove(
    State(state): State<AppState>,
) -> Result<Json<EditorStatus>, ApiError> {
    let mut editor = state.editor()?;
    editor.remove_active_color();
    Ok(Json(editor.status()))
}

/// POST /api/v1/letter — append a frame showing a letter
#[utoipa::path(
    post,
    path = "/api/v1/letter",
    tag = "frames",
    request_body = LetterRequest,
    responses(
        (status = 200, description = "Letter frame added, or nothing if the font lacks it", body = EditorStatus),
        (status = 400, description = "Empty letter")
    )
)]
async fn post_letter(
    State(state): State<AppState>,
    Json(req): Json<LetterRequest>,
) -> Result<Json<EditorStatus>, ApiError> {
    let letter = req.first_char()?;
    let mut editor = state.editor()?;
    editor.add_letter(letter);
    Ok(Json(editor.status()))
}

// ── Handlers: playback ───────────────────────────────────────────────

/// POST /api/v1/playback/play — start playing from the selected frame
#[utoipa::path(
    post,
    path = "/api/v1/playback/play",
    tag = "playback",
    responses(
        (status = 200, description = "Playback started"),
    )
)]
async fn post_playback_play(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.send_playback(PlaybackCommand::Play)
}

/// POST /api/v1/playback/pause — stop on the frame currently showing
#[utoipa::path(
    post,
    path = "/api/v1/playback/pause",
    tag = "playback",
    responses(
        (status = 200, description = "Playback paused"),
    )
)]
async fn post_playback_pause(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.send_playback(PlaybackCommand::Pause)
}

/// POST /api/v1/playback/toggle — the Play/Pause button
#[utoipa::path(
    post,
    path = "/api/v1/playback/toggle",
    tag = "playback",
    responses(
        (status = 200, description = "Playback toggled"),
    )
)]
async fn post_playback_toggle(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.send_playback(PlaybackCommand::Toggle)
}

// ── Handlers: export ─────────────────────────────────────────────────

/// GET /api/v1/export — the animation as Arduino source
#[utoipa::path(
    get,
    path = "/api/v1/export",
    tag = "export",
    responses(
        (status = 200, description = "C array declaration", body = String, content_type = "text/plain")
    )
)]
async fn get_export(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let text = state.editor()?.export();
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

// ── Handlers: image converter ────────────────────────────────────────

/// POST /api/v1/image — upload an image to convert
///
/// Expects the raw file bytes as the request body (PNG, JPEG, GIF or BMP).
async fn post_image(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Viewport>, ApiError> {
    let img = run_blocking(move || convert::decode_upload(&body))
        .await?
        .map_err(|e| {
            tracing::warn!("Rejected image upload: {}", e);
            convert_error(e)
        })?;
    let viewport = state.editor()?.set_image(img);
    Ok(Json(viewport))
}

/// POST /api/v1/image/nudge — move or resize the image under the sample window
#[utoipa::path(
    post,
    path = "/api/v1/image/nudge",
    tag = "image",
    request_body = NudgeRequest,
    responses(
        (status = 200, description = "New viewport", body = Viewport),
        (status = 409, description = "No image loaded")
    )
)]
async fn post_image_nudge(
    State(state): State<AppState>,
    Json(req): Json<NudgeRequest>,
) -> Result<Json<Viewport>, ApiError> {
    let mut editor = state.editor()?;
    let viewport = editor.nudge_image(req.nudge).map_err(convert_error)?;
    Ok(Json(viewport))
}

/// GET /api/v1/image/preview.png — the converter canvas with the sample window
async fn get_image_png(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let converter = state.editor()?.converter().clone();
    let img = run_blocking(move || converter.render_preview())
        .await?
        .map_err(convert_error)?;
    png_response(img).await
}

/// POST /api/v1/image/decode — sample the image into the selected frame
#[utoipa::path(
    post,
    path = "/api/v1/image/decode",
    tag = "image",
    responses(
        (status = 200, description = "Selected frame replaced", body = EditorStatus),
        (status = 409, description = "No image loaded")
    )
)]
async fn post_image_decode(
    State(state): State<AppState>,
) -> Result<Json<EditorStatus>, ApiError> {
    let converter = state.editor()?.converter().clone();
    let grid = run_blocking(move || converter.decode())
        .await?
        .map_err(convert_error)?;

    let mut editor = state.editor()?;
    let index = editor.apply_decoded(grid);
    tracing::info!("Decoded image into frame {}", index);
    Ok(Json(editor.status()))
}
