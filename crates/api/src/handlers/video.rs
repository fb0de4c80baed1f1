//! Handlers for the `/video` resource: uploaded files analysed frame by frame.

use std::path::PathBuf;

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use crowdcount_core::capture::{read_frame, VideoInfo};
use crowdcount_core::error::CoreError;
use crowdcount_core::frame::decode_base64_payload;
use crowdcount_core::session::{FrameOptions, IdentitySource, SessionKind};
use crowdcount_core::types::FrameNumber;
use serde::Deserialize;

use crate::analysis::{detect, load_thresholds, FrameResponse, Overlay};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, MessageResponse};
use crate::session_store::close_source;
use crate::state::AppState;

/// Extension used when the upload carries no usable file name.
const DEFAULT_VIDEO_EXTENSION: &str = "mp4";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// JSON alternative to a multipart upload.
#[derive(Debug, Deserialize)]
pub struct LoadVideoRequest {
    /// Base64 video, optionally as a data URL.
    #[serde(default)]
    pub video_data: String,
}

/// Request body for `POST /video/frame`.
#[derive(Debug, Deserialize)]
pub struct VideoFrameRequest {
    #[serde(default)]
    pub frame_number: FrameNumber,
    #[serde(flatten)]
    pub options: FrameOptions,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/video/load
///
/// Accepts either a multipart form with a `file` field or a JSON body with
/// base64 `video_data`. The file is written to the upload directory and
/// replaces any video this user had loaded.
pub async fn load(
    State(state): State<AppState>,
    auth_user: AuthUser,
    request: Request,
) -> AppResult<Json<DataResponse<VideoInfo>>> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let (extension, data) = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        read_multipart_upload(multipart).await?
    } else {
        let Json(input) = Json::<LoadVideoRequest>::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        if input.video_data.is_empty() {
            return Err(AppError::BadRequest("No video data provided".into()));
        }
        let data = decode_base64_payload(&input.video_data)?;
        (DEFAULT_VIDEO_EXTENSION.to_string(), data)
    };

    if data.is_empty() {
        return Err(AppError::BadRequest("Uploaded video is empty".into()));
    }

    let path = upload_path(&state, &extension);
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store upload: {e}")))?;

    let (source, info) = match state.sources.open_video(&path).await {
        Ok(opened) => opened,
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                tracing::warn!(
                    path = %path.display(),
                    error = %remove_err,
                    "Failed to remove rejected upload"
                );
            }
            return Err(e.into());
        }
    };

    let session = state
        .sessions
        .get_or_create(auth_user.user_id, SessionKind::Video)
        .await;
    let previous = {
        let mut session = session.lock().await;
        let previous = session.reset_video();
        session.attach_source(source);
        previous
    };
    close_source(previous).await;

    tracing::info!(
        user_id = auth_user.user_id,
        bytes = data.len(),
        frame_count = info.frame_count,
        "Video loaded"
    );

    Ok(Json(DataResponse { data: info }))
}

/// POST /api/v1/video/frame
///
/// Seek to `frame_number` in the loaded video and analyse that frame.
/// Detections are numbered by position within the frame.
pub async fn frame(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<VideoFrameRequest>,
) -> AppResult<Json<DataResponse<FrameResponse>>> {
    let thresholds = load_thresholds(&state).await?;
    let timeout = state.config.capture.read_timeout();
    let frame_number = input.frame_number;

    let session = state
        .sessions
        .get_or_create(auth_user.user_id, SessionKind::Video)
        .await;
    let (frame, analysis, line) = {
        let mut session = session.lock().await;
        let frame = read_frame(session.source_mut()?, Some(frame_number), timeout).await?;
        let raw = detect(&state, &frame).await?;
        let analysis = session.analyze(
            &frame,
            &raw,
            IdentitySource::Positional { frame_number },
            &input.options,
            &thresholds,
        );
        let line = session.crossing().line().copied();
        (frame, analysis, line)
    };

    let response = FrameResponse::annotated(
        analysis,
        Some(frame_number),
        &frame,
        Overlay {
            zones: input.options.zones.as_ref(),
            line,
        },
    )?;
    Ok(Json(DataResponse { data: response }))
}

/// POST /api/v1/video/reset
///
/// Release the video, delete the upload and forget the crossing line and
/// crossed set.
pub async fn reset(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    if let Some(session) = state
        .sessions
        .get(auth_user.user_id, SessionKind::Video)
        .await
    {
        let source = session.lock().await.reset_video();
        close_source(source).await;
    }

    tracing::info!(user_id = auth_user.user_id, "Video analysis reset");
    Ok(Json(MessageResponse::new("Analysis reset")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pull the `file` field out of a multipart upload.
async fn read_multipart_upload(mut multipart: Multipart) -> AppResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let extension = field
            .file_name()
            .map(video_extension)
            .unwrap_or_else(|| DEFAULT_VIDEO_EXTENSION.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        return Ok((extension, data.to_vec()));
    }

    Err(AppError::Core(CoreError::Validation(
        "Missing required 'file' field".into(),
    )))
}

/// Lowercased extension of `file_name`, falling back to the default for
/// anything that is not a short alphanumeric suffix.
fn video_extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_VIDEO_EXTENSION.to_string())
}

fn upload_path(state: &AppState, extension: &str) -> PathBuf {
    state
        .config
        .capture
        .upload_dir
        .join(format!("video_{}.{extension}", uuid::Uuid::new_v4()))
}
