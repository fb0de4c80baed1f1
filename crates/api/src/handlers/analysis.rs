//! Handlers for the `/analysis` resource: client-supplied images and frames.

use axum::extract::State;
use axum::Json;
use crowdcount_core::error::CoreError;
use crowdcount_core::frame::decode_frame;
use crowdcount_core::geometry::Point;
use crowdcount_core::heatmap::HeatmapAccumulator;
use crowdcount_core::session::{analyze_still, FrameOptions, IdentitySource, SessionKind};
use crowdcount_core::types::FrameNumber;
use crowdcount_core::zones::ZoneMap;
use serde::Deserialize;

use crate::analysis::{detect, load_thresholds, FrameResponse};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /analysis/image`.
#[derive(Debug, Deserialize)]
pub struct AnalyzeImageRequest {
    /// Base64 image, optionally as a data URL.
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub zones: Option<ZoneMap>,
    #[serde(default)]
    pub enable_heatmap: bool,
}

/// Request body for `POST /analysis/frame`.
#[derive(Debug, Deserialize)]
pub struct AnalyzeFrameRequest {
    #[serde(default)]
    pub frame: String,
    #[serde(default)]
    pub frame_number: FrameNumber,
    #[serde(flatten)]
    pub options: FrameOptions,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/analysis/image
///
/// One-shot analysis of a still image. No session state is touched; the
/// heatmap, when requested, is built from this image alone.
pub async fn analyze_image(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<AnalyzeImageRequest>,
) -> AppResult<Json<DataResponse<FrameResponse>>> {
    if input.image.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "No image provided".into(),
        )));
    }

    let frame = decode_frame(&input.image)?;
    let thresholds = load_thresholds(&state).await?;
    let raw = detect(&state, &frame).await?;

    let mut analysis = analyze_still(&raw, input.zones.as_ref(), &thresholds);

    if input.enable_heatmap && !raw.is_empty() {
        let centers: Vec<Point> = raw.iter().map(|d| d.bbox.center()).collect();
        let mut heatmap = HeatmapAccumulator::new();
        heatmap.accumulate(frame.width(), frame.height(), &centers);
        analysis.heatmap_overlay = heatmap.render(&frame);
    }

    tracing::debug!(
        user_id = auth_user.user_id,
        people = analysis.people_count,
        alerts = analysis.alerts.len(),
        "Image analysed"
    );

    Ok(Json(DataResponse {
        data: FrameResponse::new(analysis, None)?,
    }))
}

/// POST /api/v1/analysis/frame
///
/// Analyse a frame extracted by the client. Detections are numbered by
/// position and crossings accumulate in the caller's video session.
pub async fn analyze_frame(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<AnalyzeFrameRequest>,
) -> AppResult<Json<DataResponse<FrameResponse>>> {
    if input.frame.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "No frame provided".into(),
        )));
    }

    let frame = decode_frame(&input.frame)?;
    let thresholds = load_thresholds(&state).await?;

    let session = state
        .sessions
        .get_or_create(auth_user.user_id, SessionKind::Video)
        .await;
    let analysis = {
        let mut session = session.lock().await;
        let raw = detect(&state, &frame).await?;
        session.analyze(
            &frame,
            &raw,
            IdentitySource::Positional {
                frame_number: input.frame_number,
            },
            &input.options,
            &thresholds,
        )
    };

    Ok(Json(DataResponse {
        data: FrameResponse::new(analysis, Some(input.frame_number))?,
    }))
}
