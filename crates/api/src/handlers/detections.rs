//! Handlers for the `/detections` resource: saved counting results.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use crowdcount_core::error::CoreError;
use crowdcount_core::types::ZoneCounts;
use crowdcount_db::models::activity::{CreateActivity, ACTIVITY_DETECTION};
use crowdcount_db::models::detection_log::{CreateDetectionLog, DetectionLog};
use crowdcount_db::repositories::{ActivityRepo, DetectionLogRepo};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum number of logs returned by the list endpoint.
const DETECTION_LIST_LIMIT: i64 = 100;

fn default_detection_type() -> String {
    "webcam".to_string()
}

/// Request body for `POST /detections`.
#[derive(Debug, Deserialize)]
pub struct SaveDetectionRequest {
    #[serde(rename = "type", default = "default_detection_type")]
    pub detection_type: String,
    #[serde(default)]
    pub people_count: i32,
    #[serde(default)]
    pub crossed_count: i32,
    #[serde(default)]
    pub zone_counts: ZoneCounts,
}

/// POST /api/v1/detections
///
/// Persist a counting result and record a `detection` activity for the caller.
pub async fn save_detection(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<SaveDetectionRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<DetectionLog>>)> {
    if input.people_count < 0 || input.crossed_count < 0 {
        return Err(AppError::Core(CoreError::Validation(
            "Counts must not be negative".into(),
        )));
    }
    let detection_type = input.detection_type.trim();
    if detection_type.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Detection type must not be empty".into(),
        )));
    }

    let log = DetectionLogRepo::create(
        &state.pool,
        &CreateDetectionLog {
            user_id: auth_user.user_id,
            detection_type: detection_type.to_string(),
            total_count: input.people_count,
            crossed_count: input.crossed_count,
            zone_counts: json!({
                "type": detection_type,
                "crossed": input.crossed_count,
                "zones": input.zone_counts,
            }),
        },
    )
    .await?;

    ActivityRepo::create(
        &state.pool,
        &CreateActivity {
            user_id: auth_user.user_id,
            activity_type: ACTIVITY_DETECTION.to_string(),
            activity_details: Some(format!(
                "Saved {detection_type} detection with {} people",
                input.people_count
            )),
        },
    )
    .await?;

    tracing::info!(
        user_id = auth_user.user_id,
        log_id = log.id,
        people = log.total_count,
        "Detection saved"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: log })))
}

/// GET /api/v1/detections
///
/// The most recent logs. Admins see every user's logs, others only their own.
pub async fn list_detections(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<DetectionLog>>>> {
    let logs = if auth_user.is_admin() {
        DetectionLogRepo::list_recent(&state.pool, DETECTION_LIST_LIMIT).await?
    } else {
        DetectionLogRepo::list_for_user(&state.pool, auth_user.user_id, DETECTION_LIST_LIMIT)
            .await?
    };
    Ok(Json(DataResponse { data: logs }))
}
