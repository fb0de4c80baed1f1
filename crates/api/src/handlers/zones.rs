//! Handlers for the `/zones` resource: occupancy thresholds visible to every
//! signed-in user.

use axum::extract::State;
use axum::Json;
use crowdcount_core::error::CoreError;
use crowdcount_core::types::ZoneThresholds;
use crowdcount_db::models::zone::ZoneThreshold;
use crowdcount_db::repositories::ZoneThresholdRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /zones/thresholds`.
#[derive(Debug, Deserialize)]
pub struct SetThresholdRequest {
    #[serde(default)]
    pub zone_name: String,
    pub threshold: i32,
}

/// GET /api/v1/zones/thresholds
pub async fn get_thresholds(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> AppResult<Json<DataResponse<ZoneThresholds>>> {
    let thresholds = ZoneThresholdRepo::as_map(&state.pool).await?;
    Ok(Json(DataResponse { data: thresholds }))
}

/// POST /api/v1/zones/thresholds
///
/// Set the threshold of a single zone. The zone need not be stored; the
/// threshold applies to any request zone carrying that name.
pub async fn set_threshold(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<SetThresholdRequest>,
) -> AppResult<Json<DataResponse<ZoneThreshold>>> {
    let zone_name = input.zone_name.trim();
    validate_threshold(zone_name, input.threshold)?;

    let row = ZoneThresholdRepo::upsert(&state.pool, zone_name, input.threshold).await?;
    tracing::info!(
        user_id = auth_user.user_id,
        zone = %row.zone_name,
        threshold = row.threshold,
        "Zone threshold set"
    );
    Ok(Json(DataResponse { data: row }))
}

/// Reject blank zone names and negative thresholds.
pub fn validate_threshold(zone_name: &str, threshold: i32) -> Result<(), AppError> {
    if zone_name.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Zone name is required".into(),
        )));
    }
    if threshold < 0 {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Threshold for zone '{zone_name}' must not be negative"
        ))));
    }
    Ok(())
}
