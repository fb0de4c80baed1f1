//! Handlers for the `/admin` resource: users, activity, stored zones,
//! thresholds and dashboard totals. Every handler requires the admin role.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveTime, Utc};
use crowdcount_core::error::CoreError;
use crowdcount_core::geometry::Point;
use crowdcount_core::roles::is_valid_role;
use crowdcount_core::types::{DbId, Timestamp, ZoneThresholds};
use crowdcount_db::models::activity::{ActivityCount, ActivityWithUser};
use crowdcount_db::models::user::UserResponse;
use crowdcount_db::models::zone::{Zone, DEFAULT_ZONE_THRESHOLD};
use crowdcount_db::repositories::{
    ActivityRepo, DetectionLogRepo, UserRepo, ZoneRepo, ZoneThresholdRepo,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::zones::validate_threshold;
use crate::middleware::rbac::RequireAdmin;
use crate::response::{DataResponse, MessageResponse};
use crate::state::AppState;

/// Maximum number of activity rows returned to the admin panel.
const ACTIVITY_LIST_LIMIT: i64 = 100;

/// Fewest vertices a zone polygon may have.
const MIN_ZONE_POINTS: usize = 3;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `PUT /admin/users/{id}/role`.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// Request body for `POST /admin/zones`.
#[derive(Debug, Deserialize)]
pub struct CreateZoneRequest {
    #[serde(default)]
    pub zone_name: String,
    #[serde(default)]
    pub zone_points: Vec<Point>,
    #[serde(default = "default_threshold")]
    pub threshold: i32,
}

fn default_threshold() -> i32 {
    DEFAULT_ZONE_THRESHOLD
}

/// Stored zones together with every known threshold.
#[derive(Debug, Serialize)]
pub struct ZonesResponse {
    pub zones: Vec<Zone>,
    pub thresholds: ZoneThresholds,
}

/// Request body for `PUT /admin/settings/thresholds`.
#[derive(Debug, Deserialize)]
pub struct UpdateThresholdsRequest {
    #[serde(default)]
    pub thresholds: ZoneThresholds,
}

/// Dashboard totals.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_users: i64,
    pub total_detections: i64,
    pub today_detections: i64,
    pub total_people: i64,
    pub active_zones: i64,
    /// Today's activity, grouped by type.
    pub activity_summary: Vec<ActivityCount>,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    let users = UserRepo::list(&state.pool).await?;
    Ok(Json(DataResponse {
        data: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// DELETE /api/v1/admin/users/{id}
///
/// Removes the account and closes any capture sessions it holds. Activity
/// and detection rows are kept with their owner cleared.
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if user_id == admin.user_id {
        return Err(AppError::BadRequest(
            "Admins cannot delete their own account".into(),
        ));
    }

    let deleted = UserRepo::delete(&state.pool, user_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }));
    }

    state.sessions.remove_user(user_id).await;
    tracing::info!(user_id, admin_id = admin.user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/admin/users/{id}/role
///
/// The new role takes effect on the user's next login.
pub async fn update_user_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<DbId>,
    Json(input): Json<UpdateRoleRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    if !is_valid_role(&input.role) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown role '{}'",
            input.role
        ))));
    }

    let user = UserRepo::update_role(&state.pool, user_id, &input.role)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }))?;

    tracing::info!(
        user_id,
        role = %user.role,
        admin_id = admin.user_id,
        "User role updated"
    );
    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/activity
pub async fn list_activity(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<ActivityWithUser>>>> {
    let activity = ActivityRepo::list_recent_with_users(&state.pool, ACTIVITY_LIST_LIMIT).await?;
    Ok(Json(DataResponse { data: activity }))
}

// ---------------------------------------------------------------------------
// Zones
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/zones
pub async fn list_zones(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> AppResult<Json<DataResponse<ZonesResponse>>> {
    let zones = ZoneRepo::list(&state.pool).await?;
    let thresholds = ZoneThresholdRepo::as_map(&state.pool).await?;
    Ok(Json(DataResponse {
        data: ZonesResponse { zones, thresholds },
    }))
}

/// POST /api/v1/admin/zones
///
/// Create a zone or replace the polygon of an existing one, and set its
/// threshold.
pub async fn create_zone(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateZoneRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Zone>>)> {
    let zone_name = input.zone_name.trim();
    validate_threshold(zone_name, input.threshold)?;
    if input.zone_points.len() < MIN_ZONE_POINTS {
        return Err(AppError::Core(CoreError::Validation(format!(
            "A zone needs at least {MIN_ZONE_POINTS} points"
        ))));
    }
    if input
        .zone_points
        .iter()
        .any(|p| !p.x.is_finite() || !p.y.is_finite())
    {
        return Err(AppError::Core(CoreError::Validation(
            "Zone points must be finite numbers".into(),
        )));
    }

    let zone = ZoneRepo::upsert(&state.pool, zone_name, &input.zone_points).await?;
    ZoneThresholdRepo::upsert(&state.pool, zone_name, input.threshold).await?;

    tracing::info!(
        zone = %zone.name,
        points = input.zone_points.len(),
        threshold = input.threshold,
        admin_id = admin.user_id,
        "Zone saved"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: zone })))
}

/// DELETE /api/v1/admin/zones/{name}
///
/// Removes the zone and its threshold. Deleting an unknown zone succeeds.
pub async fn delete_zone(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(zone_name): Path<String>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    let zone_deleted = ZoneRepo::delete(&state.pool, &zone_name).await?;
    let threshold_deleted = ZoneThresholdRepo::delete(&state.pool, &zone_name).await?;

    tracing::info!(
        zone = %zone_name,
        zone_deleted,
        threshold_deleted,
        admin_id = admin.user_id,
        "Zone deleted"
    );
    Ok(Json(MessageResponse::new("Zone deleted")))
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/settings/thresholds
pub async fn get_thresholds(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> AppResult<Json<DataResponse<ZoneThresholds>>> {
    let thresholds = ZoneThresholdRepo::as_map(&state.pool).await?;
    Ok(Json(DataResponse { data: thresholds }))
}

/// PUT /api/v1/admin/settings/thresholds
///
/// Merge the given thresholds into the stored set and return the result.
/// Zones not named in the request keep their thresholds.
pub async fn update_thresholds(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<UpdateThresholdsRequest>,
) -> AppResult<Json<DataResponse<ZoneThresholds>>> {
    let mut updates = ZoneThresholds::with_capacity(input.thresholds.len());
    for (zone_name, threshold) in input.thresholds {
        let zone_name = zone_name.trim().to_string();
        validate_threshold(&zone_name, threshold)?;
        updates.insert(zone_name, threshold);
    }

    ZoneThresholdRepo::upsert_many(&state.pool, &updates).await?;
    tracing::info!(
        updated = updates.len(),
        admin_id = admin.user_id,
        "Zone thresholds updated"
    );

    let thresholds = ZoneThresholdRepo::as_map(&state.pool).await?;
    Ok(Json(DataResponse { data: thresholds }))
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/stats
pub async fn stats(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> AppResult<Json<DataResponse<StatsResponse>>> {
    let today = start_of_today();

    let total_users = UserRepo::count(&state.pool).await?;
    let total_detections = DetectionLogRepo::count(&state.pool).await?;
    let today_detections = DetectionLogRepo::count_since(&state.pool, today).await?;
    let total_people = DetectionLogRepo::sum_people(&state.pool).await?;
    let active_zones = ZoneRepo::count(&state.pool).await?;
    let activity_summary = ActivityRepo::summary_since(&state.pool, today).await?;

    Ok(Json(DataResponse {
        data: StatsResponse {
            total_users,
            total_detections,
            today_detections,
            total_people,
            active_zones,
            activity_summary,
        },
    }))
}

/// Midnight UTC of the current day.
fn start_of_today() -> Timestamp {
    Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
}
