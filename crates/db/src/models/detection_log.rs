//! Saved detection results.

use crowdcount_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `detection_logs` table.
///
/// `zone_counts` holds `{ "type": ..., "crossed": ..., "zones": {...} }`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DetectionLog {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub detection_type: String,
    pub total_count: i32,
    pub crossed_count: i32,
    pub zone_counts: serde_json::Value,
    pub created_at: Timestamp,
}

/// Detection row joined with the owning user, used by the CSV export.
#[derive(Debug, Clone, FromRow)]
pub struct DetectionLogWithUser {
    pub id: DbId,
    pub username: Option<String>,
    pub email: Option<String>,
    pub total_count: i32,
    pub crossed_count: i32,
    pub detection_type: String,
    pub zone_counts: serde_json::Value,
    pub created_at: Timestamp,
}

/// DTO for inserting a detection log.
#[derive(Debug, Deserialize)]
pub struct CreateDetectionLog {
    pub user_id: DbId,
    pub detection_type: String,
    pub total_count: i32,
    pub crossed_count: i32,
    pub zone_counts: serde_json::Value,
}
