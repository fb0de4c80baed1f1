//! Admin-managed zones and occupancy thresholds.

use crowdcount_core::geometry::Point;
use crowdcount_core::types::Timestamp;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// Threshold applied to a zone with no stored threshold row.
pub const DEFAULT_ZONE_THRESHOLD: i32 = 10;

/// A named polygon from the `zones` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Zone {
    pub name: String,
    pub points: Json<Vec<Point>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `zone_thresholds` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ZoneThreshold {
    pub zone_name: String,
    pub threshold: i32,
    pub updated_at: Timestamp,
}
