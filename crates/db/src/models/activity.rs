//! User activity log rows.

use crowdcount_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Activity type recorded on successful login.
pub const ACTIVITY_LOGIN: &str = "login";
/// Activity type recorded when a detection log is saved.
pub const ACTIVITY_DETECTION: &str = "detection";

/// A row from the `user_activity` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserActivity {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub activity_type: String,
    pub activity_details: Option<String>,
    pub created_at: Timestamp,
}

/// Activity row joined with the acting user. The user may have been deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityWithUser {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub activity_type: String,
    pub activity_details: Option<String>,
    pub created_at: Timestamp,
}

/// Number of activities of one type.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityCount {
    pub activity_type: String,
    pub count: i64,
}

/// DTO for recording an activity.
#[derive(Debug, Deserialize)]
pub struct CreateActivity {
    pub user_id: DbId,
    pub activity_type: String,
    pub activity_details: Option<String>,
}
