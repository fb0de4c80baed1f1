//! Repository for the `user_activity` table.

use crowdcount_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::activity::{ActivityCount, ActivityWithUser, CreateActivity, UserActivity};

const COLUMNS: &str = "id, user_id, activity_type, activity_details, created_at";

/// Append-only activity log.
pub struct ActivityRepo;

impl ActivityRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateActivity,
    ) -> Result<UserActivity, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_activity (user_id, activity_type, activity_details)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserActivity>(&query)
            .bind(input.user_id)
            .bind(&input.activity_type)
            .bind(&input.activity_details)
            .fetch_one(pool)
            .await
    }

    /// Most recent activities with the acting user's name and email, newest first.
    pub async fn list_recent_with_users(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<ActivityWithUser>, sqlx::Error> {
        sqlx::query_as::<_, ActivityWithUser>(
            "SELECT a.id, a.user_id, u.username, u.email,
                    a.activity_type, a.activity_details, a.created_at
             FROM user_activity a
             LEFT JOIN users u ON u.id = a.user_id
             ORDER BY a.created_at DESC, a.id DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Activity counts grouped by type for rows created at or after `since`.
    pub async fn summary_since(
        pool: &PgPool,
        since: Timestamp,
    ) -> Result<Vec<ActivityCount>, sqlx::Error> {
        sqlx::query_as::<_, ActivityCount>(
            "SELECT activity_type, COUNT(*) AS count
             FROM user_activity
             WHERE created_at >= $1
             GROUP BY activity_type
             ORDER BY activity_type",
        )
        .bind(since)
        .fetch_all(pool)
        .await
    }
}
