//! Repository for the `detection_logs` table.

use crowdcount_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::detection_log::{CreateDetectionLog, DetectionLog, DetectionLogWithUser};

const COLUMNS: &str =
    "id, user_id, detection_type, total_count, crossed_count, zone_counts, created_at";

/// Provides persistence for saved detection results.
pub struct DetectionLogRepo;

impl DetectionLogRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateDetectionLog,
    ) -> Result<DetectionLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO detection_logs
                (user_id, detection_type, total_count, crossed_count, zone_counts)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DetectionLog>(&query)
            .bind(input.user_id)
            .bind(&input.detection_type)
            .bind(input.total_count)
            .bind(input.crossed_count)
            .bind(&input.zone_counts)
            .fetch_one(pool)
            .await
    }

    /// Most recent logs across all users, newest first.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<DetectionLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM detection_logs
             ORDER BY created_at DESC, id DESC
             LIMIT $1"
        );
        sqlx::query_as::<_, DetectionLog>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Most recent logs owned by one user, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<DetectionLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM detection_logs
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, DetectionLog>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Logs joined with their owners for export, newest first.
    ///
    /// Both bounds are optional and inclusive.
    pub async fn list_for_export(
        pool: &PgPool,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<Vec<DetectionLogWithUser>, sqlx::Error> {
        sqlx::query_as::<_, DetectionLogWithUser>(
            "SELECT d.id, u.username, u.email, d.total_count, d.crossed_count,
                    d.detection_type, d.zone_counts, d.created_at
             FROM detection_logs d
             LEFT JOIN users u ON u.id = d.user_id
             WHERE ($1::timestamptz IS NULL OR d.created_at >= $1)
               AND ($2::timestamptz IS NULL OR d.created_at <= $2)
             ORDER BY d.created_at DESC, d.id DESC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM detection_logs")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Number of logs created at or after `since`.
    pub async fn count_since(pool: &PgPool, since: Timestamp) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM detection_logs WHERE created_at >= $1")
                .bind(since)
                .fetch_one(pool)
                .await?;
        Ok(count)
    }

    /// Sum of `total_count` over every log, 0 when there are none.
    pub async fn sum_people(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (sum,): (i64,) =
            sqlx::query_as("SELECT COALESCE(SUM(total_count), 0)::BIGINT FROM detection_logs")
                .fetch_one(pool)
                .await?;
        Ok(sum)
    }
}
