//! Repository for the `zones` table.

use crowdcount_core::geometry::Point;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::zone::Zone;

const COLUMNS: &str = "name, points, created_at, updated_at";

/// Admin-managed zone polygons keyed by name.
pub struct ZoneRepo;

impl ZoneRepo {
    /// Insert a zone or replace the polygon of an existing one.
    pub async fn upsert(pool: &PgPool, name: &str, points: &[Point]) -> Result<Zone, sqlx::Error> {
        let query = format!(
            "INSERT INTO zones (name, points)
             VALUES ($1, $2)
             ON CONFLICT (name) DO UPDATE SET points = EXCLUDED.points
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Zone>(&query)
            .bind(name)
            .bind(Json(points))
            .fetch_one(pool)
            .await
    }

    /// All zones in creation order.
    pub async fn list(pool: &PgPool) -> Result<Vec<Zone>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM zones ORDER BY created_at, name");
        sqlx::query_as::<_, Zone>(&query).fetch_all(pool).await
    }

    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM zones WHERE name = $1")
            .bind(name)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM zones")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}
