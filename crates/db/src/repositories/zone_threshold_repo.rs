//! Repository for the `zone_thresholds` table.

use crowdcount_core::types::ZoneThresholds;
use sqlx::PgPool;

use crate::models::zone::ZoneThreshold;

const COLUMNS: &str = "zone_name, threshold, updated_at";

/// Per-zone occupancy thresholds.
pub struct ZoneThresholdRepo;

impl ZoneThresholdRepo {
    /// Insert or overwrite the threshold for one zone.
    pub async fn upsert(
        pool: &PgPool,
        zone_name: &str,
        threshold: i32,
    ) -> Result<ZoneThreshold, sqlx::Error> {
        let query = format!(
            "INSERT INTO zone_thresholds (zone_name, threshold)
             VALUES ($1, $2)
             ON CONFLICT (zone_name) DO UPDATE SET threshold = EXCLUDED.threshold
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ZoneThreshold>(&query)
            .bind(zone_name)
            .bind(threshold)
            .fetch_one(pool)
            .await
    }

    /// Bulk upsert thresholds within a transaction.
    pub async fn upsert_many(
        pool: &PgPool,
        thresholds: &ZoneThresholds,
    ) -> Result<Vec<ZoneThreshold>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut results = Vec::with_capacity(thresholds.len());

        let query = format!(
            "INSERT INTO zone_thresholds (zone_name, threshold)
             VALUES ($1, $2)
             ON CONFLICT (zone_name) DO UPDATE SET threshold = EXCLUDED.threshold
             RETURNING {COLUMNS}"
        );

        for (zone_name, threshold) in thresholds {
            let row = sqlx::query_as::<_, ZoneThreshold>(&query)
                .bind(zone_name)
                .bind(*threshold)
                .fetch_one(&mut *tx)
                .await?;
            results.push(row);
        }

        tx.commit().await?;
        Ok(results)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<ZoneThreshold>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM zone_thresholds ORDER BY zone_name");
        sqlx::query_as::<_, ZoneThreshold>(&query)
            .fetch_all(pool)
            .await
    }

    /// All thresholds as a zone-name lookup map.
    pub async fn as_map(pool: &PgPool) -> Result<ZoneThresholds, sqlx::Error> {
        let rows = Self::list(pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.zone_name, row.threshold))
            .collect())
    }

    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, zone_name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM zone_thresholds WHERE zone_name = $1")
            .bind(zone_name)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
