//! CSV export of detection logs for administrators.

use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, Utc};
use crowdcount_core::error::CoreError;
use crowdcount_core::export::{build_detection_csv, DetectionExportRow};
use crowdcount_core::types::Timestamp;
use crowdcount_db::models::detection_log::DetectionLogWithUser;
use crowdcount_db::repositories::DetectionLogRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;

/// Request body for `POST /admin/export/csv`.
///
/// Dates are RFC 3339 timestamps or plain `YYYY-MM-DD` days. A plain end day
/// includes the whole of that day.
#[derive(Debug, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// POST /api/v1/admin/export/csv
///
/// Responds with a `text/csv` attachment, newest logs first.
pub async fn export_csv(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    body: Option<Json<ExportRequest>>,
) -> AppResult<impl IntoResponse> {
    let input = body.map(|Json(input)| input).unwrap_or_default();

    let start = parse_bound(input.start_date.as_deref(), Bound::Start)?;
    let end = parse_bound(input.end_date.as_deref(), Bound::End)?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(AppError::Core(CoreError::Validation(
                "start_date must not be after end_date".into(),
            )));
        }
    }

    let logs = DetectionLogRepo::list_for_export(&state.pool, start, end).await?;
    let rows: Vec<DetectionExportRow> = logs.into_iter().map(export_row).collect();
    let csv = build_detection_csv(&rows);

    let filename = format!(
        "detection_logs_{}.csv",
        Utc::now().format("%Y%m%d_%H%M%S")
    );
    tracing::info!(
        admin_id = admin.user_id,
        rows = rows.len(),
        %filename,
        "Detection logs exported"
    );

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    ))
}

fn export_row(log: DetectionLogWithUser) -> DetectionExportRow {
    DetectionExportRow {
        id: log.id,
        username: log.username,
        email: log.email,
        people_count: log.total_count,
        crossed_count: log.crossed_count,
        detection_type: log.detection_type,
        zone_data: log.zone_counts,
        created_at: log.created_at,
    }
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// Parse an optional date bound. Blank strings count as absent.
fn parse_bound(raw: Option<&str>, bound: Bound) -> Result<Option<Timestamp>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }

    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::Core(CoreError::Validation(format!(
            "Invalid date '{raw}', expected YYYY-MM-DD or RFC 3339"
        )))
    })?;

    let midnight = day.and_time(NaiveTime::MIN).and_utc();
    let ts = match bound {
        Bound::Start => midnight,
        Bound::End => day
            .checked_add_days(Days::new(1))
            .map(|next| next.and_time(NaiveTime::MIN).and_utc() - TimeDelta::microseconds(1))
            .unwrap_or(midnight),
    };
    Ok(Some(ts))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn blank_bounds_are_absent() {
        assert_eq!(parse_bound(None, Bound::Start).unwrap(), None);
        assert_eq!(parse_bound(Some("  "), Bound::End).unwrap(), None);
    }

    #[test]
    fn plain_days_cover_the_whole_day() {
        let start = parse_bound(Some("2026-03-01"), Bound::Start).unwrap();
        let end = parse_bound(Some("2026-03-01"), Bound::End).unwrap();

        assert_eq!(start, Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()));
        let end = end.unwrap();
        assert!(end > Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).unwrap());
        assert!(end < Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn rfc3339_is_converted_to_utc() {
        let ts = parse_bound(Some("2026-03-01T12:00:00+02:00"), Bound::Start).unwrap();
        assert_eq!(ts, Some(Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_matches!(
            parse_bound(Some("yesterday"), Bound::Start),
            Err(AppError::Core(CoreError::Validation(_)))
        );
    }
}
