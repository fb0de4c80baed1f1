//! CSV export of detection logs.
//!
//! Pure formatting: rows are assembled by the caller from the database.

use crate::types::{DbId, Timestamp};

/// Header line of the detection log export.
pub const DETECTION_CSV_HEADER: &str =
    "id,username,email,people_count,crossed_count,detection_type,zone_data,timestamp";

/// One detection log joined with its owner.
#[derive(Debug, Clone)]
pub struct DetectionExportRow {
    pub id: DbId,
    pub username: Option<String>,
    pub email: Option<String>,
    pub people_count: i32,
    pub crossed_count: i32,
    pub detection_type: String,
    pub zone_data: serde_json::Value,
    pub created_at: Timestamp,
}

/// Build the CSV document for `rows`, header first.
pub fn build_detection_csv(rows: &[DetectionExportRow]) -> String {
    let mut csv = String::from(DETECTION_CSV_HEADER);
    csv.push('\n');

    for row in rows {
        let fields = [
            row.id.to_string(),
            csv_escape(row.username.as_deref().unwrap_or("")),
            csv_escape(row.email.as_deref().unwrap_or("")),
            row.people_count.to_string(),
            row.crossed_count.to_string(),
            csv_escape(&row.detection_type),
            csv_escape(&row.zone_data.to_string()),
            row.created_at.to_rfc3339(),
        ];
        csv.push_str(&fields.join(","));
        csv.push('\n');
    }

    csv
}

/// Quote a field when it contains a delimiter, quote, or line break.
pub fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
