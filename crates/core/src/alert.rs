//! Zone occupancy alerts.
//!
//! Pure logic: the caller supplies counts and thresholds.

use serde::{Deserialize, Serialize};

use crate::types::{ZoneCounts, ZoneThresholds};

/// Severity of an occupancy alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Medium,
    High,
}

/// A zone whose occupancy exceeds its configured threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneAlert {
    pub zone: String,
    pub current: u32,
    pub threshold: i32,
    pub message: String,
    pub severity: AlertSeverity,
}

/// Severity for `count` against `threshold`: high above 1.5x the threshold.
pub fn severity_for(count: u32, threshold: i32) -> AlertSeverity {
    if f64::from(count) > f64::from(threshold) * 1.5 {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    }
}

/// Alerts for every zone with a threshold that its count strictly exceeds.
///
/// Zones without a threshold never alert. Output follows the order of
/// `zone_counts`.
pub fn evaluate_alerts(zone_counts: &ZoneCounts, thresholds: &ZoneThresholds) -> Vec<ZoneAlert> {
    zone_counts
        .iter()
        .filter_map(|(zone, &count)| {
            let threshold = *thresholds.get(zone)?;
            (i64::from(count) > i64::from(threshold)).then(|| ZoneAlert {
                zone: zone.clone(),
                current: count,
                threshold,
                message: format!("{zone} exceeded threshold! ({count}/{threshold})"),
                severity: severity_for(count, threshold),
            })
        })
        .collect()
}
