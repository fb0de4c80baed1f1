//! Per-session frame analysis state.
//!
//! A [`Session`] owns everything that persists between frame requests: the
//! identity tracker, the crossing line and crossed set, the heatmap field and
//! the capture source. The API layer keeps one session per user and
//! [`SessionKind`] behind a mutex, so a frame request has exclusive access
//! for its whole duration.
//!
//! Two identity schemes coexist:
//!
//! - [`IdentitySource::Tracked`] (webcam): detections get stable ids from the
//!   tracker and crossings are keyed by id.
//! - [`IdentitySource::Positional`] (video, single frames): detections are
//!   numbered 1..n within the frame and crossings are keyed by
//!   `frame_number` plus that index. The tracker is not touched.

use image::RgbImage;
use serde::{Deserialize, Deserializer, Serialize};

use crate::alert::{evaluate_alerts, ZoneAlert};
use crate::capture::{CaptureError, FrameSource};
use crate::crossing::{CrossingCounter, CrossingKey};
use crate::detection::{Detection, RawDetection};
use crate::geometry::{LineSegment, Point};
use crate::heatmap::HeatmapAccumulator;
use crate::tracker::IdentityTracker;
use crate::types::{FrameNumber, ZoneCounts, ZoneThresholds};
use crate::zones::{count_per_zone, ZoneMap};

/// Which capture flow a session serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Webcam,
    Video,
}

/// How detections in a frame are identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// Stable ids from the session tracker.
    Tracked,
    /// 1-based index within the given frame.
    Positional { frame_number: FrameNumber },
}

/// Per-request analysis options shared by every frame endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameOptions {
    /// Absent: keep the session line. `null`: clear it. Object: replace it.
    #[serde(default, deserialize_with = "present_field")]
    pub crossing_line: Option<Option<LineSegment>>,
    /// Zones to evaluate for this frame. No zones means no counts or alerts.
    #[serde(default)]
    pub zones: Option<ZoneMap>,
    #[serde(default)]
    pub enable_heatmap: bool,
}

/// Distinguishes an explicit `null` from an absent field.
fn present_field<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Result of analysing one frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameAnalysis {
    pub people_count: usize,
    pub crossed_count: usize,
    pub detections: Vec<Detection>,
    pub zone_counts: ZoneCounts,
    pub alerts: Vec<ZoneAlert>,
    /// Heat overlay blended over the frame, when requested and non-empty.
    #[serde(skip)]
    pub heatmap_overlay: Option<RgbImage>,
}

/// Mutable analysis state for one capture flow.
pub struct Session {
    kind: SessionKind,
    tracker: IdentityTracker,
    crossing: CrossingCounter,
    heatmap: HeatmapAccumulator,
    source: Option<Box<dyn FrameSource>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("kind", &self.kind)
            .field("tracked", &self.tracker.len())
            .field("crossed", &self.crossing.crossed_count())
            .field("heatmap", &self.heatmap.is_allocated())
            .field("source_open", &self.source.is_some())
            .finish()
    }
}

impl Session {
    pub fn new(kind: SessionKind) -> Self {
        Self {
            kind,
            tracker: IdentityTracker::new(),
            crossing: CrossingCounter::new(),
            heatmap: HeatmapAccumulator::new(),
            source: None,
        }
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn tracker(&self) -> &IdentityTracker {
        &self.tracker
    }

    pub fn crossing(&self) -> &CrossingCounter {
        &self.crossing
    }

    pub fn heatmap(&self) -> &HeatmapAccumulator {
        &self.heatmap
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Install a capture source, returning the one it replaces.
    pub fn attach_source(&mut self, source: Box<dyn FrameSource>) -> Option<Box<dyn FrameSource>> {
        self.source.replace(source)
    }

    pub fn take_source(&mut self) -> Option<Box<dyn FrameSource>> {
        self.source.take()
    }

    /// The open capture source, or [`CaptureError::NotOpen`].
    pub fn source_mut(&mut self) -> Result<&mut (dyn FrameSource + 'static), CaptureError> {
        self.source.as_deref_mut().ok_or(CaptureError::NotOpen)
    }

    /// Run the tracking, crossing, zone, alert and heatmap stages on one
    /// frame's detections.
    ///
    /// `raw` must already be filtered to confident person detections.
    pub fn analyze(
        &mut self,
        frame: &RgbImage,
        raw: &[RawDetection],
        identity: IdentitySource,
        options: &FrameOptions,
        thresholds: &ZoneThresholds,
    ) -> FrameAnalysis {
        if let Some(line) = options.crossing_line {
            self.crossing.set_line(line);
        }

        let centers: Vec<Point> = raw.iter().map(|d| d.bbox.center()).collect();

        let ids: Vec<u64> = match identity {
            IdentitySource::Tracked => self.tracker.track_frame(&centers),
            IdentitySource::Positional { .. } => (1..=raw.len() as u64).collect(),
        };

        for (center, id) in centers.iter().zip(&ids) {
            let key = match identity {
                IdentitySource::Tracked => CrossingKey::Tracked(*id),
                IdentitySource::Positional { frame_number } => CrossingKey::Positional {
                    frame_number,
                    index: *id,
                },
            };
            if self.crossing.observe(*center, key) {
                tracing::debug!(kind = ?self.kind, key = %key, "Line crossing recorded");
            }
        }

        let detections: Vec<Detection> = raw
            .iter()
            .zip(&ids)
            .map(|(d, id)| Detection::new(*id, d))
            .collect();

        let (zone_counts, alerts) = evaluate_zones(&centers, options.zones.as_ref(), thresholds);

        let heatmap_overlay = if options.enable_heatmap && !centers.is_empty() {
            self.heatmap.accumulate(frame.width(), frame.height(), &centers);
            self.heatmap.render(frame)
        } else {
            None
        };

        FrameAnalysis {
            people_count: detections.len(),
            crossed_count: self.crossing.crossed_count(),
            detections,
            zone_counts,
            alerts,
            heatmap_overlay,
        }
    }

    /// Return to a fresh session. Used on webcam start and stop.
    ///
    /// Returns the detached capture source so the caller can close it.
    pub fn reset(&mut self) -> Option<Box<dyn FrameSource>> {
        self.tracker.reset();
        self.crossing.reset_all();
        self.heatmap.reset();
        self.source.take()
    }

    /// Clear the crossed set and the heatmap. Line and tracks are kept.
    pub fn reset_crossings(&mut self) {
        self.crossing.reset();
        self.heatmap.reset();
    }

    /// Release the video and forget its crossing line, crossed set and heatmap.
    ///
    /// Returns the detached capture source so the caller can close it.
    pub fn reset_video(&mut self) -> Option<Box<dyn FrameSource>> {
        self.crossing.reset_all();
        self.heatmap.reset();
        self.source.take()
    }
}

/// Counts and alerts for the supplied zones; empty when there are none.
fn evaluate_zones(
    centers: &[Point],
    zones: Option<&ZoneMap>,
    thresholds: &ZoneThresholds,
) -> (ZoneCounts, Vec<ZoneAlert>) {
    match zones {
        Some(zones) if !zones.is_empty() => {
            let counts = count_per_zone(centers, zones);
            let alerts = evaluate_alerts(&counts, thresholds);
            (counts, alerts)
        }
        _ => (ZoneCounts::new(), Vec::new()),
    }
}

/// Analyse a single uploaded image with no session state.
///
/// Detections are numbered by position; there is no crossing line.
pub fn analyze_still(
    raw: &[RawDetection],
    zones: Option<&ZoneMap>,
    thresholds: &ZoneThresholds,
) -> FrameAnalysis {
    let centers: Vec<Point> = raw.iter().map(|d| d.bbox.center()).collect();
    let detections: Vec<Detection> = raw
        .iter()
        .enumerate()
        .map(|(i, d)| Detection::new(i as u64 + 1, d))
        .collect();
    let (zone_counts, alerts) = evaluate_zones(&centers, zones, thresholds);

    FrameAnalysis {
        people_count: detections.len(),
        crossed_count: 0,
        detections,
        zone_counts,
        alerts,
        heatmap_overlay: None,
    }
}
