//! Detector contract and per-frame detection records.
//!
//! The detector itself is an external capability. The core only asks it for
//! the person class above a minimum confidence, and re-applies both filters
//! on the way back in case the backend ignores the request parameters.

use async_trait::async_trait;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geometry::Point;

/// Class id of "person" in the COCO label set used by the detector.
pub const PERSON_CLASS_ID: u32 = 0;

/// Detections below this confidence are discarded.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Axis-aligned bounding box in pixel coordinates, `x1 < x2`, `y1 < y2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box midpoint truncated to whole pixels.
    pub fn center(&self) -> Point {
        Point::new(
            ((self.x1 + self.x2) / 2.0).trunc(),
            ((self.y1 + self.y2) / 2.0).trunc(),
        )
    }

    /// Corner coordinates truncated to whole pixels, as reported to clients.
    pub fn to_pixels(&self) -> [i32; 4] {
        [
            self.x1 as i32,
            self.y1 as i32,
            self.x2 as i32,
            self.y2 as i32,
        ]
    }
}

/// One raw result from the detector backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: u32,
}

/// A person detection as returned to the caller, with its assigned id.
///
/// `id` is a tracked identity in webcam mode and the 1-based index within the
/// frame otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub id: u64,
    pub bbox: [i32; 4],
    pub center: [i32; 2],
    pub confidence: f32,
}

impl Detection {
    pub fn new(id: u64, raw: &RawDetection) -> Self {
        let center = raw.bbox.center();
        Self {
            id,
            bbox: raw.bbox.to_pixels(),
            center: [center.x as i32, center.y as i32],
            confidence: raw.confidence,
        }
    }
}

/// Error returned by a [`Detector`] backend.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("detector backend unreachable: {0}")]
    Unavailable(String),

    #[error("detector returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl From<DetectorError> for CoreError {
    fn from(err: DetectorError) -> Self {
        CoreError::DetectorUnavailable(err.to_string())
    }
}

/// Object detection backend.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Detect objects of the given classes with at least `min_confidence`.
    async fn detect(
        &self,
        frame: &RgbImage,
        min_confidence: f32,
        classes: &[u32],
    ) -> Result<Vec<RawDetection>, DetectorError>;
}

/// Ask `detector` for persons and drop anything that is not a confident
/// person detection.
pub async fn detect_people(
    detector: &dyn Detector,
    frame: &RgbImage,
) -> Result<Vec<RawDetection>, DetectorError> {
    let raw = detector
        .detect(frame, DEFAULT_MIN_CONFIDENCE, &[PERSON_CLASS_ID])
        .await?;
    Ok(filter_people(raw, DEFAULT_MIN_CONFIDENCE))
}

/// Keep only person detections at or above `min_confidence`.
pub fn filter_people(raw: Vec<RawDetection>, min_confidence: f32) -> Vec<RawDetection> {
    raw.into_iter()
        .filter(|d| d.class_id == PERSON_CLASS_ID && d.confidence >= min_confidence)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(class_id: u32, confidence: f32) -> RawDetection {
        RawDetection {
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            confidence,
            class_id,
        }
    }

    #[test]
    fn center_is_truncated_midpoint() {
        let bbox = BoundingBox::new(10.0, 20.0, 15.0, 27.0);
        assert_eq!(bbox.center(), Point::new(12.0, 23.0));
    }

    #[test]
    fn detection_reports_pixel_coordinates() {
        let d = Detection::new(
            3,
            &RawDetection {
                bbox: BoundingBox::new(10.7, 20.2, 31.9, 60.5),
                confidence: 0.8,
                class_id: PERSON_CLASS_ID,
            },
        );
        assert_eq!(d.id, 3);
        assert_eq!(d.bbox, [10, 20, 31, 60]);
        assert_eq!(d.center, [21, 40]);
    }

    #[test]
    fn filter_keeps_confident_people_only() {
        let kept = filter_people(
            vec![raw(0, 0.9), raw(0, 0.5), raw(0, 0.49), raw(2, 0.99)],
            DEFAULT_MIN_CONFIDENCE,
        );
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|d| d.class_id == PERSON_CLASS_ID));
    }

    #[test]
    fn detector_errors_surface_as_unavailable() {
        let err: CoreError = DetectorError::InvalidResponse("truncated body".into()).into();
        assert!(matches!(err, CoreError::DetectorUnavailable(msg) if msg.contains("truncated")));
    }
}
