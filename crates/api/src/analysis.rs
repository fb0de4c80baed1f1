//! Glue between HTTP handlers and the core frame pipeline.
//!
//! Handlers decode input and load thresholds before taking a session lock,
//! call [`detect`] and `Session::analyze` while holding it, and turn the
//! result into a [`FrameResponse`] after releasing it.

use std::sync::Arc;

use crowdcount_core::annotate::annotate_frame;
use crowdcount_core::detection::{detect_people, Detector, RawDetection};
use crowdcount_core::error::CoreError;
use crowdcount_core::frame::encode_jpeg_base64;
use crowdcount_core::geometry::LineSegment;
use crowdcount_core::session::FrameAnalysis;
use crowdcount_core::types::{FrameNumber, ZoneThresholds};
use crowdcount_core::zones::ZoneMap;
use crowdcount_db::repositories::ZoneThresholdRepo;
use image::RgbImage;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

/// JSON body returned by every frame analysis endpoint.
#[derive(Debug, Serialize)]
pub struct FrameResponse {
    #[serde(flatten)]
    pub analysis: FrameAnalysis,
    /// Frame index the result belongs to (video and uploaded frames).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_number: Option<FrameNumber>,
    /// Annotated frame, base64 JPEG.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    /// Heatmap blended over the frame, base64 JPEG.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heatmap: Option<String>,
}

/// The configured detector, or a 503 when there is none.
pub fn require_detector(state: &AppState) -> AppResult<Arc<dyn Detector>> {
    state.detector.clone().ok_or_else(|| {
        CoreError::DetectorUnavailable("Person detector is not configured".into()).into()
    })
}

/// Run the person detector on `frame`.
pub async fn detect(state: &AppState, frame: &RgbImage) -> AppResult<Vec<RawDetection>> {
    let detector = require_detector(state)?;
    let raw = detect_people(detector.as_ref(), frame)
        .await
        .map_err(CoreError::from)?;
    Ok(raw)
}

/// Current zone thresholds from the database.
pub async fn load_thresholds(state: &AppState) -> AppResult<ZoneThresholds> {
    Ok(ZoneThresholdRepo::as_map(&state.pool).await?)
}

/// What to draw on the returned frame.
pub struct Overlay<'a> {
    pub zones: Option<&'a ZoneMap>,
    pub line: Option<LineSegment>,
}

impl FrameResponse {
    /// Bare analysis with no images attached.
    pub fn new(mut analysis: FrameAnalysis, frame_number: Option<FrameNumber>) -> AppResult<Self> {
        let heatmap = analysis
            .heatmap_overlay
            .take()
            .map(|overlay| encode_jpeg_base64(&overlay))
            .transpose()?;
        Ok(Self {
            analysis,
            frame_number,
            frame: None,
            heatmap,
        })
    }

    /// Analysis plus the annotated frame.
    pub fn annotated(
        analysis: FrameAnalysis,
        frame_number: Option<FrameNumber>,
        frame: &RgbImage,
        overlay: Overlay<'_>,
    ) -> AppResult<Self> {
        let annotated = annotate_frame(
            frame,
            &analysis.detections,
            overlay.zones,
            overlay.line.as_ref(),
        );
        let mut response = Self::new(analysis, frame_number)?;
        response.frame = Some(encode_jpeg_base64(&annotated)?);
        Ok(response)
    }
}
