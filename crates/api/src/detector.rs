//! HTTP client for the external person detector.
//!
//! The detector is an inference service reachable at `DETECTOR_URL`. Each
//! frame is posted as base64 JPEG to `POST {url}/detect` together with the
//! requested confidence floor and class ids; the service answers with
//! `{ "detections": [{ "bbox": [x1, y1, x2, y2], "confidence": f, "class_id": n }] }`.

use std::time::Duration;

use async_trait::async_trait;
use crowdcount_core::detection::{BoundingBox, Detector, DetectorError, RawDetection};
use crowdcount_core::frame::encode_jpeg_base64;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// [`Detector`] backed by a remote inference service.
pub struct HttpDetector {
    client: reqwest::Client,
    base_url: String,
}

/// Request body for `POST /detect`.
#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    image: String,
    confidence: f32,
    classes: &'a [u32],
}

/// Response body of `POST /detect`.
#[derive(Debug, Deserialize)]
pub struct DetectResponse {
    pub detections: Vec<WireDetection>,
}

/// One detection as the service reports it.
#[derive(Debug, Deserialize)]
pub struct WireDetection {
    pub bbox: [f64; 4],
    pub confidence: f32,
    pub class_id: u32,
}

impl HttpDetector {
    /// Build a client for the detector at `base_url` with a per-request
    /// timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DetectorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DetectorError::Unavailable(format!("failed to build client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Ensure the response has a success status code.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, DetectorError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(DetectorError::Unavailable(format!(
                "detector returned {}: {body}",
                status.as_u16()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(
        &self,
        frame: &RgbImage,
        min_confidence: f32,
        classes: &[u32],
    ) -> Result<Vec<RawDetection>, DetectorError> {
        let image = encode_jpeg_base64(frame)
            .map_err(|e| DetectorError::InvalidResponse(e.to_string()))?;
        let body = DetectRequest {
            image,
            confidence: min_confidence,
            classes,
        };

        let response = self
            .client
            .post(format!("{}/detect", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| DetectorError::Unavailable(e.to_string()))?;

        let response = Self::ensure_success(response).await?;
        let parsed: DetectResponse = response
            .json()
            .await
            .map_err(|e| DetectorError::InvalidResponse(e.to_string()))?;

        let detections = into_raw_detections(parsed);
        tracing::debug!(count = detections.len(), "Detector responded");
        Ok(detections)
    }
}

/// Convert the wire format, dropping boxes that are not well-formed.
pub fn into_raw_detections(response: DetectResponse) -> Vec<RawDetection> {
    response
        .detections
        .into_iter()
        .filter_map(|d| {
            let [x1, y1, x2, y2] = d.bbox;
            let well_formed = d.bbox.iter().all(|v| v.is_finite()) && x1 < x2 && y1 < y2;
            if !well_formed {
                tracing::debug!(bbox = ?d.bbox, "Dropping malformed detection box");
                return None;
            }
            Some(RawDetection {
                bbox: BoundingBox::new(x1, y1, x2, y2),
                confidence: d.confidence,
                class_id: d.class_id,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_service_response() {
        let json = r#"{
            "detections": [
                { "bbox": [10.0, 20.0, 50.0, 120.0], "confidence": 0.91, "class_id": 0 },
                { "bbox": [0, 0, 5, 5], "confidence": 0.4, "class_id": 2 }
            ]
        }"#;
        let response: DetectResponse = serde_json::from_str(json).unwrap();
        let raw = into_raw_detections(response);

        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].bbox, BoundingBox::new(10.0, 20.0, 50.0, 120.0));
        assert_eq!(raw[0].class_id, 0);
        assert_eq!(raw[1].class_id, 2);
    }

    #[test]
    fn inverted_boxes_are_dropped() {
        let response = DetectResponse {
            detections: vec![
                WireDetection {
                    bbox: [50.0, 20.0, 10.0, 120.0],
                    confidence: 0.9,
                    class_id: 0,
                },
                WireDetection {
                    bbox: [0.0, 0.0, f64::NAN, 10.0],
                    confidence: 0.9,
                    class_id: 0,
                },
            ],
        };
        assert!(into_raw_detections(response).is_empty());
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        // Port 1 on loopback refuses connections.
        let detector = HttpDetector::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let result = detector.detect(&RgbImage::new(8, 8), 0.5, &[0]).await;
        assert_matches!(result, Err(DetectorError::Unavailable(_)));
    }
}
