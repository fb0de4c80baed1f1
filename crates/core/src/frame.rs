//! Frame payload decoding and encoding.
//!
//! Clients send frames as base64, optionally wrapped in a data URL
//! (`data:image/jpeg;base64,...`). Responses carry annotated frames and
//! heatmaps as base64 JPEG.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, RgbImage};

use crate::error::CoreError;

/// Strip an optional data-URL prefix and decode the base64 body.
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, CoreError> {
    let encoded = payload
        .split_once(',')
        .map_or(payload, |(_, body)| body)
        .trim();
    STANDARD
        .decode(encoded)
        .map_err(|e| CoreError::Validation(format!("Payload is not valid base64: {e}")))
}

/// Decode raw image bytes (JPEG, PNG or WebP) into an RGB frame.
pub fn decode_frame_bytes(bytes: &[u8]) -> Result<RgbImage, CoreError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| CoreError::Validation(format!("Frame is not a decodable image: {e}")))?;
    Ok(image.to_rgb8())
}

/// Decode a base64 or data-URL frame payload into an RGB frame.
pub fn decode_frame(payload: &str) -> Result<RgbImage, CoreError> {
    let bytes = decode_base64_payload(payload)?;
    decode_frame_bytes(&bytes)
}

/// Encode `frame` as JPEG bytes.
pub fn encode_jpeg(frame: &RgbImage) -> Result<Vec<u8>, CoreError> {
    let mut buffer = Cursor::new(Vec::new());
    frame
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|e| CoreError::Internal(format!("JPEG encoding failed: {e}")))?;
    Ok(buffer.into_inner())
}

/// Encode `frame` as base64 JPEG for JSON responses.
pub fn encode_jpeg_base64(frame: &RgbImage) -> Result<String, CoreError> {
    Ok(STANDARD.encode(encode_jpeg(frame)?))
}
