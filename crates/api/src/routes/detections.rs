//! Route definitions for the `/detections` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::detections;
use crate::state::AppState;

/// Routes mounted at `/detections`.
///
/// ```text
/// GET  / -> list_detections
/// POST / -> save_detection
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(detections::list_detections).post(detections::save_detection),
    )
}
