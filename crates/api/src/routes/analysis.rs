//! Route definitions for the `/analysis` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::handlers::analysis;
use crate::state::AppState;

/// Largest accepted body for base64 image and frame payloads.
pub const MAX_FRAME_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Routes mounted at `/analysis`.
///
/// ```text
/// POST /image -> analyze_image
/// POST /frame -> analyze_frame
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/image", post(analysis::analyze_image))
        .route("/frame", post(analysis::analyze_frame))
        .layer(DefaultBodyLimit::max(MAX_FRAME_BODY_BYTES))
}
