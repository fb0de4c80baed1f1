//! Route definitions for the `/video` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::handlers::video;
use crate::state::AppState;

/// Largest accepted video upload, multipart or base64.
pub const MAX_VIDEO_BODY_BYTES: usize = 512 * 1024 * 1024;

/// Routes mounted at `/video`.
///
/// ```text
/// POST /load  -> load (multipart `file` or JSON `video_data`)
/// POST /frame -> frame
/// POST /reset -> reset
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/load",
            post(video::load).layer(DefaultBodyLimit::max(MAX_VIDEO_BODY_BYTES)),
        )
        .route("/frame", post(video::frame))
        .route("/reset", post(video::reset))
}
