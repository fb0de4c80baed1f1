//! Route definitions for the `/webcam` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::webcam;
use crate::state::AppState;

/// Routes mounted at `/webcam`.
///
/// ```text
/// POST /start           -> start
/// POST /stop            -> stop
/// POST /frame           -> frame
/// POST /reset-crossings -> reset_crossings
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(webcam::start))
        .route("/stop", post(webcam::stop))
        .route("/frame", post(webcam::frame))
        .route("/reset-crossings", post(webcam::reset_crossings))
}
