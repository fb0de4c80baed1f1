//! Route definitions for the `/zones` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::zones;
use crate::state::AppState;

/// Routes mounted at `/zones`.
///
/// ```text
/// GET  /thresholds -> get_thresholds
/// POST /thresholds -> set_threshold
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/thresholds",
        get(zones::get_thresholds).post(zones::set_threshold),
    )
}
