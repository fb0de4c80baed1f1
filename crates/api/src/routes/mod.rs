pub mod admin;
pub mod analysis;
pub mod auth;
pub mod detections;
pub mod health;
pub mod video;
pub mod webcam;
pub mod zones;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth
///     /register                    POST register
///     /login                       POST login
///     /verify                      POST verify (auth)
///
/// /analysis
///     /image                       POST still image
///     /frame                       POST client-extracted video frame
///
/// /webcam
///     /start                       POST open device
///     /stop                        POST release device
///     /frame                       POST grab + analyse
///     /reset-crossings             POST clear crossings + heatmap
///
/// /video
///     /load                        POST upload (multipart or base64 JSON)
///     /frame                       POST seek + analyse
///     /reset                       POST release + delete upload
///
/// /zones
///     /thresholds                  GET, POST
///
/// /detections                      GET, POST
///
/// /admin                           (admin role)
///     /users                       GET
///     /users/{id}                  DELETE
///     /users/{id}/role             PUT
///     /activity                    GET
///     /zones                       GET, POST
///     /zones/{name}                DELETE
///     /settings/thresholds         GET, PUT
///     /stats                       GET
///     /export/csv                  POST
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/analysis", analysis::router())
        .nest("/webcam", webcam::router())
        .nest("/video", video::router())
        .nest("/zones", zones::router())
        .nest("/detections", detections::router())
        .nest("/admin", admin::router())
}
