//! Route definitions for the `/admin` resource.
//!
//! Every handler extracts `RequireAdmin`, so non-admins get 403.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::{admin, export};
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// GET    /users                -> list_users
/// DELETE /users/{id}           -> delete_user
/// PUT    /users/{id}/role      -> update_user_role
/// GET    /activity             -> list_activity
/// GET    /zones                -> list_zones
/// POST   /zones                -> create_zone
/// DELETE /zones/{name}         -> delete_zone
/// GET    /settings/thresholds  -> get_thresholds
/// PUT    /settings/thresholds  -> update_thresholds
/// GET    /stats                -> stats
/// POST   /export/csv           -> export_csv
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/role", put(admin::update_user_role))
        .route("/activity", get(admin::list_activity))
        .route("/zones", get(admin::list_zones).post(admin::create_zone))
        .route("/zones/{name}", delete(admin::delete_zone))
        .route(
            "/settings/thresholds",
            get(admin::get_thresholds).put(admin::update_thresholds),
        )
        .route("/stats", get(admin::stats))
        .route("/export/csv", post(export::export_csv))
}
