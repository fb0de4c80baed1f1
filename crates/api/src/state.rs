use std::sync::Arc;

use crowdcount_core::capture::FrameSourceProvider;
use crowdcount_core::detection::Detector;

use crate::config::ServerConfig;
use crate::session_store::SessionStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is behind an `Arc` or is a pool handle.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: crowdcount_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Person detector. `None` when `DETECTOR_URL` is not configured.
    pub detector: Option<Arc<dyn Detector>>,
    /// Opens webcam devices and uploaded videos.
    pub sources: Arc<dyn FrameSourceProvider>,
    /// Per-user webcam and video sessions.
    pub sessions: Arc<SessionStore>,
}
