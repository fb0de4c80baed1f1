//! Handlers for the `/webcam` resource: live capture with tracked identities.

use axum::extract::State;
use axum::Json;
use crowdcount_core::capture::read_frame;
use crowdcount_core::session::{FrameOptions, IdentitySource, SessionKind};

use crate::analysis::{detect, load_thresholds, FrameResponse, Overlay};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, MessageResponse};
use crate::session_store::close_source;
use crate::state::AppState;

/// POST /api/v1/webcam/start
///
/// Open the capture device and start a fresh session. A device already open
/// for this user is closed.
pub async fn start(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    let source = state.sources.open_device().await?;

    let session = state
        .sessions
        .get_or_create(auth_user.user_id, SessionKind::Webcam)
        .await;
    let previous = {
        let mut session = session.lock().await;
        let previous = session.reset();
        session.attach_source(source);
        previous
    };
    close_source(previous).await;

    tracing::info!(user_id = auth_user.user_id, "Webcam started");
    Ok(Json(MessageResponse::new("Webcam started")))
}

/// POST /api/v1/webcam/stop
///
/// Release the device and clear tracks, crossings and heatmap.
pub async fn stop(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    if let Some(session) = state
        .sessions
        .get(auth_user.user_id, SessionKind::Webcam)
        .await
    {
        let source = session.lock().await.reset();
        close_source(source).await;
    }

    tracing::info!(user_id = auth_user.user_id, "Webcam stopped");
    Ok(Json(MessageResponse::new("Webcam stopped")))
}

/// POST /api/v1/webcam/frame
///
/// Grab the next frame from the device and analyse it. The body is
/// optional; without one the session's crossing line is kept and no zones
/// are evaluated.
pub async fn frame(
    State(state): State<AppState>,
    auth_user: AuthUser,
    body: Option<Json<FrameOptions>>,
) -> AppResult<Json<DataResponse<FrameResponse>>> {
    let options = body.map(|Json(options)| options).unwrap_or_default();
    let thresholds = load_thresholds(&state).await?;
    let timeout = state.config.capture.read_timeout();

    let session = state
        .sessions
        .get_or_create(auth_user.user_id, SessionKind::Webcam)
        .await;
    let (frame, analysis, line) = {
        let mut session = session.lock().await;
        let frame = read_frame(session.source_mut()?, None, timeout).await?;
        let raw = detect(&state, &frame).await?;
        let analysis =
            session.analyze(&frame, &raw, IdentitySource::Tracked, &options, &thresholds);
        let line = session.crossing().line().copied();
        (frame, analysis, line)
    };

    let response = FrameResponse::annotated(
        analysis,
        None,
        &frame,
        Overlay {
            zones: options.zones.as_ref(),
            line,
        },
    )?;
    Ok(Json(DataResponse { data: response }))
}

/// POST /api/v1/webcam/reset-crossings
///
/// Clear the crossed set and the heatmap. The line and tracks are kept.
pub async fn reset_crossings(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    if let Some(session) = state
        .sessions
        .get(auth_user.user_id, SessionKind::Webcam)
        .await
    {
        session.lock().await.reset_crossings();
    }
    Ok(Json(MessageResponse::new("Crossing count reset")))
}
