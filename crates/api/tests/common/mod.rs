//! Shared fixtures for the API integration tests.
//!
//! The router is built with [`build_app_router`], the same builder `main.rs`
//! uses, so tests exercise the production middleware stack. The person
//! detector and capture devices are replaced by in-memory stubs.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use image::{ImageFormat, Rgb, RgbImage};
use sqlx::PgPool;
use tower::ServiceExt;

use crowdcount_api::auth::jwt::JwtConfig;
use crowdcount_api::auth::password::hash_password;
use crowdcount_api::config::{CaptureConfig, DetectorConfig, ServerConfig};
use crowdcount_api::router::build_app_router;
use crowdcount_api::session_store::SessionStore;
use crowdcount_api::state::AppState;
use crowdcount_core::capture::{CaptureError, FrameSource, FrameSourceProvider, VideoInfo};
use crowdcount_core::detection::{BoundingBox, Detector, DetectorError, RawDetection};
use crowdcount_core::types::FrameNumber;
use crowdcount_db::models::user::{CreateUser, User};
use crowdcount_db::repositories::UserRepo;

pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;
pub const VIDEO_FRAME_COUNT: u64 = 10;
pub const TEST_PASSWORD: &str = "secret123";

// ---------------------------------------------------------------------------
// Configuration and state
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(upload_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
            expiry_hours: 1,
        },
        detector: DetectorConfig {
            url: None,
            timeout_secs: 5,
        },
        capture: CaptureConfig {
            webcam_device: "stub".to_string(),
            webcam_input_format: "stub".to_string(),
            timeout_secs: 5,
            upload_dir: upload_dir.to_path_buf(),
        },
    }
}

/// Upload directory for tests that never upload a video.
fn shared_upload_dir() -> PathBuf {
    let dir = std::env::temp_dir().join("crowdcount-api-tests");
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Application state with stub detector and capture provider.
pub fn test_state(
    pool: PgPool,
    upload_dir: &Path,
    detector: Option<Arc<dyn Detector>>,
) -> AppState {
    AppState {
        pool,
        config: Arc::new(test_config(upload_dir)),
        detector,
        sources: Arc::new(StubSourceProvider),
        sessions: Arc::new(SessionStore::new()),
    }
}

/// [`test_state`] using the shared upload directory.
pub fn shared_state(pool: PgPool, detector: Option<Arc<dyn Detector>>) -> AppState {
    test_state(pool, &shared_upload_dir(), detector)
}

/// Build the full router around `state`.
pub fn build_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    build_app_router(state, &config)
}

/// Router with the default two-person stub detector.
pub fn build_test_app(pool: PgPool) -> Router {
    build_app(shared_state(pool, Some(Arc::new(StubDetector::two_people()))))
}

/// Router with no detector configured.
pub fn build_test_app_without_detector(pool: PgPool) -> Router {
    build_app(shared_state(pool, None))
}

// ---------------------------------------------------------------------------
// Stub detector
// ---------------------------------------------------------------------------

/// Returns the same detections for every frame, or fails when `fail` is set.
pub struct StubDetector {
    pub detections: Vec<RawDetection>,
    pub fail: bool,
}

impl StubDetector {
    /// One person left of centre, one right of centre.
    ///
    /// Centres are (150, 200) and (450, 200).
    pub fn two_people() -> Self {
        Self {
            detections: vec![
                person(100.0, 100.0, 200.0, 300.0, 0.9),
                person(400.0, 100.0, 500.0, 300.0, 0.8),
            ],
            fail: false,
        }
    }

    pub fn nobody() -> Self {
        Self {
            detections: Vec::new(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            detections: Vec::new(),
            fail: true,
        }
    }
}

pub fn person(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f32) -> RawDetection {
    RawDetection {
        bbox: BoundingBox::new(x1, y1, x2, y2),
        confidence,
        class_id: 0,
    }
}

#[async_trait]
impl Detector for StubDetector {
    async fn detect(
        &self,
        _frame: &RgbImage,
        _min_confidence: f32,
        _classes: &[u32],
    ) -> Result<Vec<RawDetection>, DetectorError> {
        if self.fail {
            return Err(DetectorError::Unavailable("stub detector offline".into()));
        }
        Ok(self.detections.clone())
    }
}

// ---------------------------------------------------------------------------
// Stub capture
// ---------------------------------------------------------------------------

/// Opens in-memory sources. Videos report [`VIDEO_FRAME_COUNT`] frames.
pub struct StubSourceProvider;

#[async_trait]
impl FrameSourceProvider for StubSourceProvider {
    async fn open_device(&self) -> Result<Box<dyn FrameSource>, CaptureError> {
        Ok(Box::new(MemorySource {
            frame_count: None,
            path: None,
        }))
    }

    async fn open_video(
        &self,
        path: &Path,
    ) -> Result<(Box<dyn FrameSource>, VideoInfo), CaptureError> {
        if !path.exists() {
            return Err(CaptureError::VideoNotFound(path.display().to_string()));
        }
        let info = VideoInfo {
            frame_count: VIDEO_FRAME_COUNT,
            fps: 25.0,
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
        };
        let source = MemorySource {
            frame_count: Some(VIDEO_FRAME_COUNT),
            path: Some(path.to_path_buf()),
        };
        Ok((Box::new(source), info))
    }
}

/// Serves blank frames. A video source deletes its file on close.
pub struct MemorySource {
    frame_count: Option<u64>,
    path: Option<PathBuf>,
}

#[async_trait]
impl FrameSource for MemorySource {
    async fn next_frame(&mut self) -> Result<RgbImage, CaptureError> {
        Ok(blank_frame())
    }

    async fn frame_at(&mut self, frame_number: FrameNumber) -> Result<RgbImage, CaptureError> {
        if let Some(frame_count) = self.frame_count {
            if frame_number >= frame_count {
                return Err(CaptureError::FrameOutOfRange {
                    requested: frame_number,
                    frame_count,
                });
            }
        }
        Ok(blank_frame())
    }

    async fn close(self: Box<Self>) -> Result<(), CaptureError> {
        if let Some(path) = &self.path {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }
}

pub fn blank_frame() -> RgbImage {
    RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgb([40, 40, 40]))
}

/// A blank frame as a base64 PNG data URL.
pub fn frame_payload() -> String {
    let mut buffer = std::io::Cursor::new(Vec::new());
    blank_frame()
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(buffer.into_inner()))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Insert a user directly with [`TEST_PASSWORD`].
pub async fn create_user(pool: &PgPool, username: &str, role: &str) -> User {
    let input = CreateUser {
        username: username.to_string(),
        email: format!("{username}@test.com"),
        password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
        role: role.to_string(),
    };
    UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed")
}

/// Log in through the API and return the bearer token.
pub async fn login(app: &Router, email: &str) -> String {
    let body = serde_json::json!({ "email": email, "password": TEST_PASSWORD });
    let response = post_json(app.clone(), "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["data"]["token"].as_str().unwrap().to_string()
}

/// Create a user with `role` and return their token.
pub async fn user_token(pool: &PgPool, app: &Router, username: &str, role: &str) -> String {
    let user = create_user(pool, username, role).await;
    login(app, &user.email).await
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect the response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect the response body as UTF-8 text.
pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
