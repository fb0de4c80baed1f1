use std::path::PathBuf;
use std::time::Duration;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// External person detector.
    pub detector: DetectorConfig,
    /// Webcam device and uploaded video handling.
    pub capture: CaptureConfig,
}

/// Settings for the HTTP inference service that finds persons in frames.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Base URL of the detector. `None` leaves the service without a
    /// detector; analysis endpoints then answer 503.
    pub url: Option<String>,
    pub timeout_secs: u64,
}

/// Settings for frame capture.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Camera device passed to ffmpeg as the input (e.g. `/dev/video0`).
    pub webcam_device: String,
    /// ffmpeg input format for the camera (e.g. `v4l2`, `avfoundation`).
    pub webcam_input_format: String,
    /// Upper bound on a single frame read.
    pub timeout_secs: u64,
    /// Directory uploaded videos are written to.
    pub upload_dir: PathBuf,
}

impl CaptureConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `DETECTOR_URL`          | unset (no detector)        |
    /// | `DETECTOR_TIMEOUT_SECS` | `10`                       |
    /// | `WEBCAM_DEVICE`         | `/dev/video0`              |
    /// | `WEBCAM_INPUT_FORMAT`   | `v4l2`                     |
    /// | `CAPTURE_TIMEOUT_SECS`  | `10`                       |
    /// | `UPLOAD_DIR`            | `uploads`                  |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_secs("REQUEST_TIMEOUT_SECS", 30);

        let detector = DetectorConfig {
            url: std::env::var("DETECTOR_URL")
                .ok()
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            timeout_secs: parse_secs("DETECTOR_TIMEOUT_SECS", 10),
        };

        let capture = CaptureConfig {
            webcam_device: std::env::var("WEBCAM_DEVICE").unwrap_or_else(|_| "/dev/video0".into()),
            webcam_input_format: std::env::var("WEBCAM_INPUT_FORMAT")
                .unwrap_or_else(|_| "v4l2".into()),
            timeout_secs: parse_secs("CAPTURE_TIMEOUT_SECS", 10),
            upload_dir: std::env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".into())
                .into(),
        };

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            detector,
            capture,
        }
    }
}

/// Parse a seconds value from `var`, falling back to `default` when unset.
///
/// # Panics
///
/// Panics if the variable is set but is not a valid `u64`.
fn parse_secs(var: &str, default: u64) -> u64 {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|_| panic!("{var} must be a valid u64")),
        Err(_) => default,
    }
}
