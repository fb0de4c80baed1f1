use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crowdcount_core::capture::{FfmpegSourceProvider, FrameSourceProvider};
use crowdcount_core::detection::Detector;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crowdcount_api::config::ServerConfig;
use crowdcount_api::detector::HttpDetector;
use crowdcount_api::router::build_app_router;
use crowdcount_api::session_store::SessionStore;
use crowdcount_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crowdcount_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = crowdcount_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    crowdcount_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    crowdcount_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Detector ---
    let detector: Option<Arc<dyn Detector>> = match &config.detector.url {
        Some(url) => {
            let detector = HttpDetector::new(
                url.clone(),
                Duration::from_secs(config.detector.timeout_secs),
            )
            .expect("Failed to build detector client");
            tracing::info!(%url, "Person detector configured");
            Some(Arc::new(detector))
        }
        None => {
            tracing::warn!("DETECTOR_URL not set, analysis endpoints will return 503");
            None
        }
    };

    // --- Capture ---
    tokio::fs::create_dir_all(&config.capture.upload_dir)
        .await
        .expect("Failed to create upload directory");
    let sources: Arc<dyn FrameSourceProvider> = Arc::new(FfmpegSourceProvider::new(
        config.capture.webcam_device.clone(),
        config.capture.webcam_input_format.clone(),
    ));
    tracing::info!(
        device = %config.capture.webcam_device,
        upload_dir = %config.capture.upload_dir.display(),
        "Capture configured"
    );

    let sessions = Arc::new(SessionStore::new());

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        detector,
        sources,
        sessions: Arc::clone(&sessions),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    let session_count = sessions.session_count().await;
    tracing::info!(session_count, "Closing remaining capture sessions");
    sessions.shutdown_all().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
