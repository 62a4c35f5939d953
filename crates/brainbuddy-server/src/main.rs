mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method, header::CONTENT_TYPE};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use brainbuddy_api::router::build_router;
use brainbuddy_api::session::SessionConfig;
use brainbuddy_api::storage::Storage;
use brainbuddy_api::{AppState, AppStateInner};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brainbuddy=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!("Environment: {:?}", config.environment);

    // Init database and storage
    let db = brainbuddy_db::Database::open(&config.db_path)?;
    let storage = Storage::new(config.upload_dir.clone()).await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        storage,
        sessions: SessionConfig {
            secret_key: config.secret_key.clone(),
            lifetime: config.session_lifetime,
            secure_cookie: config.secure_cookies(),
        },
    });

    let app = build_router(state, config.max_upload_bytes)
        .layer(cors_layer(&config.cors_origins)?)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("BrainBuddy server listening on {}", addr);
    info!("Upload limit: {} bytes", config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Credentialed CORS. A `*` entry mirrors the request origin, since browsers
/// reject a literal wildcard on credentialed responses.
fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let list = origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(list)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("Could not install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
