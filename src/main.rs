use axum::http::{header, HeaderValue, Method};
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info, warn};

use storefront_api::auth::SessionVerifier;
use storefront_api::config::{init_tracing, load_config};
use storefront_api::{create_app, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(config.log_level(), config.log_json);

    info!(
        environment = %config.environment,
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let db_conn = db::establish_connection(&config).await?;
    if config.auto_create_schema {
        db::create_schema_if_missing(&db_conn).await?;
    }

    let cors = build_cors_layer(&config);
    let verifier = Arc::new(SessionVerifier::from_config(&config));
    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(db_conn, Arc::new(config));

    let app = create_app(state, verifier)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn build_cors_layer(config: &storefront_api::config::AppConfig) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [header::AUTHORIZATION, header::CONTENT_TYPE];

    match config.cors_allowed_origins.as_deref() {
        Some(raw) if !raw.trim().is_empty() => {
            let origins: Vec<HeaderValue> = raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .filter_map(|o| match o.parse::<HeaderValue>() {
                    Ok(v) => Some(v),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin: {}", o);
                        None
                    }
                })
                .collect();

            let mut layer = CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(methods)
                .allow_headers(headers);
            if config.cors_allow_credentials {
                layer = layer.allow_credentials(true);
            }
            layer
        }
        _ if config.should_allow_permissive_cors() => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers),
        _ => {
            error!("No CORS origins configured; cross-origin requests will be refused");
            CorsLayer::new()
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
