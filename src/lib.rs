//! Storefront API: e-commerce storefront and administrative backend.
//!
//! Public surface covers catalog browsing, coupon validation, checkout with
//! payment-gateway integration, storefront content, and B2B lead capture.
//! Admin management routes are guarded by a static allow-list of
//! identity-provider user ids.

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod openapi;
pub mod services;

use axum::{middleware, response::IntoResponse, routing::get, Json, Router};
use reqwest::Client;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::auth::SessionVerifier;
use crate::cache::InMemoryCache;
use crate::config::AppConfig;
use crate::services::catalog::CatalogService;
use crate::services::content::ContentService;
use crate::services::coupons::CouponService;
use crate::services::leads::LeadService;
use crate::services::orders::OrderService;
use crate::services::payments::PaymentGatewayClient;
use crate::services::shipping::ShippingClient;
use crate::services::uploads::AssetStorageClient;

/// Service container shared by all handlers
#[derive(Clone)]
pub struct AppServices {
    pub coupons: CouponService,
    pub orders: OrderService,
    pub catalog: CatalogService,
    pub content: ContentService,
    pub leads: LeadService,
    pub payments: PaymentGatewayClient,
    pub uploads: AssetStorageClient,
}

impl AppServices {
    pub fn build(db: DatabaseConnection, config: &AppConfig) -> Self {
        let http = Client::new();
        let shipping = Arc::new(ShippingClient::from_config(http.clone(), config));
        let cache = Arc::new(InMemoryCache::new());
        let cache_ttl = Duration::from_secs(config.view_cache_ttl_secs);

        Self {
            coupons: CouponService::new(db.clone()),
            orders: OrderService::new(db.clone(), shipping, cache, cache_ttl),
            catalog: CatalogService::new(db.clone()),
            content: ContentService::new(db.clone()),
            leads: LeadService::new(db),
            payments: PaymentGatewayClient::from_config(http.clone(), config),
            uploads: AssetStorageClient::from_config(http, config),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Arc<AppConfig>) -> Self {
        let services = AppServices::build(db.clone(), &config);
        Self {
            db,
            config,
            services,
        }
    }
}

/// Liveness probe
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Service identification endpoint
pub async fn api_status() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational"
    }))
}

/// All versioned API routes, public and admin
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::coupons::public_routes())
        .merge(handlers::coupons::admin_routes())
        .merge(handlers::orders::routes())
        .merge(handlers::catalog::public_routes())
        .merge(handlers::catalog::admin_routes())
        .merge(handlers::content::public_routes())
        .merge(handlers::content::admin_routes())
        .merge(handlers::leads::public_routes())
        .merge(handlers::leads::admin_routes())
        .merge(handlers::uploads::admin_routes())
}

/// Builds the full application router with session verification and tracing.
pub fn create_app(state: AppState, verifier: Arc<SessionVerifier>) -> Router {
    Router::new()
        .merge(openapi::swagger_ui())
        .route("/health", get(health_check))
        .route("/status", get(api_status))
        .nest("/api/v1", api_v1_routes())
        .layer(middleware::from_fn_with_state(
            verifier,
            auth::session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
