//! Shared test harness: in-memory database, app router, and session tokens.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use tower::ServiceExt;

use storefront_api::auth::{Claims, SessionVerifier};
use storefront_api::config::{AdminAllowList, AppConfig};
use storefront_api::{create_app, db, AppState};

pub const SESSION_SECRET: &str = "integration_test_session_secret_0123456789";
pub const ADMIN_USER_ID: &str = "admin-user-1";
pub const PAYMENT_KEY_SECRET: &str = "payment_secret";
pub const ISSUER: &str = "storefront-identity";
pub const AUDIENCE: &str = "storefront-api";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

fn test_config(shipping_base_url: &str, payment_base_url: &str) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        log_level: "warn".to_string(),
        log_json: false,
        auto_create_schema: true,
        session_secret: SESSION_SECRET.to_string(),
        session_issuer: ISSUER.to_string(),
        session_audience: AUDIENCE.to_string(),
        admin_user_ids: ADMIN_USER_ID.to_string(),
        admin_allow_list: AdminAllowList::parse(ADMIN_USER_ID),
        payment_base_url: payment_base_url.to_string(),
        payment_key_id: "key_test".to_string(),
        payment_key_secret: PAYMENT_KEY_SECRET.to_string(),
        shipping_base_url: shipping_base_url.to_string(),
        shipping_api_token: None,
        asset_base_url: "http://127.0.0.1:9".to_string(),
        asset_api_key: "asset_key".to_string(),
        asset_api_secret: "asset_secret".to_string(),
        cors_allowed_origins: None,
        cors_allow_any_origin: false,
        cors_allow_credentials: false,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
        view_cache_ttl_secs: 60,
    }
}

async fn memory_db() -> DatabaseConnection {
    // A single pooled connection keeps every query on the same in-memory db
    let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
    opts.max_connections(1).min_connections(1);
    let conn = Database::connect(opts).await.expect("connect sqlite");
    db::create_schema_if_missing(&conn)
        .await
        .expect("create schema");
    conn
}

impl TestApp {
    pub async fn new() -> Self {
        // Port 9 is unreachable, so collaborator calls fail fast
        Self::build("http://127.0.0.1:9", "http://127.0.0.1:9").await
    }

    pub async fn with_shipping_url(shipping_base_url: &str) -> Self {
        Self::build(shipping_base_url, "http://127.0.0.1:9").await
    }

    pub async fn with_payment_url(payment_base_url: &str) -> Self {
        Self::build("http://127.0.0.1:9", payment_base_url).await
    }

    async fn build(shipping_base_url: &str, payment_base_url: &str) -> Self {
        let config = Arc::new(test_config(shipping_base_url, payment_base_url));
        let conn = memory_db().await;
        let verifier = Arc::new(SessionVerifier::from_config(&config));
        let state = AppState::new(conn, config);
        let router = create_app(state.clone(), verifier);
        Self { router, state }
    }

    pub fn token_for(&self, user_id: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            email: Some(format!("{}@example.com", user_id)),
            name: None,
            iat: now,
            exp: now + 3600,
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SESSION_SECRET.as_bytes()),
        )
        .expect("mint token")
    }

    pub fn admin_token(&self) -> String {
        self.token_for(ADMIN_USER_ID)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
        token: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };

        (status, json)
    }
}
