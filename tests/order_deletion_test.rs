mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::TestApp;
use storefront_api::services::orders::{CreateOrderInput, OrderItemInput, OrderView};

async fn seed_order(app: &TestApp, customer_id: &str) -> OrderView {
    app.state
        .services
        .orders
        .create_order(CreateOrderInput {
            customer_id: customer_id.to_string(),
            items: vec![OrderItemInput {
                product_id: Uuid::new_v4(),
                name: "Almond Butter".to_string(),
                unit_price: dec!(450),
                quantity: 2,
            }],
            currency: "INR".to_string(),
            coupon_code: None,
            discount_amount: None,
            shipping_address: None,
            notes: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn owner_can_delete_order_even_when_shipping_is_down() {
    let app = TestApp::new().await;
    let order = seed_order(&app, "user-1").await;
    let token = app.token_for("user-1");

    let (status, body) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/account/orders/{}", order.id),
            None,
            Some(&token),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    // Shipping collaborator is unreachable in this setup
    assert_eq!(body["cancellation_requested"], json!(false));

    // The order really is gone
    let (status, body) = app
        .request(Method::GET, "/api/v1/account/orders", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn successful_shipping_cancellation_is_reported() {
    let shipping = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/orders/[0-9a-f-]+/cancel$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&shipping)
        .await;

    let app = TestApp::with_shipping_url(&shipping.uri()).await;
    let order = seed_order(&app, "user-1").await;
    let token = app.token_for("user-1");

    let (status, body) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/account/orders/{}", order.id),
            None,
            Some(&token),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancellation_requested"], json!(true));
}

#[tokio::test]
async fn foreign_orders_delete_as_not_found() {
    let app = TestApp::new().await;
    let order = seed_order(&app, "user-1").await;

    let other = app.token_for("user-2");
    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/account/orders/{}", order.id),
            None,
            Some(&other),
        )
        .await;
    // Indistinguishable from a nonexistent order
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The owner still sees it
    let owner = app.token_for("user-1");
    let (status, body) = app
        .request(Method::GET, "/api/v1/account/orders", None, Some(&owner))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn nonexistent_order_deletes_as_not_found() {
    let app = TestApp::new().await;
    let token = app.token_for("user-1");

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/account/orders/{}", Uuid::new_v4()),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deletion_requires_authentication() {
    let app = TestApp::new().await;
    let order = seed_order(&app, "user-1").await;

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/account/orders/{}", order.id),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cached_listing_is_invalidated_by_deletion() {
    let app = TestApp::new().await;
    let first = seed_order(&app, "user-1").await;
    let second = seed_order(&app, "user-1").await;
    let token = app.token_for("user-1");

    // Prime the cache
    let (_, body) = app
        .request(Method::GET, "/api/v1/account/orders", None, Some(&token))
        .await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/account/orders/{}", first.id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .request(Method::GET, "/api/v1/account/orders", None, Some(&token))
        .await;
    let remaining = body.as_array().cloned().unwrap_or_default();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["id"], json!(second.id.to_string()));
}
