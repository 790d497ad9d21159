mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use serde_json::json;

use common::TestApp;
use storefront_api::entities::coupon::DiscountType;
use storefront_api::services::coupons::CreateCouponInput;

fn coupon_input(code: &str) -> CreateCouponInput {
    let now = Utc::now();
    CreateCouponInput {
        code: code.to_string(),
        description: None,
        discount_type: DiscountType::Percentage,
        discount_value: dec!(20),
        min_order_value: Some(dec!(500)),
        max_discount_amount: Some(dec!(200)),
        start_date: now - Duration::days(1),
        end_date: now + Duration::days(30),
        usage_limit: Some(100),
        per_user_limit: Some(1),
        is_active: true,
    }
}

#[tokio::test]
async fn anonymous_preview_accepts_valid_coupon() {
    let app = TestApp::new().await;
    app.state
        .services
        .coupons
        .create_coupon(coupon_input("SAVE20"))
        .await
        .unwrap();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({"code": "save20", "order_total": "1000"})),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(true));
    assert_eq!(body["discount_amount"], json!("200.00"));
}

#[tokio::test]
async fn unknown_code_is_a_rejection_not_an_error() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({"code": "NOPE", "order_total": "1000"})),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["error"], json!("not_found"));
}

#[tokio::test]
async fn order_below_minimum_is_rejected() {
    let app = TestApp::new().await;
    app.state
        .services
        .coupons
        .create_coupon(coupon_input("SAVE20"))
        .await
        .unwrap();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({"code": "SAVE20", "order_total": "499.99"})),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["error"], json!("below_minimum"));
}

#[tokio::test]
async fn per_user_limit_binds_authenticated_callers_only() {
    let app = TestApp::new().await;
    app.state
        .services
        .coupons
        .create_coupon(coupon_input("SAVE20"))
        .await
        .unwrap();
    app.state
        .services
        .coupons
        .record_redemption("SAVE20", "user-7")
        .await
        .unwrap();

    let token = app.token_for("user-7");
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({"code": "SAVE20", "order_total": "1000"})),
            Some(&token),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["error"], json!("per_user_limit_reached"));

    // The same code still previews as valid for an anonymous cart
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({"code": "SAVE20", "order_total": "1000"})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(true));
}

#[tokio::test]
async fn redemption_bumps_global_and_per_user_counters() {
    let app = TestApp::new().await;
    let created = app
        .state
        .services
        .coupons
        .create_coupon(coupon_input("SAVE20"))
        .await
        .unwrap();

    app.state
        .services
        .coupons
        .record_redemption("SAVE20", "user-1")
        .await
        .unwrap();
    app.state
        .services
        .coupons
        .record_redemption("SAVE20", "user-2")
        .await
        .unwrap();

    let reloaded = app
        .state
        .services
        .coupons
        .find_by_code("SAVE20")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.usage_count, 2);

    let per_user = app
        .state
        .services
        .coupons
        .user_redemption_count(created.id, "user-1")
        .await
        .unwrap();
    assert_eq!(per_user, 1);
}

#[tokio::test]
async fn admin_coupon_management_requires_allow_listed_user() {
    let app = TestApp::new().await;
    let now = Utc::now();
    let payload = json!({
        "code": "WELCOME10",
        "discount_type": "percentage",
        "discount_value": "10",
        "start_date": now.to_rfc3339(),
        "end_date": (now + Duration::days(7)).to_rfc3339()
    });

    let (status, _) = app
        .request(Method::POST, "/api/v1/admin/coupons", Some(payload.clone()), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let visitor = app.token_for("just-a-customer");
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/admin/coupons",
            Some(payload.clone()),
            Some(&visitor),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.admin_token();
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/admin/coupons",
            Some(payload.clone()),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["code"], json!("WELCOME10"));

    // Duplicate code conflicts
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/admin/coupons",
            Some(payload),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_window_is_rejected_at_creation() {
    let app = TestApp::new().await;
    let now = Utc::now();
    let admin = app.admin_token();

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/admin/coupons",
            Some(json!({
                "code": "BACKWARDS",
                "discount_type": "fixed_amount",
                "discount_value": "50",
                "start_date": now.to_rfc3339(),
                "end_date": (now - Duration::days(1)).to_rfc3339()
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
