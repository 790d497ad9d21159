mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rust_decimal_macros::dec;
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{TestApp, PAYMENT_KEY_SECRET};
use storefront_api::entities::coupon::DiscountType;
use storefront_api::services::coupons::CreateCouponInput;

fn sign_payment(gateway_order_id: &str, payment_id: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(PAYMENT_KEY_SECRET.as_bytes()).unwrap();
    mac.update(format!("{}|{}", gateway_order_id, payment_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

async fn gateway_stub() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gw_order_123",
            "amount": 90000,
            "currency": "INR"
        })))
        .mount(&server)
        .await;
    server
}

fn cart() -> serde_json::Value {
    json!({
        "items": [
            {"product_id": Uuid::new_v4(), "name": "Almond Butter", "unit_price": "450", "quantity": 2}
        ]
    })
}

#[tokio::test]
async fn checkout_requires_authentication() {
    let app = TestApp::new().await;
    let (status, _) = app
        .request(Method::POST, "/api/v1/checkout", Some(cart()), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn checkout_registers_order_with_gateway() {
    let gateway = gateway_stub().await;
    let app = TestApp::with_payment_url(&gateway.uri()).await;
    let token = app.token_for("user-1");

    let (status, body) = app
        .request(Method::POST, "/api/v1/checkout", Some(cart()), Some(&token))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["gateway_order_id"], json!("gw_order_123"));
    assert_eq!(body["gateway_key_id"], json!("key_test"));
    assert_eq!(body["order"]["subtotal"], json!("900"));
    assert_eq!(body["order"]["total_amount"], json!("900"));
    assert_eq!(body["order"]["payment_status"], json!("pending"));
}

#[tokio::test]
async fn checkout_applies_a_valid_coupon() {
    let gateway = gateway_stub().await;
    let app = TestApp::with_payment_url(&gateway.uri()).await;
    let now = Utc::now();
    app.state
        .services
        .coupons
        .create_coupon(CreateCouponInput {
            code: "FLAT100".to_string(),
            description: None,
            discount_type: DiscountType::FixedAmount,
            discount_value: dec!(100),
            min_order_value: None,
            max_discount_amount: None,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(7),
            usage_limit: None,
            per_user_limit: None,
            is_active: true,
        })
        .await
        .unwrap();

    let token = app.token_for("user-1");
    let mut payload = cart();
    payload["coupon_code"] = json!("flat100");

    let (status, body) = app
        .request(Method::POST, "/api/v1/checkout", Some(payload), Some(&token))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order"]["coupon_code"], json!("FLAT100"));
    assert_eq!(body["order"]["discount_amount"], json!("100"));
    assert_eq!(body["order"]["total_amount"], json!("800"));
}

#[tokio::test]
async fn checkout_rejects_an_invalid_coupon() {
    let gateway = gateway_stub().await;
    let app = TestApp::with_payment_url(&gateway.uri()).await;
    let token = app.token_for("user-1");
    let mut payload = cart();
    payload["coupon_code"] = json!("DOES_NOT_EXIST");

    let (status, _) = app
        .request(Method::POST, "/api/v1/checkout", Some(payload), Some(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_fails_when_gateway_is_down() {
    let app = TestApp::new().await;
    let token = app.token_for("user-1");

    let (status, _) = app
        .request(Method::POST, "/api/v1/checkout", Some(cart()), Some(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn verified_payment_marks_order_paid_and_records_redemption() {
    let gateway = gateway_stub().await;
    let app = TestApp::with_payment_url(&gateway.uri()).await;
    let now = Utc::now();
    app.state
        .services
        .coupons
        .create_coupon(CreateCouponInput {
            code: "FLAT100".to_string(),
            description: None,
            discount_type: DiscountType::FixedAmount,
            discount_value: dec!(100),
            min_order_value: None,
            max_discount_amount: None,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(7),
            usage_limit: None,
            per_user_limit: Some(1),
            is_active: true,
        })
        .await
        .unwrap();

    let token = app.token_for("user-1");
    let mut payload = cart();
    payload["coupon_code"] = json!("FLAT100");
    let (status, _) = app
        .request(Method::POST, "/api/v1/checkout", Some(payload), Some(&token))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let signature = sign_payment("gw_order_123", "pay_789");
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/checkout/verify",
            Some(json!({
                "gateway_order_id": "gw_order_123",
                "gateway_payment_id": "pay_789",
                "signature": signature
            })),
            Some(&token),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let (_, orders) = app
        .request(Method::GET, "/api/v1/account/orders", None, Some(&token))
        .await;
    assert_eq!(orders[0]["payment_status"], json!("paid"));

    let coupon = app
        .state
        .services
        .coupons
        .find_by_code("FLAT100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(coupon.usage_count, 1);
}

#[tokio::test]
async fn tampered_signature_is_refused() {
    let gateway = gateway_stub().await;
    let app = TestApp::with_payment_url(&gateway.uri()).await;
    let token = app.token_for("user-1");

    let (status, _) = app
        .request(Method::POST, "/api/v1/checkout", Some(cart()), Some(&token))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let signature = sign_payment("gw_order_123", "some_other_payment");
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/checkout/verify",
            Some(json!({
                "gateway_order_id": "gw_order_123",
                "gateway_payment_id": "pay_789",
                "signature": signature
            })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn another_user_cannot_confirm_someone_elses_order() {
    let gateway = gateway_stub().await;
    let app = TestApp::with_payment_url(&gateway.uri()).await;
    let owner = app.token_for("user-1");

    let (status, _) = app
        .request(Method::POST, "/api/v1/checkout", Some(cart()), Some(&owner))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let intruder = app.token_for("user-2");
    let signature = sign_payment("gw_order_123", "pay_789");
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/checkout/verify",
            Some(json!({
                "gateway_order_id": "gw_order_123",
                "gateway_payment_id": "pay_789",
                "signature": signature
            })),
            Some(&intruder),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
