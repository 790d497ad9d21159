//! Checkout, payment confirmation, and the signed-in account's orders.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::handlers::common::{created_response, map_service_error, success_response, validate_input};
use crate::services::coupons::{CouponDecision, CouponRejection};
use crate::services::orders::{CreateOrderInput, OrderDeletion, OrderItemInput, OrderView};
use crate::AppState;

fn default_currency() -> String {
    "INR".to_string()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "Cart must contain at least one item"))]
    pub items: Vec<OrderItemInput>,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub coupon_code: Option<String>,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: OrderView,
    /// Gateway-side order id the storefront pays against
    pub gateway_order_id: String,
    /// Public key id the storefront hands to the gateway SDK
    pub gateway_key_id: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, message = "gateway_order_id is required"))]
    pub gateway_order_id: String,
    #[validate(length(min = 1, message = "gateway_payment_id is required"))]
    pub gateway_payment_id: String,
    #[validate(length(min = 1, message = "signature is required"))]
    pub signature: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub order_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteOrderResponse {
    pub success: bool,
    pub message: String,
    /// Whether the shipping collaborator accepted the cancellation
    pub cancellation_requested: bool,
}

/// Place an order from the current cart.
///
/// Validates the coupon (if any) against the caller's identity, persists the
/// order, and registers it with the payment gateway. The redemption is not
/// recorded until payment is confirmed.
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created and registered with the gateway", body = CheckoutResponse),
        (status = 400, description = "Invalid cart or coupon"),
        (status = 401, description = "Not authenticated"),
        (status = 502, description = "Payment gateway unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "checkout"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let subtotal: Decimal = payload
        .items
        .iter()
        .map(|i| i.unit_price * Decimal::from(i.quantity))
        .sum();

    let (coupon_code, discount_amount) = match &payload.coupon_code {
        Some(code) => {
            let decision = state
                .services
                .coupons
                .validate(code, subtotal, Some(&user.user_id))
                .await
                .map_err(map_service_error)?;
            match decision {
                CouponDecision::Accepted { discount_amount } => (
                    Some(crate::services::coupons::normalize_code(code)),
                    Some(discount_amount),
                ),
                CouponDecision::Rejected(rejection) => {
                    return Err(ApiError::ValidationError(rejection.message().to_string()));
                }
            }
        }
        None => (None, None),
    };

    let order = state
        .services
        .orders
        .create_order(CreateOrderInput {
            customer_id: user.user_id.clone(),
            items: payload.items,
            currency: payload.currency.clone(),
            coupon_code,
            discount_amount,
            shipping_address: payload.shipping_address,
            notes: payload.notes,
        })
        .await
        .map_err(map_service_error)?;

    let gateway_order = state
        .services
        .payments
        .create_gateway_order(order.total_amount, &order.currency, &order.order_number)
        .await
        .map_err(map_service_error)?;

    state
        .services
        .orders
        .attach_gateway_order(order.id, &gateway_order.id)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(CheckoutResponse {
        order,
        gateway_order_id: gateway_order.id,
        gateway_key_id: state.config.payment_key_id.clone(),
    }))
}

/// Confirm a payment reported by the storefront.
///
/// Verifies the gateway signature, marks the order paid, and records the
/// coupon redemption. The per-user limit is re-checked here against the
/// authenticated identity so an anonymous preview cannot bypass it.
#[utoipa::path(
    post,
    path = "/api/v1/checkout/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment confirmed", body = VerifyPaymentResponse),
        (status = 402, description = "Signature verification failed"),
        (status = 404, description = "Unknown gateway order")
    ),
    security(("bearer_auth" = [])),
    tag = "checkout"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    state
        .services
        .payments
        .verify_payment_signature(
            &payload.gateway_order_id,
            &payload.gateway_payment_id,
            &payload.signature,
        )
        .map_err(map_service_error)?;

    let order = state
        .services
        .orders
        .find_by_gateway_order(&payload.gateway_order_id)
        .await
        .map_err(map_service_error)?
        .filter(|o| o.customer_id == user.user_id)
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    if let Some(code) = &order.coupon_code {
        let decision = state
            .services
            .coupons
            .validate(code, order.subtotal, Some(&user.user_id))
            .await
            .map_err(map_service_error)?;
        match decision {
            CouponDecision::Accepted { .. } => {
                state
                    .services
                    .coupons
                    .record_redemption(code, &user.user_id)
                    .await
                    .map_err(map_service_error)?;
            }
            CouponDecision::Rejected(CouponRejection::PerUserLimitReached) => {
                // Payment already went through; honor the order but do not
                // grant the redemption a ledger entry it is not entitled to.
                warn!(order_id = %order.id, %code, "Per-user limit reached between preview and payment");
            }
            CouponDecision::Rejected(rejection) => {
                warn!(order_id = %order.id, %code, ?rejection, "Coupon no longer valid at confirmation");
            }
        }
    }

    state
        .services
        .orders
        .mark_paid(order.id, &payload.gateway_payment_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(VerifyPaymentResponse {
        success: true,
        order_id: order.id,
    }))
}

/// List the signed-in customer's orders
#[utoipa::path(
    get,
    path = "/api/v1/account/orders",
    responses(
        (status = 200, description = "Customer orders, newest first", body = [OrderView]),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "account"
)]
pub async fn list_account_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .orders
        .list_for_customer(&user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

/// Delete one of the caller's orders.
///
/// Returns 404 for orders that do not exist or belong to someone else.
/// Shipping cancellation is best-effort and reported in the response.
#[utoipa::path(
    delete,
    path = "/api/v1/account/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order deleted", body = DeleteOrderResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "account"
)]
pub async fn delete_account_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let OrderDeletion {
        cancellation_requested,
        ..
    } = state
        .services
        .orders
        .delete_order(id, &user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(DeleteOrderResponse {
        success: true,
        message: "Order deleted".to_string(),
        cancellation_requested,
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/checkout/verify", post(verify_payment))
        .route("/account/orders", get(list_account_orders))
        .route(
            "/account/orders/:id",
            axum::routing::delete(delete_account_order),
        )
}
