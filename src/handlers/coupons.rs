//! Coupon endpoints: public validation preview and admin management.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AdminUser, OptionalAuthUser};
use crate::entities::coupon::{self, DiscountType};
use crate::errors::ApiError;
use crate::handlers::common::{created_response, map_service_error, success_response, validate_input};
use crate::services::coupons::{CouponDecision, CouponRejection, CreateCouponInput, UpdateCouponInput};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({"code": "SAVE20", "order_total": "1499.00"}))]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1, max = 40, message = "Coupon code is required"))]
    pub code: String,
    pub order_total: Decimal,
}

/// Validation preview outcome. Rejections are part of the 200 body; HTTP
/// errors are reserved for infrastructure failures.
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateCouponResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CouponRejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<CouponDecision> for ValidateCouponResponse {
    fn from(decision: CouponDecision) -> Self {
        match decision {
            CouponDecision::Accepted { discount_amount } => Self {
                valid: true,
                discount_amount: Some(discount_amount),
                error: None,
                message: None,
            },
            CouponDecision::Rejected(rejection) => Self {
                valid: false,
                discount_amount: None,
                error: Some(rejection),
                message: Some(rejection.message().to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponResponse {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub per_user_limit: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<coupon::Model> for CouponResponse {
    fn from(m: coupon::Model) -> Self {
        Self {
            id: m.id,
            code: m.code,
            description: m.description,
            discount_type: m.discount_type,
            discount_value: m.discount_value,
            min_order_value: m.min_order_value,
            max_discount_amount: m.max_discount_amount,
            start_date: m.start_date,
            end_date: m.end_date,
            usage_limit: m.usage_limit,
            usage_count: m.usage_count,
            per_user_limit: m.per_user_limit,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

/// Validate a coupon against an order total.
///
/// Works for anonymous carts too; the per-user limit is only enforceable
/// once the caller is signed in, and is re-checked at payment time.
#[utoipa::path(
    post,
    path = "/api/v1/coupons/validate",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Validation outcome", body = ValidateCouponResponse),
        (status = 400, description = "Malformed request")
    ),
    tag = "coupons"
)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    OptionalAuthUser(user): OptionalAuthUser,
    Json(payload): Json<ValidateCouponRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let decision = state
        .services
        .coupons
        .validate(
            &payload.code,
            payload.order_total,
            user.as_ref().map(|u| u.user_id.as_str()),
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ValidateCouponResponse::from(decision)))
}

/// List all coupons (admin)
#[utoipa::path(
    get,
    path = "/api/v1/admin/coupons",
    responses(
        (status = 200, description = "All coupons", body = [CouponResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_coupons(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let coupons = state
        .services
        .coupons
        .list_coupons()
        .await
        .map_err(map_service_error)?;
    let body: Vec<CouponResponse> = coupons.into_iter().map(CouponResponse::from).collect();
    Ok(success_response(body))
}

/// Create a coupon (admin)
#[utoipa::path(
    post,
    path = "/api/v1/admin/coupons",
    request_body = CreateCouponInput,
    responses(
        (status = 201, description = "Coupon created", body = CouponResponse),
        (status = 400, description = "Invalid coupon definition"),
        (status = 409, description = "Code already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CreateCouponInput>,
) -> Result<impl IntoResponse, ApiError> {
    let coupon = state
        .services
        .coupons
        .create_coupon(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(CouponResponse::from(coupon)))
}

/// Update a coupon (admin)
#[utoipa::path(
    put,
    path = "/api/v1/admin/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon id")),
    request_body = UpdateCouponInput,
    responses(
        (status = 200, description = "Coupon updated", body = CouponResponse),
        (status = 404, description = "Coupon not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_coupon(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCouponInput>,
) -> Result<impl IntoResponse, ApiError> {
    let coupon = state
        .services
        .coupons
        .update_coupon(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(CouponResponse::from(coupon)))
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/coupons/validate", post(validate_coupon))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/coupons", get(list_coupons).post(create_coupon))
        .route("/admin/coupons/:id", put(update_coupon))
}
