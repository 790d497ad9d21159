//! Coupon store, validation engine, and redemption accounting.
//!
//! Validation failures are values, not errors: a coupon that does not apply
//! is a normal outcome the storefront renders inline, so `validate` returns
//! a [`CouponDecision`] and reserves `Err` for infrastructure failures.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::coupon::{self, DiscountType, Entity as Coupon};
use crate::entities::coupon_usage::{self, Entity as CouponUsage};
use crate::errors::ServiceError;

/// Why a coupon does not apply to the order being previewed or finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CouponRejection {
    NotFound,
    Inactive,
    NotYetStarted,
    Expired,
    BelowMinimum,
    UsageLimitReached,
    PerUserLimitReached,
}

impl CouponRejection {
    /// Storefront-facing description of the rejection
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "Coupon code not found",
            Self::Inactive => "This coupon is no longer active",
            Self::NotYetStarted => "This coupon is not valid yet",
            Self::Expired => "This coupon has expired",
            Self::BelowMinimum => "Order total is below the coupon minimum",
            Self::UsageLimitReached => "This coupon has reached its usage limit",
            Self::PerUserLimitReached => "You have already used this coupon the maximum number of times",
        }
    }
}

/// Outcome of validating a coupon against an order total.
#[derive(Debug, Clone, PartialEq)]
pub enum CouponDecision {
    Accepted { discount_amount: Decimal },
    Rejected(CouponRejection),
}

/// Evaluates a coupon against an order total at a point in time.
///
/// `user_redemptions` is the caller's prior redemption count for this coupon,
/// or `None` when the caller is anonymous; anonymous previews skip the
/// per-user check (it is re-run with the real identity at finalization).
pub fn evaluate_coupon(
    coupon: &coupon::Model,
    order_total: Decimal,
    now: DateTime<Utc>,
    user_redemptions: Option<i32>,
) -> CouponDecision {
    use CouponDecision::Rejected;

    if !coupon.is_active {
        return Rejected(CouponRejection::Inactive);
    }
    if now < coupon.start_date {
        return Rejected(CouponRejection::NotYetStarted);
    }
    if now > coupon.end_date {
        return Rejected(CouponRejection::Expired);
    }
    if let Some(min) = coupon.min_order_value {
        if order_total < min {
            return Rejected(CouponRejection::BelowMinimum);
        }
    }
    if let Some(limit) = coupon.usage_limit {
        if coupon.usage_count >= limit {
            return Rejected(CouponRejection::UsageLimitReached);
        }
    }
    if let (Some(limit), Some(used)) = (coupon.per_user_limit, user_redemptions) {
        if used >= limit {
            return Rejected(CouponRejection::PerUserLimitReached);
        }
    }

    let raw = match coupon.discount_type {
        DiscountType::Percentage => {
            let pct = (order_total * coupon.discount_value / dec!(100)).round_dp(2);
            match coupon.max_discount_amount {
                Some(cap) => pct.min(cap),
                None => pct,
            }
        }
        DiscountType::FixedAmount => coupon.discount_value,
    };

    // Never discount more than the order total, never go negative
    let discount_amount = raw.min(order_total).max(Decimal::ZERO);

    CouponDecision::Accepted { discount_amount }
}

/// Normalizes a coupon code for storage and lookup
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCouponInput {
    #[validate(length(min = 3, max = 40, message = "Code must be between 3 and 40 characters"))]
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub per_user_limit: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateCouponInput {
    pub description: Option<String>,
    pub discount_value: Option<Decimal>,
    pub min_order_value: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct CouponService {
    db: DatabaseConnection,
}

impl CouponService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Looks a coupon up by normalized code
    #[instrument(skip(self))]
    pub async fn find_by_code(&self, code: &str) -> Result<Option<coupon::Model>, ServiceError> {
        let normalized = normalize_code(code);
        let found = Coupon::find()
            .filter(coupon::Column::Code.eq(normalized))
            .one(&self.db)
            .await?;
        Ok(found)
    }

    /// Prior redemption count of `user_id` for `coupon_id`
    pub async fn user_redemption_count(
        &self,
        coupon_id: Uuid,
        user_id: &str,
    ) -> Result<i32, ServiceError> {
        let row = CouponUsage::find_by_id((coupon_id, user_id.to_string()))
            .one(&self.db)
            .await?;
        Ok(row.map_or(0, |r| r.redemption_count))
    }

    /// Validates a coupon code against an order total for an optionally
    /// authenticated caller. Infrastructure failures surface as `Err`;
    /// everything else is a [`CouponDecision`].
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        code: &str,
        order_total: Decimal,
        user_id: Option<&str>,
    ) -> Result<CouponDecision, ServiceError> {
        let Some(coupon) = self.find_by_code(code).await? else {
            return Ok(CouponDecision::Rejected(CouponRejection::NotFound));
        };

        let user_redemptions = match user_id {
            Some(uid) => Some(self.user_redemption_count(coupon.id, uid).await?),
            None => None,
        };

        Ok(evaluate_coupon(
            &coupon,
            order_total,
            Utc::now(),
            user_redemptions,
        ))
    }

    /// Records a successful redemption: bumps the coupon's global counter and
    /// upserts the caller's ledger row, in one transaction.
    #[instrument(skip(self))]
    pub async fn record_redemption(&self, code: &str, user_id: &str) -> Result<(), ServiceError> {
        let normalized = normalize_code(code);
        let txn = self.db.begin().await?;

        let coupon = Coupon::find()
            .filter(coupon::Column::Code.eq(normalized.clone()))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", normalized)))?;

        let now = Utc::now();
        let coupon_id = coupon.id;
        let new_count = coupon.usage_count + 1;

        let mut active: coupon::ActiveModel = coupon.into();
        active.usage_count = Set(new_count);
        active.updated_at = Set(Some(now));
        active.update(&txn).await?;

        match CouponUsage::find_by_id((coupon_id, user_id.to_string()))
            .one(&txn)
            .await?
        {
            Some(row) => {
                let count = row.redemption_count + 1;
                let mut active: coupon_usage::ActiveModel = row.into();
                active.redemption_count = Set(count);
                active.last_used_at = Set(now);
                active.update(&txn).await?;
            }
            None => {
                coupon_usage::ActiveModel {
                    coupon_id: Set(coupon_id),
                    user_id: Set(user_id.to_string()),
                    redemption_count: Set(1),
                    first_used_at: Set(now),
                    last_used_at: Set(now),
                }
                .insert(&txn)
                .await?;
            }
        }

        txn.commit().await?;
        info!(coupon_id = %coupon_id, "Coupon redemption recorded");
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn create_coupon(
        &self,
        input: CreateCouponInput,
    ) -> Result<coupon::Model, ServiceError> {
        input.validate()?;

        if input.end_date < input.start_date {
            return Err(ServiceError::ValidationError(
                "end_date must not precede start_date".to_string(),
            ));
        }
        if input.discount_value <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "discount_value must be positive".to_string(),
            ));
        }
        if input.discount_type == DiscountType::Percentage && input.discount_value > dec!(100) {
            return Err(ServiceError::ValidationError(
                "percentage discount cannot exceed 100".to_string(),
            ));
        }

        let code = normalize_code(&input.code);
        let existing = Coupon::find()
            .filter(coupon::Column::Code.eq(code.clone()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Coupon {} already exists",
                code
            )));
        }

        let model = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            description: Set(input.description),
            discount_type: Set(input.discount_type),
            discount_value: Set(input.discount_value),
            min_order_value: Set(input.min_order_value),
            max_discount_amount: Set(input.max_discount_amount),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            usage_limit: Set(input.usage_limit),
            usage_count: Set(0),
            per_user_limit: Set(input.per_user_limit),
            is_active: Set(input.is_active),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        info!(code = %model.code, "Coupon created");
        Ok(model)
    }

    #[instrument(skip(self, input))]
    pub async fn update_coupon(
        &self,
        id: Uuid,
        input: UpdateCouponInput,
    ) -> Result<coupon::Model, ServiceError> {
        let existing = Coupon::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Coupon not found".to_string()))?;

        let start = input.start_date.unwrap_or(existing.start_date);
        let end = input.end_date.unwrap_or(existing.end_date);
        if end < start {
            return Err(ServiceError::ValidationError(
                "end_date must not precede start_date".to_string(),
            ));
        }

        let mut active: coupon::ActiveModel = existing.into();
        if let Some(v) = input.description {
            active.description = Set(Some(v));
        }
        if let Some(v) = input.discount_value {
            if v <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "discount_value must be positive".to_string(),
                ));
            }
            active.discount_value = Set(v);
        }
        if let Some(v) = input.min_order_value {
            active.min_order_value = Set(Some(v));
        }
        if let Some(v) = input.max_discount_amount {
            active.max_discount_amount = Set(Some(v));
        }
        if let Some(v) = input.start_date {
            active.start_date = Set(v);
        }
        if let Some(v) = input.end_date {
            active.end_date = Set(v);
        }
        if let Some(v) = input.usage_limit {
            active.usage_limit = Set(Some(v));
        }
        if let Some(v) = input.per_user_limit {
            active.per_user_limit = Set(Some(v));
        }
        if let Some(v) = input.is_active {
            if !v {
                warn!(coupon_id = %id, "Coupon deactivated");
            }
            active.is_active = Set(v);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    pub async fn list_coupons(&self) -> Result<Vec<coupon::Model>, ServiceError> {
        let coupons = Coupon::find()
            .order_by_desc(coupon::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(coupons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_coupon(discount_type: DiscountType, value: Decimal) -> coupon::Model {
        let now = Utc::now();
        coupon::Model {
            id: Uuid::new_v4(),
            code: "SAVE20".to_string(),
            description: None,
            discount_type,
            discount_value: value,
            min_order_value: None,
            max_discount_amount: None,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(30),
            usage_limit: None,
            usage_count: 0,
            per_user_limit: None,
            is_active: true,
            created_at: now,
            updated_at: None,
        }
    }

    #[test]
    fn percentage_discount_is_applied() {
        let coupon = test_coupon(DiscountType::Percentage, dec!(20));
        let decision = evaluate_coupon(&coupon, dec!(1000), Utc::now(), None);
        assert_eq!(
            decision,
            CouponDecision::Accepted {
                discount_amount: dec!(200.00)
            }
        );
    }

    #[test]
    fn percentage_discount_is_capped() {
        let mut coupon = test_coupon(DiscountType::Percentage, dec!(20));
        coupon.max_discount_amount = Some(dec!(200));
        let decision = evaluate_coupon(&coupon, dec!(2000), Utc::now(), None);
        assert_eq!(
            decision,
            CouponDecision::Accepted {
                discount_amount: dec!(200)
            }
        );
    }

    #[test]
    fn fixed_discount_never_exceeds_order_total() {
        let coupon = test_coupon(DiscountType::FixedAmount, dec!(500));
        let decision = evaluate_coupon(&coupon, dec!(300), Utc::now(), None);
        assert_eq!(
            decision,
            CouponDecision::Accepted {
                discount_amount: dec!(300)
            }
        );
    }

    #[test]
    fn inactive_coupon_is_rejected() {
        let mut coupon = test_coupon(DiscountType::Percentage, dec!(10));
        coupon.is_active = false;
        let decision = evaluate_coupon(&coupon, dec!(1000), Utc::now(), None);
        assert_eq!(decision, CouponDecision::Rejected(CouponRejection::Inactive));
    }

    #[test]
    fn window_endpoints_are_inclusive() {
        let coupon = test_coupon(DiscountType::Percentage, dec!(10));

        let at_start = evaluate_coupon(&coupon, dec!(100), coupon.start_date, None);
        assert!(matches!(at_start, CouponDecision::Accepted { .. }));

        let at_end = evaluate_coupon(&coupon, dec!(100), coupon.end_date, None);
        assert!(matches!(at_end, CouponDecision::Accepted { .. }));

        let before = evaluate_coupon(
            &coupon,
            dec!(100),
            coupon.start_date - Duration::seconds(1),
            None,
        );
        assert_eq!(
            before,
            CouponDecision::Rejected(CouponRejection::NotYetStarted)
        );

        let after = evaluate_coupon(
            &coupon,
            dec!(100),
            coupon.end_date + Duration::seconds(1),
            None,
        );
        assert_eq!(after, CouponDecision::Rejected(CouponRejection::Expired));
    }

    #[test]
    fn order_below_minimum_is_rejected() {
        let mut coupon = test_coupon(DiscountType::Percentage, dec!(10));
        coupon.min_order_value = Some(dec!(500));
        let decision = evaluate_coupon(&coupon, dec!(499.99), Utc::now(), None);
        assert_eq!(
            decision,
            CouponDecision::Rejected(CouponRejection::BelowMinimum)
        );
    }

    #[test]
    fn exhausted_global_limit_is_rejected() {
        let mut coupon = test_coupon(DiscountType::Percentage, dec!(10));
        coupon.usage_limit = Some(100);
        coupon.usage_count = 100;
        let decision = evaluate_coupon(&coupon, dec!(1000), Utc::now(), None);
        assert_eq!(
            decision,
            CouponDecision::Rejected(CouponRejection::UsageLimitReached)
        );
    }

    #[test]
    fn per_user_limit_applies_only_with_known_identity() {
        let mut coupon = test_coupon(DiscountType::Percentage, dec!(10));
        coupon.per_user_limit = Some(1);

        let authenticated = evaluate_coupon(&coupon, dec!(1000), Utc::now(), Some(1));
        assert_eq!(
            authenticated,
            CouponDecision::Rejected(CouponRejection::PerUserLimitReached)
        );

        // Anonymous preview has no redemption history to check
        let anonymous = evaluate_coupon(&coupon, dec!(1000), Utc::now(), None);
        assert!(matches!(anonymous, CouponDecision::Accepted { .. }));
    }

    #[test]
    fn discount_is_never_negative() {
        let coupon = test_coupon(DiscountType::FixedAmount, dec!(50));
        let decision = evaluate_coupon(&coupon, Decimal::ZERO, Utc::now(), None);
        assert_eq!(
            decision,
            CouponDecision::Accepted {
                discount_amount: Decimal::ZERO
            }
        );
    }

    #[test]
    fn codes_normalize_to_uppercase() {
        assert_eq!(normalize_code("  save20 "), "SAVE20");
    }
}
