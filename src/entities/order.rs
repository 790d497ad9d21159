use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Order number must be between 1 and 50 characters"
    ))]
    pub order_number: String,

    /// Identity-provider user id of the buyer
    pub customer_id: String,
    pub status: String,

    /// Coupon code applied at checkout, if any (normalized uppercase)
    pub coupon_code: Option<String>,
    pub discount_amount: Option<Decimal>,
    pub subtotal: Decimal,
    pub total_amount: Decimal,
    pub currency: String,

    pub payment_status: String,
    /// Order id assigned by the payment gateway
    pub gateway_order_id: Option<String>,
    /// Payment id assigned by the gateway on capture
    pub gateway_payment_id: Option<String>,

    pub shipping_address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Order lifecycle states
pub mod status {
    pub const PENDING: &str = "pending";
    pub const PAID: &str = "paid";
    pub const CANCELLED: &str = "cancelled";
}

/// Payment states
pub mod payment_status {
    pub const PENDING: &str = "pending";
    pub const PAID: &str = "paid";
    pub const FAILED: &str = "failed";
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
