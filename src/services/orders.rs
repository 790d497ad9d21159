//! Order persistence and the order lifecycle coordinator.
//!
//! Deletion runs in two phases: the database removal is authoritative and
//! transactional, the shipping cancellation that follows is advisory and
//! recorded only as a diagnostic on the outcome.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::cache::{order_view_key, CacheBackend};
use crate::entities::order::{self, payment_status, status, Entity as Order};
use crate::entities::order_item::{self, Entity as OrderItem};
use crate::errors::ServiceError;
use crate::services::shipping::ShippingClient;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub customer_id: String,
    pub items: Vec<OrderItemInput>,
    pub currency: String,
    pub coupon_code: Option<String>,
    pub discount_amount: Option<Decimal>,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
}

/// Order as rendered to the storefront (and cached for the listing view)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderView {
    pub id: Uuid,
    pub order_number: String,
    pub status: String,
    pub coupon_code: Option<String>,
    pub discount_amount: Option<Decimal>,
    pub subtotal: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub payment_status: String,
    pub created_at: chrono::DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemView {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl From<order_item::Model> for OrderItemView {
    fn from(m: order_item::Model) -> Self {
        Self {
            product_id: m.product_id,
            name: m.name,
            unit_price: m.unit_price,
            quantity: m.quantity,
        }
    }
}

/// Outcome of an order deletion. `cancellation_requested` reports whether
/// the shipping collaborator accepted the cancellation; the deletion itself
/// succeeded either way.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderDeletion {
    pub order_id: Uuid,
    pub cancellation_requested: bool,
}

fn subtotal_of(items: &[OrderItemInput]) -> Decimal {
    items
        .iter()
        .map(|i| i.unit_price * Decimal::from(i.quantity))
        .sum()
}

#[derive(Clone)]
pub struct OrderService {
    db: DatabaseConnection,
    shipping: Arc<ShippingClient>,
    cache: Arc<dyn CacheBackend>,
    cache_ttl: Duration,
}

impl OrderService {
    pub fn new(
        db: DatabaseConnection,
        shipping: Arc<ShippingClient>,
        cache: Arc<dyn CacheBackend>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            db,
            shipping,
            cache,
            cache_ttl,
        }
    }

    /// Persists an order and its line items in one transaction.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_order(&self, input: CreateOrderInput) -> Result<OrderView, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "order must contain at least one item".to_string(),
            ));
        }
        if input.items.iter().any(|i| i.quantity <= 0) {
            return Err(ServiceError::ValidationError(
                "item quantity must be positive".to_string(),
            ));
        }

        let subtotal = subtotal_of(&input.items);
        let discount = input.discount_amount.unwrap_or(Decimal::ZERO);
        if discount < Decimal::ZERO || discount > subtotal {
            return Err(ServiceError::InvalidOperation(
                "discount outside valid range".to_string(),
            ));
        }
        let total = subtotal - discount;

        let order_id = Uuid::new_v4();
        let order_number = format!("ORD-{}", &order_id.simple().to_string()[..12].to_uppercase());
        let now = Utc::now();

        let txn = self.db.begin().await?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number),
            customer_id: Set(input.customer_id.clone()),
            status: Set(status::PENDING.to_string()),
            coupon_code: Set(input.coupon_code),
            discount_amount: Set(input.discount_amount),
            subtotal: Set(subtotal),
            total_amount: Set(total),
            currency: Set(input.currency),
            payment_status: Set(payment_status::PENDING.to_string()),
            gateway_order_id: Set(None),
            gateway_payment_id: Set(None),
            shipping_address: Set(input.shipping_address),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!("Failed to insert order: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let mut item_views = Vec::with_capacity(input.items.len());
        for item in input.items {
            let saved = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                name: Set(item.name),
                unit_price: Set(item.unit_price),
                quantity: Set(item.quantity),
            }
            .insert(&txn)
            .await?;
            item_views.push(OrderItemView::from(saved));
        }

        txn.commit().await?;
        self.invalidate_listing(&order_model.customer_id).await;

        info!(order_id = %order_id, "Order created");
        Ok(Self::view_of(order_model, item_views))
    }

    /// Stores the gateway-side order id once checkout has registered it.
    pub async fn attach_gateway_order(
        &self,
        order_id: Uuid,
        gateway_order_id: &str,
    ) -> Result<(), ServiceError> {
        let existing = Order::find_by_id(order_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let mut active: order::ActiveModel = existing.into();
        active.gateway_order_id = Set(Some(gateway_order_id.to_string()));
        active.updated_at = Set(Some(Utc::now()));
        active.update(&self.db).await?;
        Ok(())
    }

    pub async fn find_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        let found = Order::find()
            .filter(order::Column::GatewayOrderId.eq(gateway_order_id))
            .one(&self.db)
            .await?;
        Ok(found)
    }

    /// Marks an order paid after a verified payment confirmation.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: Uuid, payment_id: &str) -> Result<(), ServiceError> {
        let existing = Order::find_by_id(order_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if existing.payment_status == payment_status::PAID {
            // Idempotent: gateway callbacks may be delivered more than once
            return Ok(());
        }

        let customer_id = existing.customer_id.clone();
        let mut active: order::ActiveModel = existing.into();
        active.status = Set(status::PAID.to_string());
        active.payment_status = Set(payment_status::PAID.to_string());
        active.gateway_payment_id = Set(Some(payment_id.to_string()));
        active.updated_at = Set(Some(Utc::now()));
        active.update(&self.db).await?;

        self.invalidate_listing(&customer_id).await;
        info!(order_id = %order_id, "Order marked paid");
        Ok(())
    }

    /// Lists a customer's orders, newest first, through the view cache.
    #[instrument(skip(self))]
    pub async fn list_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Vec<OrderView>, ServiceError> {
        let key = order_view_key(customer_id);
        if let Ok(Some(cached)) = self.cache.get(&key).await {
            if let Ok(views) = serde_json::from_str::<Vec<OrderView>>(&cached) {
                return Ok(views);
            }
        }

        let orders = Order::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .find_with_related(OrderItem)
            .all(&self.db)
            .await?;

        let views: Vec<OrderView> = orders
            .into_iter()
            .map(|(order, items)| {
                let items = items.into_iter().map(OrderItemView::from).collect();
                Self::view_of(order, items)
            })
            .collect();

        if let Ok(serialized) = serde_json::to_string(&views) {
            if let Err(e) = self.cache.set(&key, &serialized, Some(self.cache_ttl)).await {
                warn!("Failed to cache order listing: {}", e);
            }
        }

        Ok(views)
    }

    /// Deletes an order owned by `requester_id`.
    ///
    /// The delete is a single filtered statement on (id, owner); zero rows
    /// affected collapses "no such order" and "someone else's order" into
    /// one NotFound so existence is never leaked. Shipping cancellation and
    /// cache invalidation run after commit and cannot fail the operation.
    #[instrument(skip(self))]
    pub async fn delete_order(
        &self,
        order_id: Uuid,
        requester_id: &str,
    ) -> Result<OrderDeletion, ServiceError> {
        let txn = self.db.begin().await?;

        let deleted = Order::delete_many()
            .filter(
                order::Column::Id
                    .eq(order_id)
                    .and(order::Column::CustomerId.eq(requester_id)),
            )
            .exec(&txn)
            .await?;

        if deleted.rows_affected == 0 {
            txn.rollback().await?;
            return Err(ServiceError::NotFound("Order not found".to_string()));
        }

        OrderItem::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        let cancellation_requested = match self.shipping.cancel_order(order_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%order_id, "Shipping cancellation failed, order already deleted: {}", e);
                false
            }
        };

        self.invalidate_listing(requester_id).await;

        info!(%order_id, cancellation_requested, "Order deleted");
        Ok(OrderDeletion {
            order_id,
            cancellation_requested,
        })
    }

    async fn invalidate_listing(&self, customer_id: &str) {
        if let Err(e) = self.cache.delete(&order_view_key(customer_id)).await {
            warn!("Failed to invalidate order listing cache: {}", e);
        }
    }

    fn view_of(order: order::Model, items: Vec<OrderItemView>) -> OrderView {
        OrderView {
            id: order.id,
            order_number: order.order_number,
            status: order.status,
            coupon_code: order.coupon_code,
            discount_amount: order.discount_amount,
            subtotal: order.subtotal,
            total_amount: order.total_amount,
            currency: order.currency,
            payment_status: order.payment_status,
            created_at: order.created_at,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn subtotal_sums_price_times_quantity() {
        let items = vec![
            OrderItemInput {
                product_id: Uuid::new_v4(),
                name: "Widget".into(),
                unit_price: dec!(19.99),
                quantity: 2,
            },
            OrderItemInput {
                product_id: Uuid::new_v4(),
                name: "Gadget".into(),
                unit_price: dec!(5.00),
                quantity: 3,
            },
        ];
        assert_eq!(subtotal_of(&items), dec!(54.98));
    }
}
