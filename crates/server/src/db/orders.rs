//! Order repository.
//!
//! Orders are written once at checkout (pending, unpaid) and then advanced
//! by payment webhooks and vendor fulfillment.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sellor_core::{Email, OrderId, OrderStatus, PaymentStatus, ProductId, VendorId};

use super::RepositoryError;
use crate::models::{NewOrder, Order, OrderItem};

const ORDER_COLUMNS: &str = r"
    id, vendor_id, customer_name, customer_email, shipping_address,
    subtotal_cents, shipping_cents, total_cents, application_fee_cents,
    status, payment_status, stripe_payment_intent_id, tracking_number, created_at
";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    vendor_id: VendorId,
    customer_name: String,
    customer_email: String,
    shipping_address: Option<String>,
    subtotal_cents: i64,
    shipping_cents: i64,
    total_cents: i64,
    application_fee_cents: i64,
    status: OrderStatus,
    payment_status: PaymentStatus,
    stripe_payment_intent_id: Option<String>,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let customer_email = Email::parse(&self.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid customer email on order {}: {e}", self.id))
        })?;

        Ok(Order {
            id: self.id,
            vendor_id: self.vendor_id,
            customer_name: self.customer_name,
            customer_email,
            shipping_address: self.shipping_address,
            subtotal_cents: self.subtotal_cents,
            shipping_cents: self.shipping_cents,
            total_cents: self.total_cents,
            application_fee_cents: self.application_fee_cents,
            status: self.status,
            payment_status: self.payment_status,
            stripe_payment_intent_id: self.stripe_payment_intent_id,
            tracking_number: self.tracking_number,
            items,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: Option<ProductId>,
    title: String,
    quantity: i32,
    unit_price_cents: i64,
}

/// Paid-order totals for one vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SalesSummary {
    pub total_sales_cents: i64,
    pub total_orders: i64,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a checkout order and its lines in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails.
    pub async fn create(&self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: OrderId = sqlx::query_scalar(
            r"
            INSERT INTO sellor.order (
                vendor_id, customer_name, customer_email, shipping_address,
                subtotal_cents, shipping_cents, total_cents, application_fee_cents,
                stripe_payment_intent_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            ",
        )
        .bind(order.vendor_id)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(order.shipping_address.as_deref())
        .bind(order.subtotal_cents)
        .bind(order.shipping_cents)
        .bind(order.total_cents)
        .bind(order.application_fee_cents)
        .bind(&order.stripe_payment_intent_id)
        .fetch_one(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r"
                INSERT INTO sellor.order_item (order_id, product_id, title, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(id)
            .bind(item.product_id)
            .bind(&item.title)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Mark the order behind a payment intent as paid and processing.
    ///
    /// Returns `None` when no order carries the intent id, or when it was
    /// already paid (so a redelivered event does not resend emails).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_paid(&self, payment_intent_id: &str) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE sellor.order
            SET payment_status = 'paid',
                status = CASE WHEN status = 'pending' THEN 'processing'::sellor.order_status ELSE status END,
                updated_at = NOW()
            WHERE stripe_payment_intent_id = $1 AND payment_status <> 'paid'
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(payment_intent_id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.items_for(&[row.id]).await?.remove(&row.id).unwrap_or_default();
                Ok(Some(row.into_order(items)?))
            }
            None => Ok(None),
        }
    }

    /// Record a failed payment attempt. Paid orders are left alone.
    ///
    /// Returns whether an order was updated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_payment_failed(&self, payment_intent_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE sellor.order
            SET payment_status = 'failed', updated_at = NOW()
            WHERE stripe_payment_intent_id = $1 AND payment_status <> 'paid'
            ",
        )
        .bind(payment_intent_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List a vendor's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_vendor(&self, vendor_id: VendorId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM sellor.order
            WHERE vendor_id = $1
            ORDER BY created_at DESC
            "
        ))
        .bind(vendor_id)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect()
    }

    /// Get one order, scoped to the vendor that received it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_vendor(
        &self,
        vendor_id: VendorId,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM sellor.order WHERE vendor_id = $1 AND id = $2"
        ))
        .bind(vendor_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.items_for(&[row.id]).await?.remove(&row.id).unwrap_or_default();
                Ok(Some(row.into_order(items)?))
            }
            None => Ok(None),
        }
    }

    /// Mark a paid order as shipped with a tracking number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist for this vendor.
    /// Returns `RepositoryError::Conflict` if the order has not been paid.
    pub async fn mark_shipped(
        &self,
        vendor_id: VendorId,
        id: OrderId,
        tracking_number: &str,
    ) -> Result<Order, RepositoryError> {
        let Some(order) = self.get_for_vendor(vendor_id, id).await? else {
            return Err(RepositoryError::NotFound);
        };
        if order.payment_status != PaymentStatus::Paid {
            return Err(RepositoryError::Conflict("order has not been paid".to_owned()));
        }

        sqlx::query(
            r"
            UPDATE sellor.order
            SET status = 'shipped', tracking_number = $3, updated_at = NOW()
            WHERE vendor_id = $1 AND id = $2
            ",
        )
        .bind(vendor_id)
        .bind(id)
        .bind(tracking_number)
        .execute(self.pool)
        .await?;

        Ok(Order {
            status: OrderStatus::Shipped,
            tracking_number: Some(tracking_number.to_owned()),
            ..order
        })
    }

    /// Totals over a vendor's paid orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sales_summary(&self, vendor_id: VendorId) -> Result<SalesSummary, RepositoryError> {
        let (total_sales_cents, total_orders): (i64, i64) = sqlx::query_as(
            r"
            SELECT COALESCE(SUM(total_cents), 0)::BIGINT, COUNT(*)
            FROM sellor.order
            WHERE vendor_id = $1 AND payment_status = 'paid'
            ",
        )
        .bind(vendor_id)
        .fetch_one(self.pool)
        .await?;

        Ok(SalesSummary {
            total_sales_cents,
            total_orders,
        })
    }

    async fn items_for(
        &self,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let raw: Vec<i32> = order_ids.iter().map(OrderId::as_i32).collect();

        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_id, product_id, title, quantity, unit_price_cents
            FROM sellor.order_item
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for r in rows {
            grouped.entry(r.order_id).or_default().push(OrderItem {
                product_id: r.product_id,
                title: r.title,
                quantity: r.quantity,
                unit_price_cents: r.unit_price_cents,
            });
        }
        Ok(grouped)
    }
}
