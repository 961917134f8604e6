//! Order models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sellor_core::{Email, OrderId, OrderStatus, PaymentStatus, ProductId, VendorId};

/// A customer order placed in a vendor's store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub vendor_id: VendorId,
    pub customer_name: String,
    pub customer_email: Email,
    pub shipping_address: Option<String>,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    /// Platform's cut, deducted before funds reach the vendor.
    pub application_fee_cents: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub stripe_payment_intent_id: Option<String>,
    pub tracking_number: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

/// A line on an order. Title and price are captured at checkout time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Option<ProductId>,
    pub title: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

impl OrderItem {
    #[must_use]
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * i64::from(self.quantity)
    }
}

/// Order data captured when a payment intent is created.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub vendor_id: VendorId,
    pub customer_name: String,
    pub customer_email: Email,
    pub shipping_address: Option<String>,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub application_fee_cents: i64,
    pub stripe_payment_intent_id: String,
    pub items: Vec<NewOrderItem>,
}

/// A line captured at checkout.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Option<ProductId>,
    pub title: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}
