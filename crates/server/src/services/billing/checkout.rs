//! Storefront checkout: cart pricing, fee split, and payment intent creation.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, instrument};

use sellor_core::{
    CurrencyCode, Email, MIN_CHARGE_CENTS, OrderId, ProductId, VendorId, application_fee,
    cents_from_major,
};

use super::BillingError;
use crate::config::BillingConfig;
use crate::db::{OrderRepository, ProductRepository, RepositoryError, VendorRepository};
use crate::models::{NewOrder, NewOrderItem, StoreSettings};
use crate::stripe::{CreatePaymentIntent, Metadata, StripeClient};

/// A cart line as sent by the storefront. Prices are in major units.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub name: String,
    pub price: Decimal,
    pub quantity: i64,
}

impl CartItem {
    /// The product id, if the storefront sent a numeric one.
    fn product_id(&self) -> Option<ProductId> {
        match self.id.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .map(ProductId::new)
    }
}

/// Who is paying.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Body of `POST /api/store/{store_id}/create-payment-intent`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    #[serde(default)]
    pub cart_details: Vec<CartItem>,
    #[serde(default)]
    pub customer_details: CustomerDetails,
}

/// Response for a created payment intent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentCreated {
    pub client_secret: String,
    pub order_id: OrderId,
}

/// A cart line after validation, in cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: Option<ProductId>,
    pub title: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

/// A validated cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub subtotal_cents: i64,
}

/// How a charge is split between vendor and platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargePlan {
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub application_fee_cents: i64,
}

/// Validate cart lines and sum them.
///
/// Each line contributes `round(price * 100) * quantity` cents.
///
/// # Errors
///
/// Returns `BillingError::EmptyCart` for an empty cart and
/// `BillingError::InvalidItem` for a negative price, non-positive quantity,
/// or an amount that overflows.
pub fn price_cart(items: &[CartItem]) -> Result<PricedCart, BillingError> {
    if items.is_empty() {
        return Err(BillingError::EmptyCart);
    }

    let mut lines = Vec::with_capacity(items.len());
    let mut subtotal_cents: i64 = 0;

    for item in items {
        let invalid = || BillingError::InvalidItem(item.name.clone());

        if item.price.is_sign_negative() && !item.price.is_zero() {
            return Err(invalid());
        }
        let quantity = i32::try_from(item.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(invalid)?;
        let unit_price_cents = cents_from_major(item.price).ok_or_else(invalid)?;
        let line_total = unit_price_cents
            .checked_mul(i64::from(quantity))
            .ok_or_else(invalid)?;
        subtotal_cents = subtotal_cents.checked_add(line_total).ok_or_else(invalid)?;

        lines.push(PricedLine {
            product_id: item.product_id(),
            title: item.name.clone(),
            quantity,
            unit_price_cents,
        });
    }

    Ok(PricedCart {
        lines,
        subtotal_cents,
    })
}

/// Shipping owed on a subtotal under a store's settings.
#[must_use]
pub fn shipping_for(subtotal_cents: i64, settings: &StoreSettings) -> i64 {
    match settings.free_shipping_threshold_cents {
        Some(threshold) if subtotal_cents >= threshold => 0,
        _ => settings.default_shipping_rate_cents,
    }
}

/// Check the charge amount and compute the platform fee.
///
/// # Errors
///
/// Returns `BillingError::NonPositiveTotal` or `BillingError::BelowMinimum`
/// for totals Stripe would refuse, and `BillingError::Fee` if the fee would
/// not leave anything for the vendor.
pub fn plan_charge(
    subtotal_cents: i64,
    shipping_cents: i64,
    fee_percent: Decimal,
    currency: CurrencyCode,
) -> Result<ChargePlan, BillingError> {
    let total_cents = subtotal_cents
        .checked_add(shipping_cents)
        .ok_or(BillingError::NonPositiveTotal)?;

    if total_cents <= 0 {
        return Err(BillingError::NonPositiveTotal);
    }
    if total_cents < MIN_CHARGE_CENTS {
        return Err(BillingError::BelowMinimum {
            minimum_cents: MIN_CHARGE_CENTS,
            currency,
        });
    }

    let application_fee_cents = application_fee(total_cents, fee_percent)?;

    Ok(ChargePlan {
        subtotal_cents,
        shipping_cents,
        total_cents,
        application_fee_cents,
    })
}

/// Create a destination-charge payment intent for a storefront cart and
/// record the pending order.
///
/// # Errors
///
/// Returns a `BillingError` for an unknown store, an invalid cart, or a
/// Stripe or database failure.
#[instrument(skip(pool, stripe, billing, request), fields(store_id = %store_id))]
pub async fn create_payment_intent(
    pool: &PgPool,
    stripe: &StripeClient,
    billing: &BillingConfig,
    store_id: VendorId,
    request: &PaymentIntentRequest,
) -> Result<PaymentIntentCreated, BillingError> {
    if request.cart_details.is_empty() {
        return Err(BillingError::EmptyCart);
    }
    let customer_email = request
        .customer_details
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or(BillingError::MissingCustomerEmail)?;
    let customer_email = Email::parse(customer_email)?;
    let customer_name = request
        .customer_details
        .name
        .clone()
        .unwrap_or_default();

    let vendors = VendorRepository::new(pool);
    let vendor = vendors
        .get_by_id(store_id)
        .await?
        .filter(|v| v.is_active)
        .ok_or(BillingError::StoreNotConfigured)?;
    let destination = vendor
        .connect
        .account_id
        .clone()
        .ok_or(BillingError::StoreNotConfigured)?;

    let mut cart = price_cart(&request.cart_details)?;
    drop_foreign_product_ids(pool, store_id, &mut cart).await?;

    let settings = match vendors.get_settings(store_id).await {
        Ok(settings) => settings,
        Err(RepositoryError::NotFound) => StoreSettings::default(),
        Err(e) => return Err(e.into()),
    };
    let shipping_cents = shipping_for(cart.subtotal_cents, &settings);
    let plan = plan_charge(
        cart.subtotal_cents,
        shipping_cents,
        billing.fee_percent,
        billing.currency,
    )?;

    let metadata = intent_metadata(store_id, &customer_email, &customer_name);

    let intent = stripe
        .create_payment_intent(&CreatePaymentIntent {
            amount: plan.total_cents,
            currency: billing.currency.as_stripe_str(),
            application_fee_amount: plan.application_fee_cents,
            destination: &destination,
            metadata,
        })
        .await?;

    let order_id = OrderRepository::new(pool)
        .create(&NewOrder {
            vendor_id: store_id,
            customer_name,
            customer_email,
            shipping_address: request.customer_details.address.clone(),
            subtotal_cents: plan.subtotal_cents,
            shipping_cents: plan.shipping_cents,
            total_cents: plan.total_cents,
            application_fee_cents: plan.application_fee_cents,
            stripe_payment_intent_id: intent.id.clone(),
            items: cart
                .lines
                .into_iter()
                .map(|line| NewOrderItem {
                    product_id: line.product_id,
                    title: line.title,
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price_cents,
                })
                .collect(),
        })
        .await?;

    info!(
        payment_intent_id = %intent.id,
        order_id = %order_id,
        total_cents = plan.total_cents,
        fee_cents = plan.application_fee_cents,
        "Payment intent created"
    );

    let client_secret = intent.client_secret.ok_or_else(|| BillingError::Payload {
        event_type: "payment_intent".to_owned(),
        message: "missing client_secret".to_owned(),
    })?;

    Ok(PaymentIntentCreated {
        client_secret,
        order_id,
    })
}

/// Metadata attached to a storefront payment intent. Webhooks read
/// `store_id` back to find the order's store.
fn intent_metadata(store_id: VendorId, customer_email: &Email, customer_name: &str) -> Metadata {
    Metadata::from([
        ("store_id".to_owned(), store_id.to_string()),
        ("customer_email".to_owned(), customer_email.to_string()),
        ("customer_name".to_owned(), customer_name.to_owned()),
    ])
}

/// Clear product ids that do not belong to the store, keeping the line.
async fn drop_foreign_product_ids(
    pool: &PgPool,
    store_id: VendorId,
    cart: &mut PricedCart,
) -> Result<(), BillingError> {
    let ids: Vec<ProductId> = cart.lines.iter().filter_map(|l| l.product_id).collect();
    if ids.is_empty() {
        return Ok(());
    }

    let owned: HashSet<ProductId> = ProductRepository::new(pool)
        .get_many_for_vendor(store_id, &ids)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    for line in &mut cart.lines {
        if line.product_id.is_some_and(|id| !owned.contains(&id)) {
            line.product_id = None;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(name: &str, price: &str, quantity: i64) -> CartItem {
        CartItem {
            id: None,
            name: name.to_owned(),
            price: price.parse().unwrap(),
            quantity,
        }
    }

    #[test]
    fn test_intent_metadata_carries_store_and_customer() {
        let email = Email::parse("shopper@example.com").unwrap();
        let metadata = intent_metadata(VendorId::new(7), &email, "Ada");
        assert_eq!(metadata.get("store_id").map(String::as_str), Some("7"));
        assert_eq!(
            metadata.get("customer_email").map(String::as_str),
            Some("shopper@example.com")
        );
        assert_eq!(metadata.get("customer_name").map(String::as_str), Some("Ada"));
    }

    #[test]
    fn test_price_cart_sums_rounded_lines() {
        let cart = price_cart(&[item("Mug", "10.505", 2), item("Tea", "3.00", 1)]).unwrap();
        assert_eq!(cart.lines[0].unit_price_cents, 1051);
        assert_eq!(cart.subtotal_cents, 1051 * 2 + 300);
    }

    #[test]
    fn test_price_cart_rejects_bad_lines() {
        assert!(matches!(
            price_cart(&[item("Mug", "-1.00", 1)]),
            Err(BillingError::InvalidItem(name)) if name == "Mug"
        ));
        assert!(matches!(
            price_cart(&[item("Mug", "1.00", 0)]),
            Err(BillingError::InvalidItem(_))
        ));
        assert!(matches!(
            price_cart(&[item("Mug", "1.00", -3)]),
            Err(BillingError::InvalidItem(_))
        ));
        assert!(matches!(price_cart(&[]), Err(BillingError::EmptyCart)));
    }

    #[test]
    fn test_price_cart_allows_free_items() {
        let cart = price_cart(&[item("Sticker", "0", 3)]).unwrap();
        assert_eq!(cart.subtotal_cents, 0);
    }

    #[test]
    fn test_cart_item_product_id_accepts_number_or_string() {
        let from_number: CartItem =
            serde_json::from_str(r#"{"id": 7, "name": "A", "price": 1.5, "quantity": 1}"#).unwrap();
        let from_string: CartItem =
            serde_json::from_str(r#"{"id": "8", "name": "B", "price": "2.00", "quantity": 1}"#)
                .unwrap();
        let from_uuid: CartItem = serde_json::from_str(
            r#"{"id": "c3b1c7d2-x", "name": "C", "price": 1, "quantity": 1}"#,
        )
        .unwrap();

        assert_eq!(from_number.product_id(), Some(ProductId::new(7)));
        assert_eq!(from_string.product_id(), Some(ProductId::new(8)));
        assert_eq!(from_uuid.product_id(), None);
    }

    #[test]
    fn test_plan_charge_splits_fee() {
        let plan = plan_charge(10_000, 0, Decimal::new(20, 1), CurrencyCode::Usd).unwrap();
        assert_eq!(plan.total_cents, 10_000);
        assert_eq!(plan.application_fee_cents, 200);
    }

    #[test]
    fn test_plan_charge_rounds_fee_half_away_from_zero() {
        // 2% of 1025 is 20.5
        let plan = plan_charge(1025, 0, Decimal::new(2, 0), CurrencyCode::Usd).unwrap();
        assert_eq!(plan.application_fee_cents, 21);
    }

    #[test]
    fn test_plan_charge_rejects_small_totals() {
        assert!(matches!(
            plan_charge(0, 0, Decimal::TWO, CurrencyCode::Usd),
            Err(BillingError::NonPositiveTotal)
        ));
        assert!(matches!(
            plan_charge(49, 0, Decimal::TWO, CurrencyCode::Usd),
            Err(BillingError::BelowMinimum {
                minimum_cents: 50,
                currency: CurrencyCode::Usd
            })
        ));
        let err = plan_charge(49, 0, Decimal::TWO, CurrencyCode::Gbp).unwrap_err();
        assert_eq!(err.to_string(), "Order total must be at least 0.5 GBP.");
        assert!(plan_charge(50, 0, Decimal::TWO, CurrencyCode::Usd).is_ok());
    }

    #[test]
    fn test_plan_charge_rejects_fee_consuming_total() {
        let err = plan_charge(100, 0, Decimal::ONE_HUNDRED, CurrencyCode::Usd).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Application fee cannot be equal to or exceed order total."
        );
    }

    #[test]
    fn test_plan_charge_includes_shipping() {
        let plan = plan_charge(4_000, 500, Decimal::TWO, CurrencyCode::Usd).unwrap();
        assert_eq!(plan.total_cents, 4_500);
        assert_eq!(plan.application_fee_cents, 90);
    }

    #[test]
    fn test_shipping_for_threshold() {
        let settings = StoreSettings {
            default_shipping_rate_cents: 500,
            free_shipping_threshold_cents: Some(5_000),
            ..StoreSettings::default()
        };
        assert_eq!(shipping_for(4_999, &settings), 500);
        assert_eq!(shipping_for(5_000, &settings), 0);

        let no_threshold = StoreSettings {
            default_shipping_rate_cents: 500,
            ..StoreSettings::default()
        };
        assert_eq!(shipping_for(1_000_000, &no_threshold), 500);
    }
}
