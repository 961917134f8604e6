//! Billing: storefront checkout, vendor subscriptions, and webhook
//! reconciliation.

pub mod checkout;
mod error;
pub mod reconcile;

use sqlx::PgPool;
use tracing::{info, instrument};

use sellor_core::{SubscriptionStatus, VendorId};

pub use checkout::{PaymentIntentCreated, PaymentIntentRequest, create_payment_intent};
pub use error::BillingError;
pub use reconcile::{WebhookOutcome, process_event};

use crate::db::{RepositoryError, UserRepository, VendorRepository};
use crate::models::{SubscriptionUpdate, Vendor};
use crate::stripe::StripeClient;

async fn load_vendor(pool: &PgPool, store_id: VendorId) -> Result<Vendor, BillingError> {
    VendorRepository::new(pool)
        .get_by_id(store_id)
        .await?
        .ok_or(BillingError::Repository(RepositoryError::NotFound))
}

/// Start a Stripe Checkout session for the platform plan and return its URL.
///
/// # Errors
///
/// Returns `BillingError::PlanNotConfigured` without a platform price, or a
/// Stripe or database error.
#[instrument(skip(pool, stripe), fields(store_id = %store_id))]
pub async fn start_subscription_checkout(
    pool: &PgPool,
    stripe: &StripeClient,
    price_id: Option<&str>,
    store_id: VendorId,
) -> Result<String, BillingError> {
    let price_id = price_id.ok_or(BillingError::PlanNotConfigured)?;
    let vendor = load_vendor(pool, store_id).await?;
    let owner = UserRepository::new(pool)
        .get_by_id(vendor.user_id)
        .await?
        .ok_or(BillingError::Repository(RepositoryError::NotFound))?;

    let session = stripe
        .create_checkout_session(
            store_id,
            price_id,
            vendor.subscription.customer_id.as_deref(),
            owner.email.as_str(),
        )
        .await?;

    session.url.ok_or_else(|| BillingError::Payload {
        event_type: "checkout.session".to_owned(),
        message: "missing url".to_owned(),
    })
}

/// Open the Stripe billing portal for a vendor and return its URL.
///
/// # Errors
///
/// Returns `BillingError::NoCustomer` if the vendor was never billed.
#[instrument(skip(pool, stripe), fields(store_id = %store_id))]
pub async fn open_billing_portal(
    pool: &PgPool,
    stripe: &StripeClient,
    return_url: &str,
    store_id: VendorId,
) -> Result<String, BillingError> {
    let vendor = load_vendor(pool, store_id).await?;
    let customer_id = vendor
        .subscription
        .customer_id
        .ok_or(BillingError::NoCustomer)?;

    let session = stripe.create_portal_session(&customer_id, return_url).await?;
    Ok(session.url)
}

/// Schedule (or unschedule) cancellation of a vendor's subscription at the
/// end of the current period.
///
/// # Errors
///
/// Returns `BillingError::NoSubscription` if the vendor has none.
#[instrument(skip(pool, stripe), fields(store_id = %store_id))]
pub async fn set_cancel_at_period_end(
    pool: &PgPool,
    stripe: &StripeClient,
    store_id: VendorId,
    cancel_at_period_end: bool,
) -> Result<SubscriptionUpdate, BillingError> {
    let vendor = load_vendor(pool, store_id).await?;
    let subscription_id = vendor
        .subscription
        .subscription_id
        .ok_or(BillingError::NoSubscription)?;

    let subscription = stripe
        .update_platform_subscription(&subscription_id, cancel_at_period_end)
        .await?;

    let update = SubscriptionUpdate {
        status: Some(SubscriptionStatus::from_stripe(&subscription.status)),
        current_period_end: subscription
            .period_end()
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0)),
        cancel_at_period_end: Some(subscription.cancel_at_period_end),
        ..SubscriptionUpdate::default()
    };
    VendorRepository::new(pool)
        .apply_subscription_update(store_id, &update)
        .await?;

    info!(cancel_at_period_end, "Subscription cancellation updated");
    Ok(update)
}

/// Move a vendor to another plan. Returns the plan label now in effect.
///
/// With a price id and a live subscription, the price is swapped in Stripe
/// first. The stored plan name follows the new name, or the price id when no
/// name was given.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` for an unknown vendor, or a Stripe
/// error if the price swap fails.
#[instrument(skip(pool, stripe), fields(vendor_id = %vendor_id))]
pub async fn change_plan(
    pool: &PgPool,
    stripe: &StripeClient,
    vendor_id: VendorId,
    new_price_id: Option<&str>,
    new_plan_name: Option<&str>,
) -> Result<String, BillingError> {
    let vendor = load_vendor(pool, vendor_id).await?;

    if let (Some(price_id), Some(subscription_id)) =
        (new_price_id, vendor.subscription.subscription_id.as_deref())
    {
        stripe
            .change_subscription_price(subscription_id, price_id)
            .await?;
        info!(subscription_id, price_id, "Subscription price changed");
    }

    let label = new_plan_name
        .or(new_price_id)
        .ok_or(BillingError::PlanNotConfigured)?
        .to_owned();
    VendorRepository::new(pool)
        .set_plan_name(vendor_id, &label)
        .await?;

    Ok(label)
}
