//! Billing error types.

use thiserror::Error;

use rust_decimal::Decimal;

use sellor_core::{CurrencyCode, FeeError};

use crate::db::RepositoryError;
use crate::stripe::StripeError;

/// Errors from checkout, subscription management, and webhook reconciliation.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Store is unknown, inactive, or has no connected account.
    #[error("Vendor Stripe account not configured.")]
    StoreNotConfigured,

    /// Checkout request had no items.
    #[error("Cart details are missing or empty.")]
    EmptyCart,

    /// Checkout request had no customer email.
    #[error("Customer details (especially email) are required.")]
    MissingCustomerEmail,

    /// Customer email was present but malformed.
    #[error("Invalid customer email: {0}")]
    InvalidCustomerEmail(#[from] sellor_core::EmailError),

    /// A cart line had a negative price or non-positive quantity.
    #[error("Invalid price or quantity for item: {0}")]
    InvalidItem(String),

    /// Cart summed to zero or less.
    #[error("Order total must be greater than zero.")]
    NonPositiveTotal,

    /// Cart summed to less than the processor's minimum charge.
    #[error("Order total must be at least {} {currency}.", major_units(.minimum_cents))]
    BelowMinimum {
        minimum_cents: i64,
        currency: CurrencyCode,
    },

    /// Fee could not be applied to the total.
    #[error("{}", fee_message(.0))]
    Fee(FeeError),

    /// Vendor has no platform subscription to act on.
    #[error("No active subscription found for this store.")]
    NoSubscription,

    /// Vendor has never been billed, so there is no customer to manage.
    #[error("No billing account found for this store.")]
    NoCustomer,

    /// Platform subscription price is not configured.
    #[error("Subscription plan is not configured.")]
    PlanNotConfigured,

    /// Webhook event object did not match its declared type.
    #[error("malformed {event_type} payload: {message}")]
    Payload { event_type: String, message: String },

    /// Stripe API error.
    #[error("stripe error: {0}")]
    Stripe(#[from] StripeError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<FeeError> for BillingError {
    fn from(e: FeeError) -> Self {
        Self::Fee(e)
    }
}

fn fee_message(e: &FeeError) -> String {
    match e {
        FeeError::ExceedsTotal { .. } => {
            "Application fee cannot be equal to or exceed order total.".to_owned()
        }
        other => other.to_string(),
    }
}

/// `50` cents as `0.5`.
#[allow(clippy::trivially_copy_pass_by_ref)]
fn major_units(cents: &i64) -> Decimal {
    Decimal::new(*cents, 2).normalize()
}
