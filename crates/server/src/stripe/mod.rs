//! Stripe integration: Connect payouts, platform Billing, and webhooks.
//!
//! The platform talks to Stripe's REST API directly with `reqwest`. Money
//! movement uses destination charges: a payment intent is created on the
//! platform account with `transfer_data[destination]` set to the vendor's
//! connected account and an `application_fee_amount` the platform keeps.
//!
//! Vendor subscriptions to the platform are Stripe Billing subscriptions
//! tagged with `metadata[store_id]`. Their state is mirrored onto the vendor
//! row by webhook reconciliation in [`crate::services::billing`].

pub mod client;
pub mod error;
pub mod types;
pub mod webhook;

use std::future::Future;

pub use client::StripeClient;
pub use error::{SignatureError, StripeError};
pub use types::*;

/// Anything that can look up a subscription by id.
///
/// Webhook reconciliation fetches subscriptions through this trait so tests
/// can substitute canned responses for the live API.
pub trait SubscriptionSource {
    fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> impl Future<Output = Result<Subscription, StripeError>> + Send;
}

impl SubscriptionSource for StripeClient {
    fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> impl Future<Output = Result<Subscription, StripeError>> + Send {
        Self::retrieve_subscription(self, subscription_id)
    }
}
