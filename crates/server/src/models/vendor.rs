//! Vendor (store) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sellor_core::{StoreSlug, SubscriptionStatus, UserId, VendorId};

/// A vendor and the storefront it owns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: VendorId,
    pub user_id: UserId,
    pub store_name: String,
    pub slug: StoreSlug,
    pub contact_email: Option<String>,
    pub logo_url: Option<String>,
    pub accent_color: Option<String>,
    pub description: Option<String>,
    pub custom_domain: Option<String>,
    pub is_custom_domain_verified: bool,
    /// Admin activation flag; inactive stores are hidden from the public.
    pub is_active: bool,
    pub connect: ConnectState,
    pub subscription: SubscriptionState,
    pub created_at: DateTime<Utc>,
}

/// Stripe Connect onboarding state for a vendor's payout account.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectState {
    pub account_id: Option<String>,
    pub charges_enabled: bool,
    pub details_submitted: bool,
    pub payouts_enabled: bool,
}

impl ConnectState {
    /// Onboarding is complete once details are in and charges are enabled.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.details_submitted && self.charges_enabled
    }
}

/// The vendor's platform subscription, cached from Stripe Billing webhooks.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub plan_name: String,
}

/// Per-store checkout and policy settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSettings {
    pub default_shipping_rate_cents: i64,
    pub free_shipping_threshold_cents: Option<i64>,
    pub refund_policy: String,
    pub privacy_policy: String,
    pub terms_of_service: String,
}

/// A partial write to a vendor's cached subscription state.
///
/// `None` fields leave the stored value untouched, so applying the same
/// update twice is a no-op the second time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub status: Option<SubscriptionStatus>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: Option<bool>,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
}

impl SubscriptionUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.current_period_end.is_none()
            && self.cancel_at_period_end.is_none()
            && self.subscription_id.is_none()
            && self.customer_id.is_none()
    }
}

/// Editable storefront profile fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub store_name: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub accent_color: Option<String>,
    pub contact_email: Option<String>,
    pub custom_domain: Option<String>,
}
