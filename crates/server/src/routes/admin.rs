//! Admin panel API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /api/admin/vendors                          - All stores with owners
//! PUT  /api/admin/vendors/{vendor_id}/activate     - Show a store
//! PUT  /api/admin/vendors/{vendor_id}/deactivate   - Hide a store
//! PUT  /api/admin/vendors/{vendor_id}/subscription - Change a store's plan
//! GET  /api/admin/subscriptions                    - Subscriptions and fees
//! GET  /api/admin/dashboard-stats                  - Platform overview
//! POST /api/admin/emails/send                      - Send a transactional email
//! ```
//!
//! All routes require an `admin` or `platform_owner` session.

use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument};

use sellor_core::{OrderId, SubscriptionStatus, VendorId};

use crate::db::stats::{Activity, ActivityKind, PlatformCounts};
use crate::db::{OrderRepository, RepositoryError, StatsRepository, UserRepository, VendorRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Order, Vendor};
use crate::services::billing;
use crate::services::email::OrderEmail;
use crate::state::AppState;

/// Entries in the dashboard activity feed.
const RECENT_ACTIVITY_LIMIT: i64 = 10;

/// Admin API routes, nested under `/api/admin`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/vendors", get(list_vendors))
        .route("/vendors/{vendor_id}/activate", put(activate_vendor))
        .route("/vendors/{vendor_id}/deactivate", put(deactivate_vendor))
        .route("/vendors/{vendor_id}/subscription", put(update_subscription))
        .route("/subscriptions", get(list_subscriptions))
        .route("/dashboard-stats", get(dashboard_stats))
        .route("/emails/send", post(send_email))
}

fn vendor_not_found(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("Vendor not found".to_owned()),
        other => other.into(),
    }
}

// =============================================================================
// Vendors
// =============================================================================

/// A row in the admin vendor list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorSummary {
    pub id: VendorId,
    pub store_name: String,
    pub email: String,
    pub subscription_status: SubscriptionStatus,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

/// `GET /api/admin/vendors`
pub async fn list_vendors(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<VendorSummary>>> {
    let vendors = VendorRepository::new(state.pool())
        .list_with_owners()
        .await?
        .into_iter()
        .map(|row| VendorSummary {
            id: row.vendor.id,
            store_name: row.vendor.store_name,
            email: row.owner_email,
            subscription_status: row.vendor.subscription.status,
            is_active: row.vendor.is_active,
            date_joined: row.vendor.created_at,
        })
        .collect();
    Ok(Json(vendors))
}

async fn set_vendor_active(
    admin: &RequireAdmin,
    state: &AppState,
    vendor_id: VendorId,
    active: bool,
) -> Result<Json<Value>> {
    VendorRepository::new(state.pool())
        .set_active(vendor_id, active)
        .await
        .map_err(vendor_not_found)?;
    state.stores().evict(vendor_id);

    let verb = if active { "activated" } else { "deactivated" };
    info!(vendor_id = %vendor_id, admin_id = %admin.0.id, "Vendor {verb}");

    Ok(Json(json!({
        "message": format!("Vendor {vendor_id} {verb} successfully"),
        "vendorId": vendor_id,
    })))
}

/// `PUT /api/admin/vendors/{vendor_id}/activate`
pub async fn activate_vendor(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(vendor_id): Path<VendorId>,
) -> Result<Json<Value>> {
    set_vendor_active(&admin, &state, vendor_id, true).await
}

/// `PUT /api/admin/vendors/{vendor_id}/deactivate`
pub async fn deactivate_vendor(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(vendor_id): Path<VendorId>,
) -> Result<Json<Value>> {
    set_vendor_active(&admin, &state, vendor_id, false).await
}

/// Body for a plan change. At least one field is required.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanChange {
    pub new_plan_id: Option<String>,
    pub new_plan_name: Option<String>,
}

impl PlanChange {
    fn plan_id(&self) -> Option<&str> {
        self.new_plan_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn plan_name(&self) -> Option<&str> {
        self.new_plan_name.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// `PUT /api/admin/vendors/{vendor_id}/subscription`
#[instrument(skip(_admin, state, change))]
pub async fn update_subscription(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(vendor_id): Path<VendorId>,
    Json(change): Json<PlanChange>,
) -> Result<Json<Value>> {
    if change.plan_id().is_none() && change.plan_name().is_none() {
        return Err(AppError::BadRequest(
            "newPlanId or newPlanName is required".to_owned(),
        ));
    }

    let plan = billing::change_plan(
        state.pool(),
        state.stripe(),
        vendor_id,
        change.plan_id(),
        change.plan_name(),
    )
    .await
    .map_err(|e| match e {
        billing::BillingError::Repository(e) => vendor_not_found(e),
        other => other.into(),
    })?;

    Ok(Json(json!({
        "message": format!("Subscription for vendor {vendor_id} updated to plan {plan} successfully"),
        "vendorId": vendor_id,
        "updatedPlan": plan,
    })))
}

// =============================================================================
// Subscriptions
// =============================================================================

/// A row in the admin subscription list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub id: Option<String>,
    pub vendor_id: VendorId,
    pub store_name: String,
    pub email: String,
    pub plan: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub status: SubscriptionStatus,
    pub next_payment_date: Option<DateTime<Utc>>,
}

/// Response for `GET /api/admin/subscriptions`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionsOverview {
    pub subscriptions: Vec<SubscriptionSummary>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_transaction_fees_collected: Decimal,
}

/// `GET /api/admin/subscriptions`
pub async fn list_subscriptions(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<SubscriptionsOverview>> {
    let stats = StatsRepository::new(state.pool());
    let price = Decimal::new(state.config().billing.plan_price_cents, 2);

    let subscriptions = stats
        .subscriptions()
        .await?
        .into_iter()
        .map(|row| SubscriptionSummary {
            id: row.subscription_id,
            vendor_id: row.vendor_id,
            store_name: row.store_name,
            email: row.email,
            plan: row.plan_name,
            price,
            status: row.status,
            next_payment_date: row.period_end,
        })
        .collect();
    let fees = stats.total_fees_collected().await?;

    Ok(Json(SubscriptionsOverview {
        subscriptions,
        total_transaction_fees_collected: Decimal::new(fees, 2),
    }))
}

// =============================================================================
// Dashboard
// =============================================================================

/// Feature adoption, as whole percentages of all vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformOverview {
    pub vendors_with_products_percentage: i64,
    pub stores_with_custom_domains_percentage: i64,
    pub vendors_using_ai_percentage: i64,
    pub active_subscriptions_percentage: i64,
}

/// One entry in the activity feed.
#[derive(Debug, Serialize)]
pub struct ActivityEntry {
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl From<Activity> for ActivityEntry {
    fn from(a: Activity) -> Self {
        let (kind, message) = match a.kind {
            ActivityKind::Signup => (
                "new_vendor",
                format!("New vendor \"{}\" signed up.", a.store_name),
            ),
            ActivityKind::AiGeneration => (
                "ai_product",
                format!(
                    "Product \"{}\" by \"{}\" created via AI.",
                    a.detail.as_deref().unwrap_or("Untitled"),
                    a.store_name
                ),
            ),
        };
        Self {
            id: format!("{kind}-{}-{}", a.vendor_id, a.at.timestamp_millis()),
            message,
            timestamp: a.at,
            kind,
        }
    }
}

/// Response for `GET /api/admin/dashboard-stats`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboardStats {
    pub total_vendors: i64,
    pub active_vendors: i64,
    pub new_signups_today: i64,
    pub ai_product_creations: i64,
    pub total_stores: i64,
    pub successful_orders: i64,
    pub recent_activity: Vec<ActivityEntry>,
    pub platform_overview: PlatformOverview,
}

/// `part` as a rounded percentage of `whole`; zero when `whole` is zero.
#[must_use]
pub fn percent(part: i64, whole: i64) -> i64 {
    if whole <= 0 {
        return 0;
    }
    (part * 100 + whole / 2) / whole
}

impl PlatformOverview {
    #[must_use]
    pub fn from_counts(c: &PlatformCounts) -> Self {
        Self {
            vendors_with_products_percentage: percent(c.vendors_with_products, c.total_vendors),
            stores_with_custom_domains_percentage: percent(
                c.vendors_with_custom_domain,
                c.total_vendors,
            ),
            vendors_using_ai_percentage: percent(c.vendors_using_ai, c.total_vendors),
            active_subscriptions_percentage: percent(c.active_subscriptions, c.total_vendors),
        }
    }
}

/// `GET /api/admin/dashboard-stats`
pub async fn dashboard_stats(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>> {
    let stats = StatsRepository::new(state.pool());
    let counts = stats.platform_counts().await?;
    let recent_activity = stats
        .recent_activity(RECENT_ACTIVITY_LIMIT)
        .await?
        .into_iter()
        .map(ActivityEntry::from)
        .collect();

    Ok(Json(AdminDashboardStats {
        total_vendors: counts.total_vendors,
        active_vendors: counts.active_vendors,
        new_signups_today: counts.new_signups_today,
        ai_product_creations: counts.ai_generations,
        total_stores: counts.total_vendors,
        successful_orders: counts.paid_orders,
        recent_activity,
        platform_overview: PlatformOverview::from_counts(&counts),
    }))
}

// =============================================================================
// Emails
// =============================================================================

/// The transactional emails an admin can (re)send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    NewOrderVendor,
    OrderConfirmationCustomer,
    ShippingConfirmationCustomer,
    WelcomeVendor,
}

impl FromStr for EmailKind {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "new_order_vendor" => Ok(Self::NewOrderVendor),
            "order_confirmation_customer" => Ok(Self::OrderConfirmationCustomer),
            "shipping_confirmation_customer" => Ok(Self::ShippingConfirmationCustomer),
            "welcome_vendor" => Ok(Self::WelcomeVendor),
            _ => Err(AppError::BadRequest("Invalid email type".to_owned())),
        }
    }
}

/// Body for `POST /api/admin/emails/send`.
#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    #[serde(rename = "type")]
    pub email_type: String,
    #[serde(default)]
    pub data: Value,
}

/// What an email is about. `orderId` is required for order emails;
/// `trackingNumber` overrides the one stored on the order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailData {
    pub vendor_id: VendorId,
    pub order_id: Option<OrderId>,
    pub tracking_number: Option<String>,
}

async fn load_order(state: &AppState, vendor_id: VendorId, data: &EmailData) -> Result<Order> {
    let order_id = data
        .order_id
        .ok_or_else(|| AppError::BadRequest("orderId is required".to_owned()))?;
    OrderRepository::new(state.pool())
        .get_for_vendor(vendor_id, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))
}

/// `POST /api/admin/emails/send`
#[instrument(skip(_admin, state, request), fields(email_type = %request.email_type))]
pub async fn send_email(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<SendEmailRequest>,
) -> Result<Json<Value>> {
    let kind: EmailKind = request.email_type.parse()?;
    let data: EmailData = serde_json::from_value(request.data)
        .map_err(|e| AppError::BadRequest(format!("Invalid email data: {e}")))?;

    let vendor: Vendor = VendorRepository::new(state.pool())
        .get_by_id(data.vendor_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Vendor not found".to_owned()))?;
    let owner = UserRepository::new(state.pool())
        .get_by_id(vendor.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Vendor owner not found".to_owned()))?;
    let vendor_email = vendor
        .contact_email
        .clone()
        .unwrap_or_else(|| owner.email.to_string());
    let currency = state.config().billing.currency;
    let emails = state.email();

    match kind {
        EmailKind::NewOrderVendor => {
            let order = load_order(&state, vendor.id, &data).await?;
            emails
                .send_new_order_vendor(
                    &vendor_email,
                    &vendor.store_name,
                    &OrderEmail::from_order(&order, currency),
                )
                .await?;
        }
        EmailKind::OrderConfirmationCustomer => {
            let order = load_order(&state, vendor.id, &data).await?;
            emails
                .send_order_confirmation(
                    order.customer_email.as_str(),
                    &vendor.store_name,
                    vendor.contact_email.as_deref(),
                    &OrderEmail::from_order(&order, currency),
                )
                .await?;
        }
        EmailKind::ShippingConfirmationCustomer => {
            let order = load_order(&state, vendor.id, &data).await?;
            let tracking_number = data
                .tracking_number
                .as_deref()
                .or(order.tracking_number.as_deref())
                .ok_or_else(|| AppError::BadRequest("trackingNumber is required".to_owned()))?;
            emails
                .send_shipping_confirmation(
                    order.customer_email.as_str(),
                    &vendor.store_name,
                    &OrderEmail::from_order(&order, currency),
                    tracking_number,
                )
                .await?;
        }
        EmailKind::WelcomeVendor => {
            let name = owner.name.as_deref().unwrap_or(&vendor.store_name);
            emails
                .send_welcome_vendor(owner.email.as_str(), name, &vendor.store_name, &vendor.slug)
                .await?;
        }
    }

    info!(vendor_id = %vendor.id, "Admin email sent");
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_email_kind_parsing() {
        assert_eq!(
            "welcome_vendor".parse::<EmailKind>().unwrap(),
            EmailKind::WelcomeVendor
        );
        assert_eq!(
            "shipping_confirmation_customer".parse::<EmailKind>().unwrap(),
            EmailKind::ShippingConfirmationCustomer
        );
        let err = "newsletter".parse::<EmailKind>().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Invalid email type"));
    }

    #[test]
    fn test_percent_rounds_and_handles_zero() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(5, 5), 100);
    }

    #[test]
    fn test_platform_overview() {
        let counts = PlatformCounts {
            total_vendors: 4,
            vendors_with_products: 3,
            vendors_with_custom_domain: 1,
            vendors_using_ai: 2,
            active_subscriptions: 4,
            ..PlatformCounts::default()
        };
        assert_eq!(
            PlatformOverview::from_counts(&counts),
            PlatformOverview {
                vendors_with_products_percentage: 75,
                stores_with_custom_domains_percentage: 25,
                vendors_using_ai_percentage: 50,
                active_subscriptions_percentage: 100,
            }
        );
    }

    #[test]
    fn test_activity_messages() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let signup = ActivityEntry::from(Activity {
            kind: ActivityKind::Signup,
            vendor_id: VendorId::new(1),
            store_name: "Alpha".to_owned(),
            detail: None,
            at,
        });
        assert_eq!(signup.kind, "new_vendor");
        assert_eq!(signup.message, "New vendor \"Alpha\" signed up.");

        let generated = ActivityEntry::from(Activity {
            kind: ActivityKind::AiGeneration,
            vendor_id: VendorId::new(1),
            store_name: "Alpha".to_owned(),
            detail: Some("Super Gadget".to_owned()),
            at,
        });
        assert_eq!(
            generated.message,
            "Product \"Super Gadget\" by \"Alpha\" created via AI."
        );
    }

    #[test]
    fn test_plan_change_blank_fields_are_absent() {
        let change: PlanChange =
            serde_json::from_str(r#"{"newPlanId":"  ","newPlanName":"Growth"}"#).unwrap();
        assert_eq!(change.plan_id(), None);
        assert_eq!(change.plan_name(), Some("Growth"));
    }
}
