//! Stripe webhook reconciliation.
//!
//! Processing an event happens in two steps. [`plan`] turns the event into a
//! [`Reconciliation`], fetching the subscription from Stripe only when the
//! event alone does not say which store it belongs to. [`apply`] performs the
//! resulting writes. Subscription writes are partial (`COALESCE`) so a
//! replayed event leaves the row as it was, and the latest event wins.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use sellor_core::{CurrencyCode, SubscriptionStatus, VendorId};

use super::BillingError;
use crate::db::{OrderRepository, StripeEventRepository, UserRepository, VendorRepository};
use crate::models::{Order, SubscriptionUpdate};
use crate::services::email::{EmailService, OrderEmail, log_email_failure};
use crate::stripe::{
    Account, CheckoutSession, Event, Invoice, Metadata, PaymentIntent, Subscription,
    SubscriptionSource,
};

/// Metadata keys that carry the store id, newest first.
const STORE_ID_KEYS: [&str; 2] = ["store_id", "vendor_id"];

/// How the store an event belongs to will be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreRef {
    /// Named directly by metadata.
    Known(VendorId),
    /// Only the subscription id is known; look the store up locally.
    BySubscription(String),
}

/// The writes an event calls for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Subscription {
        store: StoreRef,
        update: SubscriptionUpdate,
    },
    OrderPaid {
        payment_intent_id: String,
    },
    OrderPaymentFailed {
        payment_intent_id: String,
    },
    ConnectAccount {
        account_id: String,
        charges_enabled: bool,
        details_submitted: bool,
        payouts_enabled: bool,
    },
    Ignored {
        reason: String,
    },
}

impl Reconciliation {
    fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored {
            reason: reason.into(),
        }
    }
}

/// Result of processing one webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event id was already in the ledger.
    Duplicate,
    /// The event changed platform state.
    Applied,
    /// The event was acknowledged without changes.
    Ignored,
}

/// Read the store id from the first metadata map that has one.
#[must_use]
pub fn store_from_metadata<'m>(sources: impl IntoIterator<Item = &'m Metadata>) -> Option<VendorId> {
    sources.into_iter().find_map(|metadata| {
        STORE_ID_KEYS
            .iter()
            .filter_map(|key| metadata.get(*key))
            .find_map(|value| value.parse().ok())
    })
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

fn object<T: DeserializeOwned>(event: &Event) -> Result<T, BillingError> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| BillingError::Payload {
        event_type: event.event_type.clone(),
        message: e.to_string(),
    })
}

/// Fetch a subscription, logging and discarding failures.
async fn fetch_subscription<S>(stripe: &S, subscription_id: &str) -> Option<Subscription>
where
    S: SubscriptionSource + Sync,
{
    match stripe.retrieve_subscription(subscription_id).await {
        Ok(subscription) => Some(subscription),
        Err(e) => {
            warn!(
                subscription_id,
                error = %e,
                "Could not re-fetch subscription, falling back to local lookup"
            );
            None
        }
    }
}

/// Decide what an event should change.
///
/// # Errors
///
/// Returns `BillingError::Payload` if the event object does not match its
/// declared type.
#[instrument(skip_all, fields(event_id = %event.id, event_type = %event.event_type))]
pub async fn plan<S>(event: &Event, stripe: &S) -> Result<Reconciliation, BillingError>
where
    S: SubscriptionSource + Sync,
{
    let reconciliation = match event.event_type.as_str() {
        "customer.subscription.created" | "customer.subscription.updated" => {
            let subscription: Subscription = object(event)?;
            Reconciliation::Subscription {
                store: subscription_store(&subscription),
                update: SubscriptionUpdate {
                    status: Some(SubscriptionStatus::from_stripe(&subscription.status)),
                    current_period_end: subscription.period_end().and_then(timestamp),
                    cancel_at_period_end: Some(subscription.cancel_at_period_end),
                    subscription_id: Some(subscription.id.clone()),
                    customer_id: Some(subscription.customer.id().to_owned()),
                },
            }
        }
        "customer.subscription.deleted" => {
            let subscription: Subscription = object(event)?;
            Reconciliation::Subscription {
                store: subscription_store(&subscription),
                update: SubscriptionUpdate {
                    status: Some(SubscriptionStatus::Canceled),
                    ..SubscriptionUpdate::default()
                },
            }
        }
        "invoice.payment_succeeded" | "invoice.paid" => {
            let invoice: Invoice = object(event)?;
            plan_invoice(&invoice, SubscriptionStatus::Active, stripe).await
        }
        "invoice.payment_failed" => {
            let invoice: Invoice = object(event)?;
            plan_invoice(&invoice, SubscriptionStatus::PastDue, stripe).await
        }
        "payment_intent.succeeded" => {
            let intent: PaymentIntent = object(event)?;
            Reconciliation::OrderPaid {
                payment_intent_id: intent.id,
            }
        }
        "payment_intent.payment_failed" => {
            let intent: PaymentIntent = object(event)?;
            Reconciliation::OrderPaymentFailed {
                payment_intent_id: intent.id,
            }
        }
        "checkout.session.completed" => {
            let session: CheckoutSession = object(event)?;
            plan_checkout_session(&session, stripe).await
        }
        "account.updated" => {
            let account: Account = object(event)?;
            Reconciliation::ConnectAccount {
                account_id: account.id,
                charges_enabled: account.charges_enabled,
                details_submitted: account.details_submitted,
                payouts_enabled: account.payouts_enabled,
            }
        }
        other => Reconciliation::ignored(format!("unhandled event type {other}")),
    };

    Ok(reconciliation)
}

fn subscription_store(subscription: &Subscription) -> StoreRef {
    store_from_metadata([&subscription.metadata])
        .map_or_else(|| StoreRef::BySubscription(subscription.id.clone()), StoreRef::Known)
}

async fn plan_invoice<S>(invoice: &Invoice, status: SubscriptionStatus, stripe: &S) -> Reconciliation
where
    S: SubscriptionSource + Sync,
{
    let line_metadata = invoice
        .lines
        .as_ref()
        .and_then(|lines| lines.data.first())
        .map(|line| &line.metadata);
    let details_metadata = invoice.subscription_details.as_ref().map(|d| &d.metadata);

    let mut store = store_from_metadata(
        details_metadata
            .into_iter()
            .chain([&invoice.metadata])
            .chain(line_metadata),
    );
    let mut period_end = if status == SubscriptionStatus::Active {
        invoice.first_line_period_end()
    } else {
        None
    };

    let Some(subscription_id) = invoice.subscription.clone() else {
        return match store {
            Some(_) => Reconciliation::ignored(format!(
                "invoice {} is not for a subscription",
                invoice.id
            )),
            None => Reconciliation::ignored(format!("invoice {} has no store", invoice.id)),
        };
    };

    let needs_period = status == SubscriptionStatus::Active && period_end.is_none();
    if (store.is_none() || needs_period)
        && let Some(subscription) = fetch_subscription(stripe, &subscription_id).await
    {
        store = store.or_else(|| store_from_metadata([&subscription.metadata]));
        if needs_period {
            period_end = subscription.period_end();
        }
    }

    Reconciliation::Subscription {
        store: store.map_or_else(
            || StoreRef::BySubscription(subscription_id.clone()),
            StoreRef::Known,
        ),
        update: SubscriptionUpdate {
            status: Some(status),
            current_period_end: period_end.and_then(timestamp),
            cancel_at_period_end: None,
            subscription_id: Some(subscription_id),
            customer_id: invoice.customer.clone(),
        },
    }
}

async fn plan_checkout_session<S>(session: &CheckoutSession, stripe: &S) -> Reconciliation
where
    S: SubscriptionSource + Sync,
{
    if session.mode.as_deref() != Some("subscription") {
        return Reconciliation::ignored(format!(
            "checkout session {} is not a subscription",
            session.id
        ));
    }

    let mut store = store_from_metadata([&session.metadata]).or_else(|| {
        session
            .client_reference_id
            .as_deref()
            .and_then(|id| id.parse().ok())
    });

    let Some(subscription_id) = session.subscription.clone() else {
        return Reconciliation::ignored(format!(
            "checkout session {} has no subscription",
            session.id
        ));
    };

    if store.is_none()
        && let Some(subscription) = fetch_subscription(stripe, &subscription_id).await
    {
        store = store_from_metadata([&subscription.metadata]);
    }

    Reconciliation::Subscription {
        store: store.map_or_else(
            || StoreRef::BySubscription(subscription_id.clone()),
            StoreRef::Known,
        ),
        update: SubscriptionUpdate {
            subscription_id: Some(subscription_id),
            customer_id: session.customer.clone(),
            ..SubscriptionUpdate::default()
        },
    }
}

/// Perform the writes a reconciliation calls for.
///
/// Returns `false` if nothing was changed.
///
/// # Errors
///
/// Returns `BillingError::Repository` if a write fails.
pub async fn apply(
    pool: &PgPool,
    emails: &EmailService,
    currency: CurrencyCode,
    reconciliation: Reconciliation,
) -> Result<bool, BillingError> {
    match reconciliation {
        Reconciliation::Subscription { store, update } => {
            let vendors = VendorRepository::new(pool);
            let store_id = match store {
                StoreRef::Known(id) => id,
                StoreRef::BySubscription(subscription_id) => {
                    match vendors.find_id_by_subscription(&subscription_id).await? {
                        Some(id) => id,
                        None => {
                            warn!(subscription_id = %subscription_id, "No store found for subscription");
                            return Ok(false);
                        }
                    }
                }
            };

            if update.is_empty() {
                return Ok(false);
            }
            let updated = vendors.apply_subscription_update(store_id, &update).await?;
            if updated {
                info!(store_id = %store_id, status = ?update.status, "Subscription state updated");
            } else {
                warn!(store_id = %store_id, "Subscription event for unknown store");
            }
            Ok(updated)
        }
        Reconciliation::OrderPaid { payment_intent_id } => {
            let Some(order) = OrderRepository::new(pool)
                .mark_paid(&payment_intent_id)
                .await?
            else {
                info!(payment_intent_id = %payment_intent_id, "No unpaid order for payment intent");
                return Ok(false);
            };
            info!(order_id = %order.id, payment_intent_id = %payment_intent_id, "Order paid");
            notify_order_paid(pool, emails, currency, &order).await;
            Ok(true)
        }
        Reconciliation::OrderPaymentFailed { payment_intent_id } => {
            let updated = OrderRepository::new(pool)
                .mark_payment_failed(&payment_intent_id)
                .await?;
            if updated {
                info!(payment_intent_id = %payment_intent_id, "Order payment failed");
            }
            Ok(updated)
        }
        Reconciliation::ConnectAccount {
            account_id,
            charges_enabled,
            details_submitted,
            payouts_enabled,
        } => {
            let updated = VendorRepository::new(pool)
                .update_connect_state(
                    &account_id,
                    charges_enabled,
                    details_submitted,
                    payouts_enabled,
                )
                .await?;
            if updated {
                info!(account_id = %account_id, charges_enabled, details_submitted, "Connect account updated");
            } else {
                warn!(account_id = %account_id, "Connect account not linked to any store");
            }
            Ok(updated)
        }
        Reconciliation::Ignored { reason } => {
            info!(reason = %reason, "Webhook event ignored");
            Ok(false)
        }
    }
}

/// Email the vendor and the customer about a paid order. Failures are logged.
async fn notify_order_paid(
    pool: &PgPool,
    emails: &EmailService,
    currency: CurrencyCode,
    order: &Order,
) {
    let vendor = match VendorRepository::new(pool).get_by_id(order.vendor_id).await {
        Ok(Some(vendor)) => vendor,
        Ok(None) => return,
        Err(e) => {
            warn!(order_id = %order.id, error = %e, "Could not load store for order emails");
            return;
        }
    };

    let vendor_email = match vendor.contact_email.clone() {
        Some(email) => Some(email),
        None => UserRepository::new(pool)
            .get_by_id(vendor.user_id)
            .await
            .ok()
            .flatten()
            .map(|user| user.email.into_inner()),
    };

    let message = OrderEmail::from_order(order, currency);

    if let Some(to) = vendor_email.as_deref()
        && let Err(e) = emails
            .send_new_order_vendor(to, &vendor.store_name, &message)
            .await
    {
        log_email_failure("new_order_vendor", to, &e);
    }

    let customer = order.customer_email.as_str();
    if let Err(e) = emails
        .send_order_confirmation(
            customer,
            &vendor.store_name,
            vendor.contact_email.as_deref(),
            &message,
        )
        .await
    {
        log_email_failure("order_confirmation_customer", customer, &e);
    }
}

/// Process a verified webhook event exactly once.
///
/// # Errors
///
/// Returns a `BillingError` if the event is malformed or a write fails. The
/// event is then left out of the ledger so Stripe's retry is processed.
#[instrument(skip_all, fields(event_id = %event.id, event_type = %event.event_type))]
pub async fn process_event<S>(
    pool: &PgPool,
    stripe: &S,
    emails: &EmailService,
    currency: CurrencyCode,
    event: &Event,
) -> Result<WebhookOutcome, BillingError>
where
    S: SubscriptionSource + Sync,
{
    let ledger = StripeEventRepository::new(pool);
    if ledger.is_processed(&event.id).await? {
        info!("Duplicate webhook event skipped");
        return Ok(WebhookOutcome::Duplicate);
    }

    let reconciliation = plan(event, stripe).await?;
    let changed = apply(pool, emails, currency, reconciliation).await?;
    ledger.record(&event.id, &event.event_type).await?;

    Ok(if changed {
        WebhookOutcome::Applied
    } else {
        WebhookOutcome::Ignored
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::stripe::StripeError;

    #[derive(Default)]
    struct FakeStripe {
        subscriptions: HashMap<String, serde_json::Value>,
        calls: AtomicUsize,
    }

    impl FakeStripe {
        fn with(id: &str, subscription: serde_json::Value) -> Self {
            Self {
                subscriptions: HashMap::from([(id.to_owned(), subscription)]),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SubscriptionSource for FakeStripe {
        fn retrieve_subscription(
            &self,
            subscription_id: &str,
        ) -> impl Future<Output = Result<Subscription, StripeError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .subscriptions
                .get(subscription_id)
                .map(|value| serde_json::from_value(value.clone()).unwrap())
                .ok_or_else(|| StripeError::Api {
                    status: 404,
                    error_type: "invalid_request_error".to_owned(),
                    code: Some("resource_missing".to_owned()),
                    message: format!("No such subscription: '{subscription_id}'"),
                });
            async move { result }
        }
    }

    fn event(event_type: &str, object: serde_json::Value) -> Event {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": event_type,
            "created": 1_700_000_000,
            "data": { "object": object }
        }))
        .unwrap()
    }

    fn subscription_json(metadata: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "sub_1",
            "customer": "cus_1",
            "status": "active",
            "current_period_end": 1_700_000_000,
            "cancel_at_period_end": false,
            "metadata": metadata
        })
    }

    fn ts(secs: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(secs, 0)
    }

    #[test]
    fn test_store_from_metadata_prefers_store_id() {
        let both = Metadata::from([
            ("vendor_id".to_owned(), "7".to_owned()),
            ("store_id".to_owned(), "3".to_owned()),
        ]);
        let legacy = Metadata::from([("vendor_id".to_owned(), "7".to_owned())]);
        let garbage = Metadata::from([("store_id".to_owned(), "abc".to_owned())]);

        assert_eq!(store_from_metadata([&both]), Some(VendorId::new(3)));
        assert_eq!(store_from_metadata([&legacy]), Some(VendorId::new(7)));
        assert_eq!(store_from_metadata([&garbage]), None);
        assert_eq!(
            store_from_metadata([&garbage, &legacy]),
            Some(VendorId::new(7))
        );
    }

    #[tokio::test]
    async fn test_subscription_updated_sets_all_fields() {
        let stripe = FakeStripe::default();
        let mut sub = subscription_json(json!({"store_id": "42"}));
        sub["status"] = json!("trialing");
        sub["cancel_at_period_end"] = json!(true);

        let plan = plan(&event("customer.subscription.updated", sub), &stripe)
            .await
            .unwrap();

        assert_eq!(
            plan,
            Reconciliation::Subscription {
                store: StoreRef::Known(VendorId::new(42)),
                update: SubscriptionUpdate {
                    status: Some(SubscriptionStatus::Active),
                    current_period_end: ts(1_700_000_000),
                    cancel_at_period_end: Some(true),
                    subscription_id: Some("sub_1".to_owned()),
                    customer_id: Some("cus_1".to_owned()),
                },
            }
        );
        assert_eq!(stripe.calls(), 0);
    }

    #[tokio::test]
    async fn test_subscription_without_metadata_looks_up_by_id() {
        let stripe = FakeStripe::default();
        let plan = plan(
            &event("customer.subscription.created", subscription_json(json!({}))),
            &stripe,
        )
        .await
        .unwrap();

        let Reconciliation::Subscription { store, .. } = plan else {
            panic!("expected subscription reconciliation");
        };
        assert_eq!(store, StoreRef::BySubscription("sub_1".to_owned()));
    }

    #[tokio::test]
    async fn test_subscription_deleted_only_cancels() {
        let stripe = FakeStripe::default();
        let plan = plan(
            &event(
                "customer.subscription.deleted",
                subscription_json(json!({"store_id": "5"})),
            ),
            &stripe,
        )
        .await
        .unwrap();

        assert_eq!(
            plan,
            Reconciliation::Subscription {
                store: StoreRef::Known(VendorId::new(5)),
                update: SubscriptionUpdate {
                    status: Some(SubscriptionStatus::Canceled),
                    ..SubscriptionUpdate::default()
                },
            }
        );
    }

    #[tokio::test]
    async fn test_invoice_paid_uses_line_period_without_fetch() {
        let stripe = FakeStripe::default();
        let invoice = json!({
            "id": "in_1",
            "customer": "cus_1",
            "subscription": "sub_1",
            "subscription_details": {"metadata": {"store_id": "9"}},
            "lines": {"data": [{"period": {"start": 1_690_000_000, "end": 1_692_000_000}}]}
        });

        let plan = plan(&event("invoice.payment_succeeded", invoice), &stripe)
            .await
            .unwrap();

        assert_eq!(
            plan,
            Reconciliation::Subscription {
                store: StoreRef::Known(VendorId::new(9)),
                update: SubscriptionUpdate {
                    status: Some(SubscriptionStatus::Active),
                    current_period_end: ts(1_692_000_000),
                    cancel_at_period_end: None,
                    subscription_id: Some("sub_1".to_owned()),
                    customer_id: Some("cus_1".to_owned()),
                },
            }
        );
        assert_eq!(stripe.calls(), 0);
    }

    #[tokio::test]
    async fn test_invoice_without_metadata_refetches_subscription() {
        let stripe = FakeStripe::with("sub_1", subscription_json(json!({"store_id": "11"})));
        let invoice = json!({"id": "in_2", "subscription": "sub_1"});

        let plan = plan(&event("invoice.paid", invoice), &stripe).await.unwrap();

        let Reconciliation::Subscription { store, update } = plan else {
            panic!("expected subscription reconciliation");
        };
        assert_eq!(store, StoreRef::Known(VendorId::new(11)));
        assert_eq!(update.current_period_end, ts(1_700_000_000));
        assert_eq!(stripe.calls(), 1);
    }

    #[tokio::test]
    async fn test_invoice_fetch_failure_falls_back_to_subscription_id() {
        let stripe = FakeStripe::default();
        let invoice = json!({"id": "in_3", "subscription": "sub_missing"});

        let plan = plan(&event("invoice.payment_failed", invoice), &stripe)
            .await
            .unwrap();

        assert_eq!(
            plan,
            Reconciliation::Subscription {
                store: StoreRef::BySubscription("sub_missing".to_owned()),
                update: SubscriptionUpdate {
                    status: Some(SubscriptionStatus::PastDue),
                    subscription_id: Some("sub_missing".to_owned()),
                    ..SubscriptionUpdate::default()
                },
            }
        );
        assert_eq!(stripe.calls(), 1);
    }

    #[tokio::test]
    async fn test_invoice_without_subscription_is_ignored() {
        let stripe = FakeStripe::default();
        let plan = plan(&event("invoice.paid", json!({"id": "in_4"})), &stripe)
            .await
            .unwrap();
        assert!(matches!(plan, Reconciliation::Ignored { .. }));
    }

    #[tokio::test]
    async fn test_checkout_session_links_subscription_via_reference_id() {
        let stripe = FakeStripe::default();
        let session = json!({
            "id": "cs_1",
            "mode": "subscription",
            "customer": "cus_9",
            "subscription": "sub_9",
            "client_reference_id": "12"
        });

        let plan = plan(&event("checkout.session.completed", session), &stripe)
            .await
            .unwrap();

        assert_eq!(
            plan,
            Reconciliation::Subscription {
                store: StoreRef::Known(VendorId::new(12)),
                update: SubscriptionUpdate {
                    subscription_id: Some("sub_9".to_owned()),
                    customer_id: Some("cus_9".to_owned()),
                    ..SubscriptionUpdate::default()
                },
            }
        );
    }

    #[tokio::test]
    async fn test_payment_mode_checkout_session_is_ignored() {
        let stripe = FakeStripe::default();
        let session = json!({"id": "cs_2", "mode": "payment"});
        let plan = plan(&event("checkout.session.completed", session), &stripe)
            .await
            .unwrap();
        assert!(matches!(plan, Reconciliation::Ignored { .. }));
    }

    #[tokio::test]
    async fn test_payment_intent_events() {
        let stripe = FakeStripe::default();
        let intent = json!({"id": "pi_1", "amount": 1000, "currency": "usd", "status": "succeeded"});

        assert_eq!(
            plan(&event("payment_intent.succeeded", intent.clone()), &stripe)
                .await
                .unwrap(),
            Reconciliation::OrderPaid {
                payment_intent_id: "pi_1".to_owned()
            }
        );
        assert_eq!(
            plan(&event("payment_intent.payment_failed", intent), &stripe)
                .await
                .unwrap(),
            Reconciliation::OrderPaymentFailed {
                payment_intent_id: "pi_1".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn test_account_updated_copies_flags() {
        let stripe = FakeStripe::default();
        let account = json!({
            "id": "acct_1",
            "charges_enabled": true,
            "details_submitted": true,
            "payouts_enabled": false
        });

        assert_eq!(
            plan(&event("account.updated", account), &stripe).await.unwrap(),
            Reconciliation::ConnectAccount {
                account_id: "acct_1".to_owned(),
                charges_enabled: true,
                details_submitted: true,
                payouts_enabled: false,
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_event_is_ignored() {
        let stripe = FakeStripe::default();
        let plan = plan(&event("charge.refunded", json!({"id": "ch_1"})), &stripe)
            .await
            .unwrap();
        assert!(matches!(plan, Reconciliation::Ignored { .. }));
    }

    #[tokio::test]
    async fn test_malformed_object_is_payload_error() {
        let stripe = FakeStripe::default();
        let err = plan(
            &event("customer.subscription.updated", json!({"id": 5})),
            &stripe,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BillingError::Payload { .. }));
    }

    #[tokio::test]
    async fn test_replayed_event_plans_identically() {
        let stripe = FakeStripe::default();
        let evt = event(
            "customer.subscription.updated",
            subscription_json(json!({"store_id": "1"})),
        );
        let first = plan(&evt, &stripe).await.unwrap();
        let second = plan(&evt, &stripe).await.unwrap();
        assert_eq!(first, second);
    }
}
