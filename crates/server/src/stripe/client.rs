//! Stripe REST client.
//!
//! Requests are form-encoded with bracketed keys (`metadata[store_id]=7`) and
//! authenticated with the platform secret key over Basic auth.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{instrument, warn};
use uuid::Uuid;

use sellor_core::VendorId;

use crate::config::StripeConfig;

use super::error::{ApiErrorResponse, StripeError};
use super::types::{
    Account, AccountLink, CheckoutSession, ConnectOnboarding, CreatePaymentIntent, Customer,
    List, Metadata, OnboardingStatus, PaymentIntent, PlatformProducts, PortalSession, Price,
    Product, Subscription,
};

const STRIPE_API_VERSION: &str = "2023-10-16";
const MAX_RETRIES: u32 = 2;
const RETRY_DELAY: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed id of the platform's subscription product.
pub const PLATFORM_PRODUCT_ID: &str = "prod_platform_launch_plan";
/// Display name of the platform's subscription product.
pub const PLATFORM_PRODUCT_NAME: &str = "Launch Plan";
/// Monthly price of the platform plan, in cents.
pub const PLATFORM_PLAN_AMOUNT_CENTS: i64 = 2900;

type Params = Vec<(String, String)>;

/// Stripe API client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    secret_key: SecretString,
    api_base: String,
    connect_country: String,
    app_url: String,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// `app_url` is the platform's public URL, used for onboarding and
    /// checkout return links.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Config` if the HTTP client cannot be built.
    pub fn new(config: &StripeConfig, app_url: &str) -> Result<Self, StripeError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StripeError::Config(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                secret_key: config.secret_key.clone(),
                api_base: config.api_base.trim_end_matches('/').to_owned(),
                connect_country: config.connect_country.clone(),
                app_url: app_url.trim_end_matches('/').to_owned(),
            }),
        })
    }

    /// Create a customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, metadata))]
    pub async fn create_customer(
        &self,
        email: &str,
        metadata: &Metadata,
    ) -> Result<Customer, StripeError> {
        let mut params = vec![("email".to_owned(), email.to_owned())];
        push_metadata(&mut params, "metadata", metadata);
        self.post("customers", params).await
    }

    /// Create an Express account for a vendor and an onboarding link for it.
    ///
    /// # Errors
    ///
    /// Returns an error if either API request fails.
    #[instrument(skip(self, email, store_name), fields(vendor_id = %vendor_id))]
    pub async fn create_vendor_account(
        &self,
        vendor_id: VendorId,
        email: &str,
        store_name: &str,
    ) -> Result<ConnectOnboarding, StripeError> {
        let params = vec![
            ("type".to_owned(), "express".to_owned()),
            ("country".to_owned(), self.inner.connect_country.clone()),
            ("email".to_owned(), email.to_owned()),
            ("capabilities[card_payments][requested]".to_owned(), "true".to_owned()),
            ("capabilities[transfers][requested]".to_owned(), "true".to_owned()),
            ("business_profile[name]".to_owned(), store_name.to_owned()),
            ("metadata[vendorId]".to_owned(), vendor_id.to_string()),
            ("metadata[storeName]".to_owned(), store_name.to_owned()),
        ];
        let account: Account = self.post("accounts", params).await?;

        let link = self.create_onboarding_link(&account.id).await?;

        Ok(ConnectOnboarding {
            account_id: account.id,
            onboarding_url: link.url,
        })
    }

    /// Create a fresh onboarding link for an existing account.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn create_onboarding_link(&self, account_id: &str) -> Result<AccountLink, StripeError> {
        let settings_url = format!("{}/vendor/settings", self.inner.app_url);
        let params = vec![
            ("account".to_owned(), account_id.to_owned()),
            ("refresh_url".to_owned(), format!("{settings_url}?stripe=refresh")),
            ("return_url".to_owned(), format!("{settings_url}?stripe=return")),
            ("type".to_owned(), "account_onboarding".to_owned()),
        ];
        self.post("account_links", params).await
    }

    /// Fetch a Connect account's onboarding progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_onboarding_status(
        &self,
        account_id: &str,
    ) -> Result<OnboardingStatus, StripeError> {
        let account: Account = self.get(&format!("accounts/{account_id}"), Vec::new()).await?;
        Ok(OnboardingStatus::from(&account))
    }

    /// Ensure the platform product and its monthly price exist.
    ///
    /// Safe to run repeatedly: existing objects are reused.
    ///
    /// # Errors
    ///
    /// Returns an error if any API request fails.
    #[instrument(skip(self))]
    pub async fn setup_platform_products(&self) -> Result<PlatformProducts, StripeError> {
        let product = match self
            .get::<Product>(&format!("products/{PLATFORM_PRODUCT_ID}"), Vec::new())
            .await
        {
            Ok(product) => product,
            Err(StripeError::Api { status: 404, .. }) => {
                let params = vec![
                    ("id".to_owned(), PLATFORM_PRODUCT_ID.to_owned()),
                    ("name".to_owned(), PLATFORM_PRODUCT_NAME.to_owned()),
                    (
                        "description".to_owned(),
                        "Monthly platform subscription for sellor.ai vendors".to_owned(),
                    ),
                ];
                self.post("products", params).await?
            }
            Err(e) => return Err(e),
        };

        let prices: List<Price> = self
            .get(
                "prices",
                vec![
                    ("product".to_owned(), product.id.clone()),
                    ("active".to_owned(), "true".to_owned()),
                    ("type".to_owned(), "recurring".to_owned()),
                ],
            )
            .await?;

        let existing = prices.data.into_iter().find(|p| {
            p.unit_amount == Some(PLATFORM_PLAN_AMOUNT_CENTS)
                && p.currency.as_deref() == Some("usd")
                && p.recurring.as_ref().is_some_and(|r| r.interval == "month")
        });

        let price = match existing {
            Some(price) => price,
            None => {
                let params = vec![
                    ("product".to_owned(), product.id.clone()),
                    ("unit_amount".to_owned(), PLATFORM_PLAN_AMOUNT_CENTS.to_string()),
                    ("currency".to_owned(), "usd".to_owned()),
                    ("recurring[interval]".to_owned(), "month".to_owned()),
                ];
                self.post("prices", params).await?
            }
        };

        Ok(PlatformProducts {
            product_id: product.id,
            price_id: price.id,
        })
    }

    /// Subscribe a customer to the platform plan on behalf of a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn create_platform_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        store_id: VendorId,
    ) -> Result<Subscription, StripeError> {
        let params = vec![
            ("customer".to_owned(), customer_id.to_owned()),
            ("items[0][price]".to_owned(), price_id.to_owned()),
            ("payment_behavior".to_owned(), "default_incomplete".to_owned()),
            ("metadata[store_id]".to_owned(), store_id.to_string()),
            ("expand[]".to_owned(), "latest_invoice.payment_intent".to_owned()),
        ];
        self.post("subscriptions", params).await
    }

    /// Set or clear cancellation at the end of the current period.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn update_platform_subscription(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> Result<Subscription, StripeError> {
        let params = vec![(
            "cancel_at_period_end".to_owned(),
            cancel_at_period_end.to_string(),
        )];
        self.post(&format!("subscriptions/{subscription_id}"), params)
            .await
    }

    /// Move a subscription's first item onto another price, prorating.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Parse` if the subscription has no items, or an
    /// error if an API request fails.
    #[instrument(skip(self))]
    pub async fn change_subscription_price(
        &self,
        subscription_id: &str,
        price_id: &str,
    ) -> Result<Subscription, StripeError> {
        let current = self.retrieve_subscription(subscription_id).await?;
        let item_id = current
            .items
            .as_ref()
            .and_then(|items| items.data.first())
            .map(|item| item.id.clone())
            .ok_or_else(|| StripeError::Parse(format!("subscription {subscription_id} has no items")))?;

        let params = vec![
            ("items[0][id]".to_owned(), item_id),
            ("items[0][price]".to_owned(), price_id.to_owned()),
            ("proration_behavior".to_owned(), "create_prorations".to_owned()),
        ];
        self.post(&format!("subscriptions/{subscription_id}"), params)
            .await
    }

    /// Fetch a subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, StripeError> {
        self.get(&format!("subscriptions/{subscription_id}"), Vec::new())
            .await
    }

    /// Create a payment intent whose funds are transferred to a vendor's
    /// connected account, minus the platform's application fee.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, intent), fields(amount = intent.amount, fee = intent.application_fee_amount))]
    pub async fn create_payment_intent(
        &self,
        intent: &CreatePaymentIntent<'_>,
    ) -> Result<PaymentIntent, StripeError> {
        let mut params = vec![
            ("amount".to_owned(), intent.amount.to_string()),
            ("currency".to_owned(), intent.currency.to_owned()),
            ("automatic_payment_methods[enabled]".to_owned(), "true".to_owned()),
            (
                "application_fee_amount".to_owned(),
                intent.application_fee_amount.to_string(),
            ),
            (
                "transfer_data[destination]".to_owned(),
                intent.destination.to_owned(),
            ),
        ];
        push_metadata(&mut params, "metadata", &intent.metadata);
        self.post("payment_intents", params).await
    }

    /// Create a subscription-mode checkout session for a store's platform plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, email), fields(store_id = %store_id))]
    pub async fn create_checkout_session(
        &self,
        store_id: VendorId,
        price_id: &str,
        customer_id: Option<&str>,
        email: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let settings_url = format!("{}/vendor/settings", self.inner.app_url);
        let mut params = vec![
            ("mode".to_owned(), "subscription".to_owned()),
            ("line_items[0][price]".to_owned(), price_id.to_owned()),
            ("line_items[0][quantity]".to_owned(), "1".to_owned()),
            ("client_reference_id".to_owned(), store_id.to_string()),
            ("metadata[store_id]".to_owned(), store_id.to_string()),
            (
                "subscription_data[metadata][store_id]".to_owned(),
                store_id.to_string(),
            ),
            (
                "success_url".to_owned(),
                format!("{settings_url}?subscription=success"),
            ),
            (
                "cancel_url".to_owned(),
                format!("{settings_url}?subscription=cancelled"),
            ),
        ];
        match customer_id {
            Some(customer) => params.push(("customer".to_owned(), customer.to_owned())),
            None => params.push(("customer_email".to_owned(), email.to_owned())),
        }
        self.post("checkout/sessions", params).await
    }

    /// Create a billing portal session.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, StripeError> {
        let params = vec![
            ("customer".to_owned(), customer_id.to_owned()),
            ("return_url".to_owned(), return_url.to_owned()),
        ];
        self.post("billing_portal/sessions", params).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: Params) -> Result<T, StripeError> {
        self.send(Method::GET, path, query).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, form: Params) -> Result<T, StripeError> {
        self.send(Method::POST, path, form).await
    }

    /// Send a request, retrying connection failures, 429s, and 5xx responses.
    ///
    /// POSTs carry one idempotency key across all attempts so a retried
    /// request is never applied twice.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Params,
    ) -> Result<T, StripeError> {
        let url = format!("{}/v1/{path}", self.inner.api_base);
        let idempotency_key = (method == Method::POST).then(|| Uuid::new_v4().to_string());

        let mut attempt = 0;
        loop {
            let mut request = self
                .inner
                .client
                .request(method.clone(), &url)
                .basic_auth(self.inner.secret_key.expose_secret(), Some(""))
                .header("Stripe-Version", STRIPE_API_VERSION);

            request = if method == Method::GET {
                request.query(&params)
            } else {
                request.form(&params)
            };
            if let Some(key) = &idempotency_key {
                request = request.header("Idempotency-Key", key);
            }

            let result = request.send().await;

            let retriable = match &result {
                Ok(response) => {
                    let status = response.status();
                    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
                }
                Err(e) => e.is_connect() || e.is_timeout(),
            };

            if retriable && attempt < MAX_RETRIES {
                attempt += 1;
                warn!(path, attempt, "Stripe request failed, retrying");
                tokio::time::sleep(RETRY_DELAY * attempt).await;
                continue;
            }

            return handle_response(result?).await;
        }
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StripeError> {
    let status = response.status();

    if status.is_success() {
        let body = response.text().await?;
        return serde_json::from_str(&body)
            .map_err(|e| StripeError::Parse(format!("Failed to parse response: {e}")));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);
        return Err(StripeError::RateLimited(retry_after));
    }

    if status == StatusCode::UNAUTHORIZED {
        return Err(StripeError::Unauthorized("Invalid API key".to_owned()));
    }

    let body = response.text().await?;
    Err(match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(api_error) => StripeError::Api {
            status: status.as_u16(),
            error_type: api_error.error.error_type,
            code: api_error.error.code,
            message: api_error
                .error
                .message
                .unwrap_or_else(|| "Stripe request failed".to_owned()),
        },
        Err(_) => StripeError::Api {
            status: status.as_u16(),
            error_type: "unknown".to_owned(),
            code: None,
            message: body,
        },
    })
}

/// Append `{prefix}[key]=value` pairs, sorted for stable request bodies.
fn push_metadata(params: &mut Params, prefix: &str, metadata: &Metadata) {
    let mut entries: Vec<_> = metadata.iter().collect();
    entries.sort();
    for (key, value) in entries {
        params.push((format!("{prefix}[{key}]"), value.clone()));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> StripeClient {
        let config = StripeConfig {
            secret_key: SecretString::from("sk_test_123"),
            webhook_secret: None,
            platform_price_id: None,
            api_base: server.uri(),
            connect_country: "US".to_owned(),
        };
        StripeClient::new(&config, "https://sellor.ai").unwrap()
    }

    fn form(request: &Request) -> HashMap<String, String> {
        url::form_urlencoded::parse(&request.body)
            .into_owned()
            .collect()
    }

    fn intent_json() -> serde_json::Value {
        json!({
            "id": "pi_123",
            "amount": 10_000,
            "currency": "usd",
            "status": "requires_payment_method",
            "client_secret": "pi_123_secret_abc",
            "application_fee_amount": 200,
        })
    }

    fn intent(metadata: Metadata) -> CreatePaymentIntent<'static> {
        CreatePaymentIntent {
            amount: 10_000,
            currency: "usd",
            application_fee_amount: 200,
            destination: "acct_vendor_7",
            metadata,
        }
    }

    #[tokio::test]
    async fn test_payment_intent_routes_funds_to_connected_account() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("Stripe-Version", STRIPE_API_VERSION))
            .and(header_exists("Idempotency-Key"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(intent_json()))
            .expect(1)
            .mount(&server)
            .await;

        let metadata = Metadata::from([
            ("store_id".to_owned(), "7".to_owned()),
            ("customer_email".to_owned(), "shopper@example.com".to_owned()),
            ("customer_name".to_owned(), "Ada".to_owned()),
        ]);
        let created = client_for(&server)
            .create_payment_intent(&intent(metadata))
            .await
            .unwrap();
        assert_eq!(created.client_secret.as_deref(), Some("pi_123_secret_abc"));

        let requests = server.received_requests().await.unwrap();
        let sent = form(requests.first().unwrap());
        assert_eq!(sent["amount"], "10000");
        assert_eq!(sent["currency"], "usd");
        assert_eq!(sent["application_fee_amount"], "200");
        assert_eq!(sent["transfer_data[destination]"], "acct_vendor_7");
        assert_eq!(sent["automatic_payment_methods[enabled]"], "true");
        assert_eq!(sent["metadata[store_id]"], "7");
        assert_eq!(sent["metadata[customer_email]"], "shopper@example.com");
        assert_eq!(sent["metadata[customer_name]"], "Ada");
    }

    #[tokio::test]
    async fn test_retries_reuse_one_idempotency_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(intent_json()))
            .mount(&server)
            .await;

        let created = client_for(&server)
            .create_payment_intent(&intent(Metadata::new()))
            .await
            .unwrap();
        assert_eq!(created.id, "pi_123");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
        let keys: Vec<_> = requests
            .iter()
            .map(|r| r.headers.get("Idempotency-Key").unwrap().to_str().unwrap().to_owned())
            .collect();
        let first = keys.first().unwrap();
        assert!(keys.iter().all(|k| k == first));
    }

    #[tokio::test]
    async fn test_server_errors_retried_at_most_twice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": {"type": "api_error", "message": "Something went wrong"}
            })))
            .expect(3)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_payment_intent(&intent(Metadata::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, StripeError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_card_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": {"type": "card_error", "code": "card_declined", "message": "Your card was declined."}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_payment_intent(&intent(Metadata::new()))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.error_type(), Some("card_error"));
    }

    #[tokio::test]
    async fn test_gets_carry_no_idempotency_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/subscriptions/sub_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "sub_1",
                "customer": "cus_1",
                "status": "active",
                "cancel_at_period_end": false,
            })))
            .mount(&server)
            .await;

        client_for(&server).retrieve_subscription("sub_1").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let request = requests.first().unwrap();
        assert!(request.headers.get("Idempotency-Key").is_none());
    }

    #[test]
    fn test_push_metadata_uses_bracketed_keys() {
        let mut params = Vec::new();
        let metadata = Metadata::from([
            ("store_id".to_owned(), "7".to_owned()),
            ("customer_email".to_owned(), "a@b.com".to_owned()),
        ]);

        push_metadata(&mut params, "metadata", &metadata);

        assert_eq!(
            params,
            vec![
                ("metadata[customer_email]".to_owned(), "a@b.com".to_owned()),
                ("metadata[store_id]".to_owned(), "7".to_owned()),
            ]
        );
    }

    #[test]
    fn test_new_trims_trailing_slashes() {
        let config = crate::config::test_config();
        let client = StripeClient::new(&config.stripe, "https://sellor.ai/").expect("client");
        assert_eq!(client.inner.app_url, "https://sellor.ai");
        assert!(!client.inner.api_base.ends_with('/'));
    }
}
