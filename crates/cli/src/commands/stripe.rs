//! Stripe account setup.

use secrecy::SecretString;

use sellor_server::config::StripeConfig;
use sellor_server::stripe::StripeClient;

use super::require_env;

/// Ensure the platform subscription product and monthly price exist.
///
/// Prints the price ID to put in `STRIPE_PLATFORM_PRICE_ID`.
///
/// # Errors
///
/// Returns an error if `STRIPE_SECRET_KEY` is missing or a Stripe request fails.
pub async fn setup() -> Result<(), Box<dyn std::error::Error>> {
    let secret_key = require_env("STRIPE_SECRET_KEY")?;
    let api_base =
        std::env::var("STRIPE_API_BASE").unwrap_or_else(|_| "https://api.stripe.com".to_owned());
    let app_url = std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());

    let config = StripeConfig {
        secret_key: SecretString::from(secret_key),
        webhook_secret: None,
        platform_price_id: None,
        api_base,
        connect_country: "US".to_owned(),
    };
    let client = StripeClient::new(&config, &app_url)?;

    tracing::info!("Ensuring platform product and price exist...");
    let products = client.setup_platform_products().await?;

    tracing::info!("Stripe setup complete!");
    tracing::info!("  Product: {}", products.product_id);
    tracing::info!("  Price:   {}", products.price_id);
    tracing::info!("");
    tracing::info!("Set this in the server environment:");
    tracing::info!("  STRIPE_PLATFORM_PRICE_ID={}", products.price_id);

    Ok(())
}
