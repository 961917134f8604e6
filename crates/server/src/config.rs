//! Platform configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `STRIPE_SECRET_KEY` - Stripe platform secret key
//! - `OPENAI_API_KEY` - `OpenAI` API key for listing generation
//!
//! ## Optional
//! - `HOST` / `PORT` - Bind address (default: 127.0.0.1:3000)
//! - `APP_URL` - Public base URL (default: `http://localhost:{PORT}`)
//! - `APP_ENV` - `development` or `production` (default: development)
//! - `ROOT_DOMAIN` - Domain storefront subdomains hang off (default: sellor.ai)
//! - `STRIPE_WEBHOOK_SECRET` - Signing secret for `/api/webhooks/stripe`
//! - `STRIPE_PLATFORM_PRICE_ID` - Price used for vendor subscriptions
//! - `STRIPE_API_BASE` - Override the Stripe API host (default: `https://api.stripe.com`)
//! - `STRIPE_CONNECT_COUNTRY` - Country for Express accounts (default: US)
//! - `PLATFORM_TRANSACTION_FEE_PERCENT` - Platform fee per order (default: 2.0)
//! - `PLATFORM_CURRENCY` - Charge currency (default: usd)
//! - `PLATFORM_PLAN_PRICE_CENTS` - Displayed plan price (default: 2900)
//! - `OPENAI_MODEL` / `OPENAI_API_BASE` / `AI_PRODUCT_PROMPT`
//! - `AI_GENERATION_LIMIT_PER_HOUR` - Per-vendor quota (default: 50)
//! - `SMTP_HOST` / `SMTP_PORT` / `SMTP_USERNAME` / `SMTP_PASSWORD` - Outbound email
//! - `EMAIL_FROM` - Sender address (default: notifications@sellor.ai)
//! - `UPLOAD_DIR` - Where uploaded images are written (default: uploads)
//! - `LOG_FORMAT` - `pretty` or `json`
//! - `SENTRY_DSN` / `SENTRY_ENVIRONMENT` / `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use sellor_core::CurrencyCode;
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Default instructions sent with every product image.
pub const DEFAULT_PRODUCT_PROMPT: &str = "You are an assistant for an e-commerce marketplace. \
Look at the product image and write a listing for it. Respond with a single JSON object \
with the keys \"title\" (at most 60 characters), \"description\" (about 50 words), \
\"tags\" (an array of 3 to 5 short keywords), and \"category\".";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Platform application configuration.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the platform (used in Stripe return URLs and emails)
    pub base_url: String,
    /// Deployment environment
    pub environment: Environment,
    /// Root domain for storefront subdomains (e.g. `sellor.ai`)
    pub root_domain: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Stripe API configuration
    pub stripe: StripeConfig,
    /// Platform fee and plan pricing
    pub billing: BillingConfig,
    /// `OpenAI` listing generation configuration
    pub openai: OpenAiConfig,
    /// SMTP configuration (optional - emails are logged when absent)
    pub email: Option<EmailConfig>,
    /// Sender address for all transactional email
    pub email_from: String,
    /// Directory uploaded product images are written to
    pub upload_dir: PathBuf,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Platform secret key (`sk_...`)
    pub secret_key: SecretString,
    /// Webhook endpoint signing secret (`whsec_...`)
    pub webhook_secret: Option<SecretString>,
    /// Price vendors subscribe to
    pub platform_price_id: Option<String>,
    /// API host, overridable for tests
    pub api_base: String,
    /// Country code for new Express accounts
    pub connect_country: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("platform_price_id", &self.platform_price_id)
            .field("api_base", &self.api_base)
            .field("connect_country", &self.connect_country)
            .finish()
    }
}

/// Platform fee and subscription plan settings.
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Percentage of each order kept by the platform
    pub fee_percent: Decimal,
    /// Currency for storefront charges
    pub currency: CurrencyCode,
    /// Monthly plan price shown in the admin panel, in cents
    pub plan_price_cents: i64,
}

/// `OpenAI` API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct OpenAiConfig {
    /// API key
    pub api_key: SecretString,
    /// Vision-capable chat model
    pub model: String,
    /// API host, overridable for tests
    pub api_base: String,
    /// Instructions sent with each image
    pub prompt: String,
    /// Generations allowed per vendor per hour
    pub limit_per_hour: u32,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("limit_per_hour", &self.limit_per_hour)
            .finish_non_exhaustive()
    }
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .finish()
    }
}

impl PlatformConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(get_required_env("DATABASE_URL")?);
        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default("APP_URL", &format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("APP_URL".to_string(), e.to_string()))?;

        let environment = match get_env_or_default("APP_ENV", "development").as_str() {
            "production" => Environment::Production,
            "development" | "test" => Environment::Development,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "APP_ENV".to_string(),
                    format!("unknown environment '{other}'"),
                ));
            }
        };

        let session_secret = get_validated_secret("SESSION_SECRET")?;
        validate_session_secret(&session_secret, "SESSION_SECRET")?;

        let log_format = match get_env_or_default("LOG_FORMAT", "pretty").as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            environment,
            root_domain: get_env_or_default("ROOT_DOMAIN", "sellor.ai").to_lowercase(),
            session_secret,
            stripe: StripeConfig::from_env()?,
            billing: BillingConfig::from_env()?,
            openai: OpenAiConfig::from_env()?,
            email: EmailConfig::from_env()?,
            email_from: get_env_or_default("EMAIL_FROM", "notifications@sellor.ai"),
            upload_dir: PathBuf::from(get_env_or_default("UPLOAD_DIR", "uploads")),
            log_format,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let webhook_secret = get_optional_env("STRIPE_WEBHOOK_SECRET")
            .map(|value| {
                validate_secret_strength(&value, "STRIPE_WEBHOOK_SECRET")?;
                Ok::<_, ConfigError>(SecretString::from(value))
            })
            .transpose()?;

        Ok(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            webhook_secret,
            platform_price_id: get_optional_env("STRIPE_PLATFORM_PRICE_ID"),
            api_base: get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com")
                .trim_end_matches('/')
                .to_string(),
            connect_country: get_env_or_default("STRIPE_CONNECT_COUNTRY", "US"),
        })
    }
}

impl BillingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let fee_percent = get_env_or_default("PLATFORM_TRANSACTION_FEE_PERCENT", "2.0")
            .parse::<Decimal>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "PLATFORM_TRANSACTION_FEE_PERCENT".to_string(),
                    e.to_string(),
                )
            })?;
        if fee_percent.is_sign_negative() || fee_percent >= Decimal::ONE_HUNDRED {
            return Err(ConfigError::InvalidEnvVar(
                "PLATFORM_TRANSACTION_FEE_PERCENT".to_string(),
                "must be between 0 and 100".to_string(),
            ));
        }

        let currency = get_env_or_default("PLATFORM_CURRENCY", "usd")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("PLATFORM_CURRENCY".to_string(), e))?;

        let plan_price_cents = get_env_or_default("PLATFORM_PLAN_PRICE_CENTS", "2900")
            .parse::<i64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("PLATFORM_PLAN_PRICE_CENTS".to_string(), e.to_string())
            })?;

        Ok(Self {
            fee_percent,
            currency,
            plan_price_cents,
        })
    }
}

impl OpenAiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let limit_per_hour = get_env_or_default("AI_GENERATION_LIMIT_PER_HOUR", "50")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "AI_GENERATION_LIMIT_PER_HOUR".to_string(),
                    e.to_string(),
                )
            })?;

        Ok(Self {
            api_key: get_validated_secret("OPENAI_API_KEY")?,
            model: get_env_or_default("OPENAI_MODEL", "gpt-4o"),
            api_base: get_env_or_default("OPENAI_API_BASE", "https://api.openai.com")
                .trim_end_matches('/')
                .to_string(),
            prompt: get_env_or_default("AI_PRODUCT_PROMPT", DEFAULT_PRODUCT_PROMPT),
            limit_per_hour,
        })
    }
}

impl EmailConfig {
    /// SMTP is optional; a host without credentials is a configuration error.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: SecretString::from(get_required_env("SMTP_PASSWORD")?),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Configuration with fixed, obviously fake values for unit tests.
#[cfg(test)]
pub(crate) fn test_config() -> PlatformConfig {
    PlatformConfig {
        database_url: SecretString::from("postgres://localhost/sellor_test"),
        host: IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        environment: Environment::Development,
        root_domain: "sellor.ai".to_string(),
        session_secret: SecretString::from("k3J9x!Qm2@Lp8#Zr5$Tv1%Wy7^Bn4&Cd6*"),
        stripe: StripeConfig {
            secret_key: SecretString::from("sk_test_51Hk2mQ9zR4pL7vX0nB3cY8"),
            webhook_secret: Some(SecretString::from("whsec_9fK2mQ7zR4pL1vX0nB3cY8tW")),
            platform_price_id: Some("price_launch_monthly".to_string()),
            api_base: "http://127.0.0.1:12111".to_string(),
            connect_country: "US".to_string(),
        },
        billing: BillingConfig {
            fee_percent: Decimal::new(20, 1),
            currency: CurrencyCode::Usd,
            plan_price_cents: 2900,
        },
        openai: OpenAiConfig {
            api_key: SecretString::from("sk-proj-7Hq2Lm9Zx4Rt1Vb8Nc3Kd6"),
            model: "gpt-4o".to_string(),
            api_base: "http://127.0.0.1:12112".to_string(),
            prompt: DEFAULT_PRODUCT_PROMPT.to_string(),
            limit_per_hour: 50,
        },
        email: None,
        email_from: "notifications@sellor.ai".to_string(),
        upload_dir: std::env::temp_dir().join("sellor-test-uploads"),
        log_format: LogFormat::Pretty,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}
