//! Error types for the Stripe API client.

use thiserror::Error;

/// Errors that can occur when calling the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe returned an error object.
    #[error("API error ({error_type}): {message}")]
    Api {
        /// HTTP status of the response.
        status: u16,
        /// Stripe error type (`card_error`, `invalid_request_error`, ...).
        error_type: String,
        /// Machine-readable error code, if any.
        code: Option<String>,
        /// Human-readable message.
        message: String,
    },

    /// Rate limited after exhausting retries.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse a response body.
    #[error("parse error: {0}")]
    Parse(String),

    /// Client could not be built from configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StripeError {
    /// Whether the error was caused by the request rather than Stripe.
    ///
    /// Card declines and invalid parameters are reported to the caller as 400s.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Api { error_type, .. }
                if error_type == "card_error" || error_type == "invalid_request_error"
        )
    }

    /// The Stripe error type, if this is an API error.
    #[must_use]
    pub fn error_type(&self) -> Option<&str> {
        match self {
            Self::Api { error_type, .. } => Some(error_type),
            _ => None,
        }
    }
}

/// Error envelope returned by Stripe.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

/// Error details returned by Stripe.
#[derive(Debug, serde::Deserialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Errors from verifying a `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("No timestamp found in signature header")]
    MissingTimestamp,
    #[error("No v1 signature found in signature header")]
    MissingSignature,
    #[error("Timestamp outside the tolerance zone")]
    Expired,
    #[error("No signatures found matching the expected signature for payload")]
    Mismatch,
}
