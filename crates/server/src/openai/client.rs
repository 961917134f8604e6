//! `OpenAI` API client for vision chat completions.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use crate::config::OpenAiConfig;

use super::error::{ApiErrorResponse, OpenAiError};
use super::types::{ChatMessage, ChatRequest, ChatResponse, ContentPart, ImageUrl};

const MAX_TOKENS: u32 = 300;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// `OpenAI` API client.
#[derive(Clone)]
pub struct OpenAiClient {
    inner: Arc<OpenAiClientInner>,
}

struct OpenAiClientInner {
    client: reqwest::Client,
    api_key: SecretString,
    api_base: String,
    model: String,
}

impl OpenAiClient {
    /// Create a new `OpenAI` client.
    ///
    /// # Errors
    ///
    /// Returns `OpenAiError::Config` if the HTTP client cannot be built.
    pub fn new(config: &OpenAiConfig) -> Result<Self, OpenAiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OpenAiError::Config(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(OpenAiClientInner {
                client,
                api_key: config.api_key.clone(),
                api_base: config.api_base.trim_end_matches('/').to_owned(),
                model: config.model.clone(),
            }),
        })
    }

    /// Ask the vision model about an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self, prompt), fields(model = %self.inner.model))]
    pub async fn describe_image(
        &self,
        prompt: &str,
        image_url: &str,
    ) -> Result<ChatResponse, OpenAiError> {
        let request = ChatRequest {
            model: self.inner.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: prompt.to_owned(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image_url.to_owned(),
                        },
                    },
                ],
            }],
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .inner
            .client
            .post(format!("{}/v1/chat/completions", self.inner.api_base))
            .bearer_auth(self.inner.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        handle_response(response).await
    }
}

async fn handle_response(response: reqwest::Response) -> Result<ChatResponse, OpenAiError> {
    let status = response.status();

    if status.is_success() {
        let body = response.text().await?;
        return serde_json::from_str(&body)
            .map_err(|e| OpenAiError::Parse(format!("Failed to parse response: {e}")));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return Err(OpenAiError::RateLimited(retry_after));
    }

    if status == StatusCode::UNAUTHORIZED {
        return Err(OpenAiError::Unauthorized("Invalid API key".to_owned()));
    }

    let body = response.text().await?;
    Err(match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(api_error) => OpenAiError::Api {
            error_type: api_error
                .error
                .error_type
                .unwrap_or_else(|| "unknown".to_owned()),
            message: api_error.error.message,
        },
        Err(_) => OpenAiError::Api {
            error_type: "unknown".to_owned(),
            message: body,
        },
    })
}
