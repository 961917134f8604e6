//! `OpenAI` Chat Completions client used for image-to-listing generation.

pub mod client;
pub mod error;
pub mod types;

pub use client::OpenAiClient;
pub use error::OpenAiError;
pub use types::ChatResponse;
