//! AI listing generation from a product photo.
//!
//! The vision model is asked for JSON. Models do not always comply, so
//! replies in code fences and replies written as labeled lines
//! (`**Product Title:** ...`) are accepted too.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use sellor_core::{ProductCategory, VendorId};

use crate::config::OpenAiConfig;
use crate::db::{GenerationRepository, RepositoryError, generations::NewGeneration};
use crate::openai::{OpenAiClient, OpenAiError};

pub const MAX_TITLE_CHARS: usize = 60;
pub const MAX_TAGS: usize = 5;

/// Errors from listing generation.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("Image URL is required")]
    MissingImageUrl,

    #[error("AI generation limit of {0} per hour reached")]
    RateLimited(u32),

    #[error("AI could not process the image")]
    EmptyReply,

    #[error("Failed to parse AI response")]
    Unparsable,

    #[error("openai error: {0}")]
    OpenAi(#[from] OpenAiError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A listing ready to prefill the product form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedListing {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: ProductCategory,
}

/// Listing fields as the model wrote them.
///
/// Missing and `null` fields both fall back to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawListing {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Tags,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Tags arrive either as an array or as one comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Tags {
    List(Vec<String>),
    Joined(String),
}

impl Default for Tags {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl Tags {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(tags) => tags,
            Self::Joined(joined) => split_tags(&joined),
        }
    }
}

fn split_tags(joined: &str) -> Vec<String> {
    joined.split(',').map(str::to_owned).collect()
}

/// The full prompt: configured instructions plus the category list.
#[must_use]
pub fn build_prompt(instructions: &str) -> String {
    let categories: Vec<&str> = ProductCategory::ALL.iter().map(|c| c.name()).collect();
    format!(
        "{} Choose the category from this list: [{}].",
        instructions.trim_end(),
        categories.join(", ")
    )
}

/// Parse a model reply.
///
/// # Errors
///
/// Returns `ListingError::EmptyReply` for a blank reply and
/// `ListingError::Unparsable` if no title and description can be found.
pub fn parse_reply(content: &str) -> Result<RawListing, ListingError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ListingError::EmptyReply);
    }

    let body = strip_code_fence(content);
    let raw = serde_json::from_str::<RawListing>(body)
        .ok()
        .filter(|raw| !raw.title.trim().is_empty())
        .unwrap_or_else(|| parse_labeled_lines(content));

    if raw.title.trim().is_empty() || raw.description.trim().is_empty() {
        return Err(ListingError::Unparsable);
    }
    Ok(raw)
}

fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_labeled_lines(content: &str) -> RawListing {
    let mut raw = RawListing::default();

    for line in content.lines() {
        let line = line
            .trim()
            .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '.' | '-' | '*' | '#' | ' '));
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };

        let label = label.replace('*', "").trim().to_lowercase();
        let value = value
            .trim()
            .trim_start_matches('*')
            .trim()
            .trim_matches('"')
            .trim();
        let label = label.strip_prefix("product ").unwrap_or(&label);

        match label {
            "title" | "name" => raw.title = value.to_owned(),
            "description" => raw.description = value.to_owned(),
            "tags" | "keywords" | "seo keywords" | "seo keywords/tags" => {
                raw.tags = Tags::List(split_tags(value));
            }
            "category" => raw.category = value.to_owned(),
            _ => {}
        }
    }

    raw
}

/// Clean up parsed fields.
///
/// The title is cut to 60 characters, tags are trimmed, de-duplicated
/// ignoring case, and capped at 5, and an unknown category becomes
/// [`ProductCategory::Other`].
#[must_use]
pub fn normalize(raw: RawListing) -> GeneratedListing {
    let title: String = raw.title.trim().chars().take(MAX_TITLE_CHARS).collect();

    let mut seen = HashSet::new();
    let tags = raw
        .tags
        .into_vec()
        .into_iter()
        .map(|tag| tag.trim().trim_start_matches('#').trim().to_owned())
        .filter(|tag| !tag.is_empty() && seen.insert(tag.to_lowercase()))
        .take(MAX_TAGS)
        .collect();

    GeneratedListing {
        title: title.trim_end().to_owned(),
        description: raw.description.trim().to_owned(),
        tags,
        category: ProductCategory::normalize(&raw.category),
    }
}

/// Generate a listing for an uploaded image and record the generation.
///
/// # Errors
///
/// Returns `ListingError::RateLimited` once the vendor has used its hourly
/// quota, and `ListingError` variants for model or parse failures.
#[instrument(skip(pool, openai, config), fields(vendor_id = %vendor_id))]
pub async fn generate_listing(
    pool: &PgPool,
    openai: &OpenAiClient,
    config: &OpenAiConfig,
    vendor_id: VendorId,
    image_url: &str,
) -> Result<GeneratedListing, ListingError> {
    let image_url = image_url.trim();
    if image_url.is_empty() {
        return Err(ListingError::MissingImageUrl);
    }

    let generations = GenerationRepository::new(pool);
    let used = generations
        .count_since(vendor_id, Utc::now() - Duration::hours(1))
        .await?;
    if used >= i64::from(config.limit_per_hour) {
        return Err(ListingError::RateLimited(config.limit_per_hour));
    }

    let response = openai
        .describe_image(&build_prompt(&config.prompt), image_url)
        .await?;
    let content = response.first_text().ok_or(ListingError::EmptyReply)?;

    let listing = match parse_reply(content) {
        Ok(raw) => normalize(raw),
        Err(e) => {
            warn!(error = %e, reply = %content, "Unusable AI reply");
            return Err(e);
        }
    };

    let category = listing.category.name();
    generations
        .record(&NewGeneration {
            vendor_id,
            image_url,
            raw_response: content,
            title: &listing.title,
            description: &listing.description,
            tags: &listing.tags,
            category,
        })
        .await?;

    info!(category, tags = listing.tags.len(), "AI listing generated");
    Ok(listing)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_reply() {
        let raw = parse_reply(
            r#"{"title": "Blue Mug", "description": "A mug.", "tags": ["mug", "blue"], "category": "Home & Decor"}"#,
        )
        .unwrap();
        assert_eq!(raw.title, "Blue Mug");
        assert_eq!(raw.tags, Tags::List(vec!["mug".to_owned(), "blue".to_owned()]));
    }

    #[test]
    fn test_parse_json_reply_with_null_fields() {
        let raw = parse_reply(r#"{"title": "X", "description": "Y", "tags": null, "category": null}"#)
            .unwrap();
        assert_eq!(raw.title, "X");
        assert_eq!(raw.tags, Tags::default());

        let listing = normalize(raw);
        assert!(listing.tags.is_empty());
        assert_eq!(listing.category, ProductCategory::Other);
    }

    #[test]
    fn test_parse_fenced_json_with_joined_tags() {
        let reply = "```json\n{\"title\": \"Lamp\", \"description\": \"Bright.\", \"tags\": \"light, desk\", \"category\": \"ELECTRONICS\"}\n```";
        let listing = normalize(parse_reply(reply).unwrap());
        assert_eq!(listing.tags, vec!["light", "desk"]);
        assert_eq!(listing.category, ProductCategory::Electronics);
    }

    #[test]
    fn test_parse_labeled_lines() {
        let reply = "**Product Title:** Leather Wallet\n\
                     **Product Description:** Slim and sturdy.\n\
                     **Tags:** wallet, leather, gift\n\
                     **Category:** Accessories";
        let listing = normalize(parse_reply(reply).unwrap());
        assert_eq!(listing.title, "Leather Wallet");
        assert_eq!(listing.description, "Slim and sturdy.");
        assert_eq!(listing.tags, vec!["wallet", "leather", "gift"]);
        assert_eq!(listing.category, ProductCategory::Accessories);
    }

    #[test]
    fn test_parse_numbered_plain_labels() {
        let reply = "1. Title: Wool Scarf\n2. Description: Warm.\n3. Keywords: scarf, wool\n4. Category: apparel";
        let listing = normalize(parse_reply(reply).unwrap());
        assert_eq!(listing.title, "Wool Scarf");
        assert_eq!(listing.category, ProductCategory::Apparel);
    }

    #[test]
    fn test_unparsable_and_empty_replies() {
        assert!(matches!(parse_reply("   "), Err(ListingError::EmptyReply)));
        assert!(matches!(
            parse_reply("I cannot identify this product."),
            Err(ListingError::Unparsable)
        ));
        assert!(matches!(
            parse_reply(r#"{"title": "Only a title"}"#),
            Err(ListingError::Unparsable)
        ));
    }

    #[test]
    fn test_normalize_truncates_title_and_caps_tags() {
        let listing = normalize(RawListing {
            title: "x".repeat(80),
            description: " d ".to_owned(),
            tags: Tags::List(
                ["a", " A", "b", "", "c", "d", "e", "f"]
                    .iter()
                    .map(|s| (*s).to_owned())
                    .collect(),
            ),
            category: "Gardening".to_owned(),
        });

        assert_eq!(listing.title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(listing.description, "d");
        assert_eq!(listing.tags, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(listing.category, ProductCategory::Other);
    }

    #[test]
    fn test_normalize_truncates_on_char_boundary() {
        let listing = normalize(RawListing {
            title: "é".repeat(70),
            description: "d".to_owned(),
            ..RawListing::default()
        });
        assert_eq!(listing.title.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_build_prompt_lists_categories() {
        let prompt = build_prompt("Describe it.");
        assert!(prompt.starts_with("Describe it."));
        assert!(prompt.contains("Home & Decor"));
        assert!(prompt.ends_with("Other]."));
    }

    #[test]
    fn test_listing_serializes_category_name() {
        let listing = GeneratedListing {
            title: "t".to_owned(),
            description: "d".to_owned(),
            tags: vec![],
            category: ProductCategory::ToysGames,
        };
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["category"], "Toys & Games");
    }
}
