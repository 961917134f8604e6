//! Store subdomain slugs.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when creating a [`StoreSlug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// Nothing usable remained after normalization.
    #[error("store name must contain at least one letter or digit")]
    Empty,
    /// The slug exceeds the DNS label limit.
    #[error("subdomain must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The slug contains characters outside `[a-z0-9-]` or misplaced hyphens.
    #[error("subdomain may only contain lowercase letters, digits, and single hyphens")]
    InvalidFormat,
}

/// The subdomain label a storefront is served under (`{slug}.sellor.ai`).
///
/// ## Constraints
///
/// - 1-63 characters (a single DNS label)
/// - Only `a-z`, `0-9`, and `-`
/// - No leading, trailing, or doubled hyphens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct StoreSlug(String);

impl StoreSlug {
    /// Maximum length of a DNS label.
    pub const MAX_LENGTH: usize = 63;

    /// Derive a slug from a human-readable store name.
    ///
    /// ```
    /// use sellor_core::StoreSlug;
    ///
    /// let slug = StoreSlug::from_store_name("Bob's  Candle Co.").unwrap();
    /// assert_eq!(slug.as_str(), "bob-s-candle-co");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] if the name has no ASCII letters or digits.
    pub fn from_store_name(name: &str) -> Result<Self, SlugError> {
        let mut slug = String::with_capacity(name.len());
        for ch in name.to_lowercase().chars() {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
                slug.push(ch);
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }

        // Only ASCII was pushed, so byte truncation is char-safe.
        slug.truncate(Self::MAX_LENGTH);
        let trimmed = slug.trim_matches('-');

        if trimmed.is_empty() {
            return Err(SlugError::Empty);
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Validate an existing slug, such as one taken from a `Host` header.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, or not in canonical form.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let valid_chars = s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if !valid_chars || s.starts_with('-') || s.ends_with('-') || s.contains("--") {
            return Err(SlugError::InvalidFormat);
        }

        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for StoreSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for StoreSlug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for StoreSlug {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for StoreSlug {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for StoreSlug {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_store_name_basic() {
        let slug = StoreSlug::from_store_name("My Awesome Store").unwrap();
        assert_eq!(slug.as_str(), "my-awesome-store");
    }

    #[test]
    fn test_from_store_name_collapses_punctuation() {
        let slug = StoreSlug::from_store_name("--Tea & Co!!  (Est. 2024)--").unwrap();
        assert_eq!(slug.as_str(), "tea-co-est-2024");
    }

    #[test]
    fn test_from_store_name_drops_non_ascii() {
        let slug = StoreSlug::from_store_name("Café Müller").unwrap();
        assert_eq!(slug.as_str(), "caf-m-ller");
    }

    #[test]
    fn test_from_store_name_truncates_to_label() {
        let name = format!("{} shop", "a".repeat(62));
        let slug = StoreSlug::from_store_name(&name).unwrap();
        // 62 a's plus the hyphen fill the label; the trailing hyphen is trimmed.
        assert_eq!(slug.as_str(), "a".repeat(62));
        assert!(slug.as_str().len() <= StoreSlug::MAX_LENGTH);
    }

    #[test]
    fn test_from_store_name_empty() {
        assert_eq!(StoreSlug::from_store_name("!!!"), Err(SlugError::Empty));
        assert_eq!(StoreSlug::from_store_name(""), Err(SlugError::Empty));
    }

    #[test]
    fn test_parse_valid() {
        assert!(StoreSlug::parse("candles").is_ok());
        assert!(StoreSlug::parse("tea-co-2024").is_ok());
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(StoreSlug::parse("Caps"), Err(SlugError::InvalidFormat));
        assert_eq!(StoreSlug::parse("-lead"), Err(SlugError::InvalidFormat));
        assert_eq!(StoreSlug::parse("double--dash"), Err(SlugError::InvalidFormat));
        assert!(matches!(
            StoreSlug::parse(&"a".repeat(64)),
            Err(SlugError::TooLong { max: 63 })
        ));
    }
}
