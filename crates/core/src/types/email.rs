//! Vendor and customer email addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why an address was rejected at signup, login, or checkout.
#[derive(thiserror::Error, Debug, Clone)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    #[error("email domain cannot be empty")]
    EmptyDomain,
    /// A second `@` or embedded whitespace.
    #[error("email contains invalid characters")]
    InvalidCharacters,
}

/// A normalized email address.
///
/// Vendor accounts are unique by email and order receipts are looked up by
/// the customer's address, so both sides must agree on one spelling. Parsing
/// trims the input and lowercases it; `Owner@Shop.example` and
/// `owner@shop.example` are the same vendor.
///
/// ```
/// use sellor_core::Email;
///
/// let login = Email::parse(" Owner@Shop.Example ").unwrap();
/// assert_eq!(login.as_str(), "owner@shop.example");
/// assert!(Email::parse("shopper-at-example.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Validate and normalize an address.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] naming the first rule the input breaks.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::MissingAtSymbol)?;
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty() {
            return Err(EmailError::EmptyDomain);
        }
        if domain.contains('@') || s.chars().any(char::is_whitespace) {
            return Err(EmailError::InvalidCharacters);
        }

        Ok(Self(s.to_lowercase()))
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

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Email {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Email {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        // Rows were written through `parse`.
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Email {
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
    fn test_vendor_login_variants_collapse_to_one_account() {
        let signup = Email::parse("Owner@MyShop.Example").unwrap();
        let login = Email::parse("  owner@myshop.example\n").unwrap();
        assert_eq!(signup, login);
        assert_eq!(signup.as_str(), "owner@myshop.example");
    }

    #[test]
    fn test_checkout_accepts_common_customer_addresses() {
        for address in [
            "shopper@example.com",
            "first.last+gifts@mail.example.co.uk",
            "a@b.c",
        ] {
            assert!(Email::parse(address).is_ok(), "{address}");
        }
    }

    #[test]
    fn test_rejects_blank_checkout_email() {
        assert!(matches!(Email::parse(""), Err(EmailError::Empty)));
        assert!(matches!(Email::parse("   "), Err(EmailError::Empty)));
    }

    #[test]
    fn test_rejects_overlong_address() {
        let long = format!("{}@shop.example", "v".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { max: 254 })
        ));
    }

    #[test]
    fn test_reports_which_half_is_missing() {
        assert!(matches!(
            Email::parse("shopper.example.com"),
            Err(EmailError::MissingAtSymbol)
        ));
        assert!(matches!(
            Email::parse("@shop.example"),
            Err(EmailError::EmptyLocalPart)
        ));
        assert!(matches!(
            Email::parse("owner@"),
            Err(EmailError::EmptyDomain)
        ));
    }

    #[test]
    fn test_rejects_pasted_name_and_double_at() {
        assert!(matches!(
            Email::parse("Jane Doe jane@example.com"),
            Err(EmailError::InvalidCharacters)
        ));
        assert!(matches!(
            Email::parse("owner@shop@example.com"),
            Err(EmailError::InvalidCharacters)
        ));
    }

    #[test]
    fn test_receipt_email_serializes_as_plain_string() {
        let email: Email = "Buyer@Example.com".parse().unwrap();
        let json = serde_json::to_string(&email).unwrap();
        assert_eq!(json, "\"buyer@example.com\"");
        assert_eq!(email.to_string(), "buyer@example.com");
    }
}
