//! Vendor sign-up: account, store, and subdomain in one step.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use sellor_core::{Email, EmailError, SlugError, StoreSlug, UserRole};

use crate::db::{RepositoryError, UserRepository, VendorRepository};
use crate::models::{CurrentUser, Vendor};
use crate::services::auth::{AuthError, hash_password, validate_password};
use crate::services::email::{EmailService, log_email_failure};

pub const MAX_STORE_NAME_CHARS: usize = 50;

/// Errors from vendor registration.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Email, password, and store name are required")]
    MissingField,

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Store name must be at most {MAX_STORE_NAME_CHARS} characters")]
    StoreNameTooLong,

    #[error("Store name must contain letters or numbers")]
    InvalidStoreName(#[from] SlugError),

    #[error("Subdomain already exists")]
    SubdomainTaken,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for RegistrationError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(what) if what.starts_with("subdomain") => {
                Self::SubdomainTaken
            }
            RepositoryError::Conflict(what) if what.starts_with("email") => Self::EmailTaken,
            other => Self::Repository(other),
        }
    }
}

/// Body of `POST /api/register`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub store_name: String,
}

/// Response for a successful registration.
#[derive(Debug, Clone, Serialize)]
pub struct Registered {
    pub message: &'static str,
    pub subdomain: StoreSlug,
    pub email: Email,
}

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct Signup {
    pub email: Email,
    pub store_name: String,
    pub slug: StoreSlug,
}

/// Validate a registration request without touching the database.
///
/// # Errors
///
/// Returns `RegistrationError` for a missing field, malformed email, weak
/// password, or a store name that yields no usable subdomain.
pub fn validate(request: &RegisterRequest) -> Result<Signup, RegistrationError> {
    let store_name = request.store_name.trim();
    if request.email.trim().is_empty() || request.password.is_empty() || store_name.is_empty() {
        return Err(RegistrationError::MissingField);
    }
    if store_name.chars().count() > MAX_STORE_NAME_CHARS {
        return Err(RegistrationError::StoreNameTooLong);
    }

    let email = Email::parse(&request.email)?;
    validate_password(&request.password)?;
    let slug = StoreSlug::from_store_name(store_name)?;

    Ok(Signup {
        email,
        store_name: store_name.to_owned(),
        slug,
    })
}

/// Register a vendor and its store.
///
/// Returns the new session identity alongside the response body. A failed
/// welcome email does not fail registration.
///
/// # Errors
///
/// Returns `RegistrationError::SubdomainTaken` or
/// `RegistrationError::EmailTaken` on conflicts.
#[instrument(skip(pool, emails, request), fields(email = %request.email))]
pub async fn register_vendor(
    pool: &PgPool,
    emails: &EmailService,
    request: &RegisterRequest,
) -> Result<(CurrentUser, Registered), RegistrationError> {
    let signup = validate(request)?;

    let vendors = VendorRepository::new(pool);
    if vendors.slug_exists(&signup.slug).await? {
        return Err(RegistrationError::SubdomainTaken);
    }
    if UserRepository::new(pool).email_exists(&signup.email).await? {
        return Err(RegistrationError::EmailTaken);
    }

    let password_hash = hash_password(&request.password)?;
    let (user, vendor): (_, Vendor) = vendors
        .create_with_owner(&signup.email, &password_hash, &signup.store_name, &signup.slug)
        .await?;

    info!(vendor_id = %vendor.id, slug = %vendor.slug, "Vendor registered");

    if let Err(e) = emails
        .send_welcome_vendor(
            user.email.as_str(),
            &signup.store_name,
            &signup.store_name,
            &vendor.slug,
        )
        .await
    {
        log_email_failure("welcome_vendor", user.email.as_str(), &e);
    }

    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
        role: UserRole::Vendor,
        vendor_id: Some(vendor.id),
    };

    Ok((
        current,
        Registered {
            message: "Store created successfully",
            subdomain: vendor.slug,
            email: user.email,
        },
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str, store_name: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_owned(),
            password: password.to_owned(),
            store_name: store_name.to_owned(),
        }
    }

    #[test]
    fn test_validate_derives_slug() {
        let signup = validate(&request("ada@example.com", "hunter22", "Ada's Tea & Co.")).unwrap();
        assert_eq!(signup.slug.as_str(), "ada-s-tea-co");
        assert_eq!(signup.store_name, "Ada's Tea & Co.");
    }

    #[test]
    fn test_validate_requires_fields() {
        assert!(matches!(
            validate(&request("", "hunter22", "Shop")),
            Err(RegistrationError::MissingField)
        ));
        assert!(matches!(
            validate(&request("a@b.com", "hunter22", "   ")),
            Err(RegistrationError::MissingField)
        ));
    }

    #[test]
    fn test_validate_rejects_short_password() {
        assert!(matches!(
            validate(&request("a@b.com", "short", "Shop")),
            Err(RegistrationError::Auth(AuthError::WeakPassword(_)))
        ));
    }

    #[test]
    fn test_validate_rejects_symbol_only_name() {
        assert!(matches!(
            validate(&request("a@b.com", "hunter22", "!!!")),
            Err(RegistrationError::InvalidStoreName(_))
        ));
    }

    #[test]
    fn test_validate_rejects_long_name() {
        assert!(matches!(
            validate(&request("a@b.com", "hunter22", &"a".repeat(51))),
            Err(RegistrationError::StoreNameTooLong)
        ));
    }

    #[test]
    fn test_conflicts_map_to_user_messages() {
        let subdomain: RegistrationError =
            RepositoryError::Conflict("subdomain already exists".to_owned()).into();
        let email: RegistrationError =
            RepositoryError::Conflict("email already exists".to_owned()).into();
        assert_eq!(subdomain.to_string(), "Subdomain already exists");
        assert!(matches!(email, RegistrationError::EmailTaken));
    }
}
