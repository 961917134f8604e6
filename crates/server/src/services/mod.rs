//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password login and staff account creation
//! - `billing` - Checkout fee splitting, vendor subscriptions, webhook reconciliation
//! - `email` - Transactional email via SMTP
//! - `listing` - AI product listing generation
//! - `registration` - Vendor sign-up
//! - `uploads` - Product image uploads

pub mod auth;
pub mod billing;
pub mod email;
pub mod listing;
pub mod registration;
pub mod uploads;

pub use auth::{AuthError, AuthService};
pub use billing::BillingError;
pub use email::{EmailError, EmailService};
pub use listing::ListingError;
pub use registration::RegistrationError;
pub use uploads::UploadError;
