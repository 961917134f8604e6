//! Sellor Core - Shared domain types for the marketplace.
//!
//! This crate provides the types used across all Sellor components:
//! - `server` - JSON API for storefronts, vendors, checkout, and webhooks
//! - `cli` - Command-line tools for migrations, seeding, and Stripe setup
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Fee arithmetic lives here so that checkout and the
//! tests agree on a single rounding rule.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money, slugs, categories, and statuses
//! - [`fees`] - Platform application fee calculation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod fees;
pub mod types;

pub use fees::{FeeError, MIN_CHARGE_CENTS, application_fee, cents_from_major};
pub use types::*;
