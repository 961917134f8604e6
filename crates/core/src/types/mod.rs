//! Core types for Sellor.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod category;
pub mod email;
pub mod id;
pub mod money;
pub mod slug;
pub mod status;

pub use category::ProductCategory;
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, Money};
pub use slug::{SlugError, StoreSlug};
pub use status::*;
