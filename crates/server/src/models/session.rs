//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use sellor_core::{Email, UserId, UserRole, VendorId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in account.
/// `vendor_id` is set for vendor accounts so that vendor routes do not need
/// a lookup on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Account role.
    pub role: UserRole,
    /// The store this user owns, if any.
    pub vendor_id: Option<VendorId>,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
