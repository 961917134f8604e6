//! Platform account model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sellor_core::{Email, UserId, UserRole};

/// A platform account (vendor, admin, or platform owner).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}
