//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! sellor-cli admin create -e admin@example.com -n "Admin Name" -p 'long-password' -r platform_owner
//! ```

use thiserror::Error;

use sellor_core::UserRole;
use sellor_server::services::auth::{AuthError, AuthService};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Role is not a staff role.
    #[error("Invalid role: {0}. Valid roles: admin, platform_owner")]
    InvalidRole(String),

    /// Account creation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Parse a staff role, rejecting vendor and customer roles.
fn parse_staff_role(role: &str) -> Result<UserRole, AdminError> {
    match role.parse::<UserRole>() {
        Ok(parsed) if parsed.is_admin() => Ok(parsed),
        _ => Err(AdminError::InvalidRole(role.to_owned())),
    }
}

/// Create a new admin user.
///
/// # Arguments
///
/// * `email` - Admin's email address
/// * `name` - Admin's display name
/// * `password` - Initial password
/// * `role` - `admin` or `platform_owner`
///
/// # Errors
///
/// Returns an error if the role is invalid, the database is unreachable,
/// or the account cannot be created.
pub async fn create_user(
    email: &str,
    name: &str,
    password: &str,
    role: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let role = parse_staff_role(role)?;
    let pool = super::connect().await?;

    tracing::info!("Creating admin user: {} ({})", email, role);

    let user = AuthService::new(&pool)
        .create_staff_user(email, name, password, role)
        .await
        .map_err(AdminError::from)?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    Ok(())
}
