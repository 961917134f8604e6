//! Session route handlers: login, logout, current user, and vendor signup.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::{info, instrument};

use sellor_core::{UserId, UserRole, VendorId};

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalUser, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::AuthService;
use crate::services::registration::{self, RegisterRequest, Registered};
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The identity returned after login and by `/api/auth/me`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: UserId,
    pub email: String,
    pub role: UserRole,
    pub store_id: Option<VendorId>,
}

impl From<&CurrentUser> for SessionUser {
    fn from(user: &CurrentUser) -> Self {
        Self {
            id: user.id,
            email: user.email.to_string(),
            role: user.role,
            store_id: user.vendor_id,
        }
    }
}

/// `POST /api/auth/login`
#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionUser>> {
    let user = AuthService::new(state.pool())
        .login_with_password(&request.email, &request.password)
        .await?;

    set_current_user(&session, &user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(Json(SessionUser::from(&user)))
}

/// `POST /api/auth/logout`
pub async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(json!({ "success": true })))
}

/// `GET /api/auth/me`
pub async fn me(OptionalUser(user): OptionalUser) -> Result<Json<SessionUser>> {
    user.as_ref()
        .map(|u| Json(SessionUser::from(u)))
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_owned()))
}

/// `POST /api/register`
///
/// Creates the vendor account and store, then logs the vendor in.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Registered>> {
    let (user, registered) =
        registration::register_vendor(state.pool(), state.email(), &request).await?;

    set_current_user(&session, &user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(Json(registered))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sellor_core::Email;

    use super::*;

    #[tokio::test]
    async fn test_me_without_session_is_unauthorized() {
        let result = me(OptionalUser(None)).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_session_user_exposes_store_id() {
        let user = CurrentUser {
            id: UserId::new(7),
            email: Email::parse("owner@example.com").unwrap(),
            role: UserRole::Vendor,
            vendor_id: Some(VendorId::new(3)),
        };
        let json = serde_json::to_value(SessionUser::from(&user)).unwrap();
        assert_eq!(json["storeId"], 3);
        assert_eq!(json["email"], "owner@example.com");
        assert_eq!(json["role"], "vendor");
    }
}
