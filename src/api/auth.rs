//! Authentication flows: login, registration, logout, session bootstrap.
//!
//! These are thin use-cases over the gateway; the session store is the only
//! state they touch. Token refresh never happens here — the gateway owns it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::gateway::{ApiGateway, ApiRequest, GatewayError};
use crate::core::session::User;

#[derive(Debug, Serialize)]
pub struct UserCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub message: Option<String>,
}

/// Exchange credentials for a token pair and the user profile. A rejected
/// login leaves the session fully cleared.
pub async fn login(
    gateway: &ApiGateway,
    credentials: &UserCredentials,
) -> Result<User, GatewayError> {
    apply_auth_response(gateway, gateway.post("/v1/auth/login", credentials).await).await
}

/// Create an account; the backend signs the new user in directly, so the
/// response is handled exactly like a login.
pub async fn register(
    gateway: &ApiGateway,
    credentials: &UserCredentials,
) -> Result<User, GatewayError> {
    apply_auth_response(gateway, gateway.post("/v1/auth/register", credentials).await).await
}

async fn apply_auth_response(
    gateway: &ApiGateway,
    response: Result<AuthResponse, GatewayError>,
) -> Result<User, GatewayError> {
    let session = gateway.session();
    match response {
        Ok(response) => {
            session.set_tokens(
                &response.access_token,
                &response.refresh_token,
                response.expires_in,
            );
            session.set_user(Some(response.user.clone()));
            Ok(response.user)
        }
        Err(err) => {
            session.logout();
            Err(err)
        }
    }
}

/// Tell the backend to invalidate the session, then clear local state. The
/// remote call is best-effort: local logout happens even when it fails.
pub async fn logout(gateway: &ApiGateway) {
    if let Err(err) = gateway
        .execute_unit(ApiRequest::post("/v1/auth/logout"))
        .await
    {
        debug!("remote logout failed: {err}");
    }
    gateway.session().logout();
}

/// Validate the current session against the backend. On success the store is
/// updated with the fresh profile; on any failure the session is cleared.
pub async fn current_user(gateway: &ApiGateway) -> Option<User> {
    match gateway.get::<User>("/v1/auth/me").await {
        Ok(user) => {
            gateway.session().set_user(Some(user.clone()));
            Some(user)
        }
        Err(err) => {
            debug!("fetching current user failed: {err}");
            gateway.session().logout();
            None
        }
    }
}

/// Session bootstrap at process start: reload the persisted subset, refresh
/// proactively when the stored token has reached its expiry safety margin,
/// then validate against the backend.
pub async fn bootstrap(gateway: &ApiGateway) -> Option<User> {
    let session = gateway.session();
    session.set_loading(true);
    session.load_persisted();

    if session.access_token().is_none() && session.refresh_token().is_none() {
        session.set_loading(false);
        return None;
    }

    if session.is_token_expired() && session.refresh_token().is_some() {
        if let Err(err) = gateway.refresh_session().await {
            // The gateway already cleared the session.
            debug!("proactive session refresh failed: {err}");
            return None;
        }
    }

    current_user(gateway).await
}
