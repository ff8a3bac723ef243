use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use tracing::warn;

use crate::auth::dto::PublicUser;
use crate::auth::jwt::{JwtKeys, AUTH_COOKIE};
use crate::auth::repo::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller, resolved on every request: token discovery, then
/// signature/expiry verification, then one store read for the public user
/// fields. Any miss along the way rejects with the same 401.
pub struct CurrentUser(pub PublicUser);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn cookie_token(headers: &HeaderMap) -> Option<&str> {
    headers.get_all(header::COOKIE).iter().find_map(|v| {
        v.to_str().ok()?.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == AUTH_COOKIE).then_some(value)
        })
    })
}

/// The Authorization header takes precedence over the cookie.
fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let token = token_from_headers(&parts.headers)
            .ok_or(ApiError::Unauthorized)?
            .to_string();

        let keys = JwtKeys::from_config(&state.config.jwt);
        let claims = match keys.verify(&token) {
            Some(c) => c,
            None => {
                warn!("invalid or expired token");
                return Err(ApiError::Unauthorized);
            }
        };

        let user = User::find_public_by_id(&state.db, claims.sub)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token subject no longer exists");
                ApiError::Unauthorized
            })?;

        Ok(CurrentUser(user))
    }
}
