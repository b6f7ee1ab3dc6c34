//! Bearer-token authentication and the admin role gate.

use crate::error::AppError;
use crate::identity::ADMIN_ROLE;
use crate::model::User;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

/// Token from `Authorization: Bearer <token>`; `None` when absent or malformed.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then_some(token.trim())
        })
        .filter(|t| !t.is_empty())
}

/// Signed-in user. Rejects with 401 when the token is missing or unknown.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let user = state
            .sign_in
            .authenticate(token)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(CurrentUser(user))
    }
}

/// Signed-in user in the "Admin" role. 401 without a valid token, 403 otherwise.
#[derive(Clone, Debug)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !state.users.is_in_role(&user, ADMIN_ROLE).await? {
            tracing::info!(user_name = %user.user_name(), "admin action refused");
            return Err(AppError::Forbidden(format!("{} role required", ADMIN_ROLE)));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc123"))), Some("abc123"));
        assert_eq!(bearer_token(&parts(Some("bearer   abc123 "))), Some("abc123"));
        assert_eq!(bearer_token(&parts(Some("Basic abc123"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
