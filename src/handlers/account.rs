//! Registration, sign-in and sign-out.

use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::identity::{SignInResult, MEMBER_ROLE};
use crate::model::{Credential, User, UserProfile};
use crate::response::{success_one, success_one_ok, SuccessOne};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub dob: NaiveDate,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub user: UserProfile,
}

#[utoipa::path(
    post,
    path = "/api/v1/account/register",
    tag = "Account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Member account created", body = SuccessOne<UserProfile>),
        (status = 409, description = "User name taken"),
        (status = 422, description = "Invalid user or weak password")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_name = req.email.trim().to_string();
    let mut credential = Credential::new(user_name.clone()).with_email(user_name.clone());
    if let Some(phone) = req.phone_number.filter(|p| !p.trim().is_empty()) {
        credential = credential.with_phone_number(phone);
    }
    let user = User::new(credential, req.full_name.trim(), req.dob);

    let created = state.users.create(user, &req.password).await?;
    if !created.succeeded {
        return Err(AppError::Identity(created));
    }
    let user = state
        .users
        .find_by_name(&user_name)
        .await?
        .ok_or_else(|| AppError::NotFound("registered user".into()))?;
    let assigned = state.users.add_to_role(&user, MEMBER_ROLE).await?;
    if !assigned.succeeded {
        tracing::warn!(user_name = %user.user_name(), result = %assigned, "member role not assigned");
    }
    let roles = state.users.roles_of(&user).await?;
    tracing::info!(user_name = %user.user_name(), "account registered");
    Ok(success_one(user.profile(roles)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/login",
    tag = "Account",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SuccessOne<LoginResponse>),
        (status = 401, description = "Invalid user name or password"),
        (status = 423, description = "Account locked out")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    match state
        .sign_in
        .password_sign_in(req.user_name.trim(), &req.password, true)
        .await?
    {
        SignInResult::Succeeded { user, token } => {
            let roles = state.users.roles_of(&user).await?;
            Ok(success_one_ok(LoginResponse {
                token,
                token_type: "Bearer".to_string(),
                user: user.profile(roles),
            }))
        }
        SignInResult::Failed => Err(AppError::Unauthorized),
        SignInResult::LockedOut => Err(AppError::LockedOut),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/account/logout",
    tag = "Account",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Access token revoked"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AppError> {
    state.sign_in.sign_out(&user).await?;
    tracing::info!(user_name = %user.user_name(), "user signed out");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/account/me",
    tag = "Account",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Signed-in user", body = SuccessOne<UserProfile>),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let roles = state.users.roles_of(&user).await?;
    Ok(success_one_ok(user.profile(roles)))
}
