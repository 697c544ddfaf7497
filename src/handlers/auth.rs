// src/handlers/auth.rs

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, TokenResponse},
    services::users::UserDirectory,
    utils::jwt::{Claims, sign_jwt},
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(users): State<UserDirectory>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = users.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a bearer token.
pub async fn login(
    State(users): State<UserDirectory>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = users.authenticate(&payload.email, &payload.password).await?;

    let token = sign_jwt(
        &user.id,
        user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

/// Returns the account behind the bearer token.
pub async fn me(
    State(users): State<UserDirectory>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = users
        .get(claims.user_id())
        .await?
        .ok_or_else(|| AppError::AuthError("Could not validate credentials".to_string()))?;

    Ok(Json(user))
}
