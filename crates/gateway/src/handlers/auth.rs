//! Authentication handlers
//!
//! Credentials travel only in the request body; verification is against the
//! stored Argon2 hash and the response never includes password material.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use entrust_common::{
    auth::verify_password,
    db::models::UserType,
    db::Repository,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,

    #[validate(length(min = 1, max = 1024))]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub role: UserType,
    pub customer_id: Option<Uuid>,
    pub expires_in_secs: u64,
}

/// Exchange credentials for a JWT
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());

    // Unknown user and wrong password produce the same error
    let user = repo
        .find_user_by_username(&request.username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(AppError::AccountDisabled);
    }

    let role = user.role();
    let token = state.jwt.generate_token(user.id, role, user.customer_id)?;

    tracing::info!(user_id = %user.id, role = ?role, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        role,
        customer_id: user.customer_id,
        expires_in_secs: state.config.auth.jwt_expiration_secs,
    }))
}
