//! User management handlers
//!
//! Passwords are hashed with Argon2 before they touch the database and the
//! hash never appears in a response; the user model skips it on serialize
//! and the handlers return an explicit projection anyway.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::double_option;
use crate::AppState;
use entrust_common::{
    auth::{hash_password, AuthContext},
    db::models::{User, UserType},
    db::Repository,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 255))]
    pub username: String,

    #[validate(length(min = 12, max = 1024))]
    pub password: String,

    pub user_type: UserType,

    /// Required for every role except SystemAdmin
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub is_active: Option<bool>,

    /// Outer None leaves the tenant link untouched, inner None clears it
    #[serde(default, deserialize_with = "double_option")]
    pub customer_id: Option<Option<Uuid>>,

    #[validate(length(min = 12, max = 1024))]
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub user_type: UserType,
    pub customer_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            user_type: user.role(),
            customer_id: user.customer_id,
            is_active: user.is_active,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Create a user (admin only)
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    auth.require_admin()?;
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    if request.user_type.is_tenant_scoped() && request.customer_id.is_none() {
        return Err(AppError::Validation {
            message: format!("{:?} users must belong to a customer", request.user_type),
            field: Some("customer_id".to_string()),
        });
    }

    let repo = Repository::new(state.db.clone());

    if repo
        .find_user_by_username(&request.username)
        .await?
        .is_some()
    {
        return Err(AppError::Duplicate {
            message: format!("Username {} already exists", request.username),
        });
    }

    if let Some(customer_id) = request.customer_id {
        repo.find_customer_by_id(customer_id)
            .await?
            .ok_or_else(|| AppError::CustomerNotFound {
                code: customer_id.to_string(),
            })?;
    }

    let password_hash = hash_password(&request.password)?;
    let user = repo
        .create_user(
            request.username,
            password_hash,
            request.user_type,
            request.customer_id,
        )
        .await?;

    tracing::info!(user_id = %user.id, user_type = %user.user_type, "User created");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// List users. Admins see everyone; tenant users see their own tenant.
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<UserResponse>>> {
    let repo = Repository::new(state.db.clone());

    let scope = if auth.role == UserType::SystemAdmin {
        None
    } else {
        // The extractor guarantees tenant-scoped tokens carry a tenant
        auth.customer_id
    };

    let users = repo.list_users(scope).await?;

    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// Update user activation, tenant link, or password (admin only)
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    auth.require_admin()?;
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());

    let user = repo
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            resource_type: "user".to_string(),
            id: user_id.to_string(),
        })?;

    let password_hash = match request.password {
        Some(ref password) => Some(hash_password(password)?),
        None => None,
    };

    let updated = repo
        .update_user(
            user,
            request.is_active,
            request.customer_id,
            password_hash,
        )
        .await?;

    tracing::info!(user_id = %updated.id, "User updated");

    Ok(Json(updated.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_tenant_field_leaves_link_untouched() {
        let request: UpdateUserRequest =
            serde_json::from_str(r#"{"is_active": true}"#).unwrap();
        assert_eq!(request.customer_id, None);
    }

    #[test]
    fn test_null_tenant_field_clears_link() {
        let request: UpdateUserRequest =
            serde_json::from_str(r#"{"customer_id": null}"#).unwrap();
        assert_eq!(request.customer_id, Some(None));
    }

    #[test]
    fn test_tenant_field_reassigns_link() {
        let id = Uuid::new_v4();
        let request: UpdateUserRequest =
            serde_json::from_str(&format!(r#"{{"customer_id": "{}"}}"#, id)).unwrap();
        assert_eq!(request.customer_id, Some(Some(id)));
    }
}
