//! Customer (tenant) management handlers
//!
//! Creation and mutation are admin-only. Reads are tenant-scoped: a CxO can
//! fetch their own customer, never another. Responses are built from an
//! explicit projection so the Azure SAS secret can never leak through
//! serialization.

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
    auth::AuthContext,
    db::models::{Customer, StorageBackend},
    db::Repository,
    errors::{AppError, Result},
    storage::validate_customer_code,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    pub code: String,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[serde(default = "default_backend")]
    pub storage_backend: StorageBackend,

    #[serde(default)]
    pub storage_fallback_enabled: bool,

    pub s3_bucket: Option<String>,

    pub azure_container_sas: Option<String>,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Local
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    pub storage_backend: Option<StorageBackend>,

    pub storage_fallback_enabled: Option<bool>,

    /// Outer None leaves the bucket untouched, inner None clears it
    #[serde(default, deserialize_with = "double_option")]
    pub s3_bucket: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub azure_container_sas: Option<Option<String>>,
}

/// Customer projection returned by the API; carries no storage secrets
#[derive(Serialize)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub storage_backend: StorageBackend,
    pub storage_fallback_enabled: bool,
    pub s3_bucket: Option<String>,
    pub has_azure_container: bool,
    pub created_at: String,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            code: customer.code.clone(),
            name: customer.name.clone(),
            storage_backend: customer.backend(),
            storage_fallback_enabled: customer.storage_fallback_enabled,
            s3_bucket: customer.s3_bucket.clone(),
            has_azure_container: customer.azure_container_sas.is_some(),
            created_at: customer.created_at.to_rfc3339(),
        }
    }
}

/// Create a customer (admin only)
pub async fn create_customer(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>)> {
    auth.require_admin()?;
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;
    validate_customer_code(&request.code)?;

    let repo = Repository::new(state.db.clone());

    if repo.find_customer_by_code(&request.code).await?.is_some() {
        return Err(AppError::Duplicate {
            message: format!("Customer code {} already exists", request.code),
        });
    }

    let customer = repo
        .create_customer(
            request.code,
            request.name,
            request.storage_backend,
            request.storage_fallback_enabled,
            request.s3_bucket,
            request.azure_container_sas,
        )
        .await?;

    tracing::info!(customer = %customer.code, "Customer created");

    Ok((StatusCode::CREATED, Json(customer.into())))
}

/// List all customers (admin only)
pub async fn list_customers(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<CustomerResponse>>> {
    auth.require_admin()?;

    let repo = Repository::new(state.db.clone());
    let customers = repo.list_customers().await?;

    Ok(Json(customers.into_iter().map(Into::into).collect()))
}

/// Fetch one customer; non-admins only see their own tenant
pub async fn get_customer(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(code): Path<String>,
) -> Result<Json<CustomerResponse>> {
    let repo = Repository::new(state.db.clone());

    let customer = repo
        .find_customer_by_code(&code)
        .await?
        .ok_or_else(|| AppError::CustomerNotFound { code: code.clone() })?;

    auth.require_customer_scope(customer.id)?;

    Ok(Json(customer.into()))
}

/// Update customer name or storage configuration (admin only)
pub async fn update_customer(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(code): Path<String>,
    Json(request): Json<UpdateCustomerRequest>,
) -> Result<Json<CustomerResponse>> {
    auth.require_admin()?;
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());

    let customer = repo
        .find_customer_by_code(&code)
        .await?
        .ok_or_else(|| AppError::CustomerNotFound { code: code.clone() })?;

    let updated = repo
        .update_customer(
            customer,
            request.name,
            request.storage_backend,
            request.storage_fallback_enabled,
            request.s3_bucket,
            request.azure_container_sas,
        )
        .await?;

    tracing::info!(customer = %updated.code, "Customer updated");

    Ok(Json(updated.into()))
}

/// Soft-delete a customer (admin only)
pub async fn delete_customer(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(code): Path<String>,
) -> Result<StatusCode> {
    auth.require_admin()?;

    let repo = Repository::new(state.db.clone());

    let customer = repo
        .find_customer_by_code(&code)
        .await?
        .ok_or_else(|| AppError::CustomerNotFound { code: code.clone() })?;

    repo.soft_delete_customer(customer).await?;

    tracing::info!(customer = %code, "Customer soft-deleted");

    Ok(StatusCode::NO_CONTENT)
}
