//! LLM provider configuration handlers (admin only)
//!
//! API keys go in, never out: every response uses the redacted projection,
//! which replaces the key with a has_api_key flag.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use entrust_common::{
    auth::AuthContext,
    db::models::{LlmProvider, LlmPurpose, RedactedLlmConfig},
    db::Repository,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLlmConfigRequest {
    pub purpose: LlmPurpose,

    pub provider: LlmProvider,

    #[validate(length(min = 1, max = 255))]
    pub model: String,

    #[validate(url)]
    pub endpoint: Option<String>,

    pub api_key: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: i32,

    #[serde(default)]
    pub is_active: bool,
}

fn default_max_tokens() -> i32 {
    4096
}

/// Create a provider config; activating it deactivates same-purpose siblings
pub async fn create_config(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateLlmConfigRequest>,
) -> Result<(StatusCode, Json<RedactedLlmConfig>)> {
    auth.require_admin()?;
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    // Only Bedrock resolves its endpoint through the AWS SDK
    if request.provider != LlmProvider::Bedrock && request.endpoint.is_none() {
        return Err(AppError::Validation {
            message: format!("{:?} configs require an endpoint", request.provider),
            field: Some("endpoint".to_string()),
        });
    }

    let repo = Repository::new(state.db.clone());
    let config = repo
        .create_llm_config(
            request.purpose,
            request.provider,
            request.model,
            request.endpoint,
            request.api_key,
            request.max_tokens,
            request.is_active,
        )
        .await?;

    tracing::info!(
        config_id = %config.id,
        purpose = %config.purpose,
        provider = %config.provider,
        "LLM config created"
    );

    Ok((StatusCode::CREATED, Json(config.redacted())))
}

/// List all provider configs, redacted
pub async fn list_configs(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<RedactedLlmConfig>>> {
    auth.require_admin()?;

    let repo = Repository::new(state.db.clone());
    let configs = repo.list_llm_configs().await?;

    Ok(Json(configs.iter().map(|c| c.redacted()).collect()))
}

/// Activate a config, deactivating same-purpose siblings
pub async fn activate_config(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(config_id): Path<Uuid>,
) -> Result<Json<RedactedLlmConfig>> {
    auth.require_admin()?;

    let repo = Repository::new(state.db.clone());

    let config = repo
        .find_llm_config_by_id(config_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            resource_type: "llm_config".to_string(),
            id: config_id.to_string(),
        })?;

    let activated = repo.activate_llm_config(config).await?;

    tracing::info!(config_id = %activated.id, purpose = %activated.purpose, "LLM config activated");

    Ok(Json(activated.redacted()))
}
