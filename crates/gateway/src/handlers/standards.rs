//! Standards knowledge base ingestion (admin only)
//!
//! Passages are embedded on write with the active embedding config, so
//! ingestion fails loudly when no embedding provider is configured instead
//! of filling the table with unsearchable rows.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use entrust_common::{
    auth::AuthContext,
    db::models::LlmPurpose,
    db::Repository,
    dimension::Dimension,
    embeddings::{create_embedder, Embedder},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct IngestStandardRequest {
    pub dimension: Dimension,

    /// Citation for the passage, e.g. "DAMA-DMBOK ch. 13"
    #[validate(length(min = 1, max = 255))]
    pub source: String,

    #[validate(length(min = 1, max = 20000))]
    pub content: String,
}

#[derive(Serialize)]
pub struct IngestStandardResponse {
    pub id: Uuid,
    pub dimension: Dimension,
    pub source: String,
    pub embedding_model: String,
}

/// Embed and store one standards passage
pub async fn ingest_standard(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<IngestStandardRequest>,
) -> Result<(StatusCode, Json<IngestStandardResponse>)> {
    auth.require_admin()?;
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());

    let config = repo
        .find_active_llm_config(LlmPurpose::Embedding)
        .await?
        .ok_or_else(|| AppError::LlmConfigNotFound {
            purpose: String::from(LlmPurpose::Embedding),
        })?;

    let embedder = create_embedder(&config, state.config.llm.timeout_secs, state.config.llm.mock)?;
    let embedding = embedder.embed(&request.content).await?;

    let chunk = repo
        .insert_standards_chunk(
            request.dimension,
            request.source,
            request.content,
            &embedding,
            embedder.model_name().to_string(),
        )
        .await?;

    tracing::info!(
        chunk_id = %chunk.id,
        dimension = %request.dimension,
        source = %chunk.source,
        "Standards passage ingested"
    );

    Ok((
        StatusCode::CREATED,
        Json(IngestStandardResponse {
            id: chunk.id,
            dimension: request.dimension,
            source: chunk.source,
            embedding_model: chunk.embedding_model,
        }),
    ))
}
