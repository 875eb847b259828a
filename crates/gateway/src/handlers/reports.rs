//! Report generation and retrieval handlers

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::AppState;
use entrust_common::{
    auth::AuthContext,
    db::models::{LlmPurpose, Report, UserType},
    db::Repository,
    dimension::Dimension,
    embeddings::{create_embedder, Embedder, MockEmbedder},
    errors::{AppError, Result},
    rag::StandardsRetriever,
    storage::{artifact_path, ArtifactFormat},
};
use entrust_pipeline::{DimensionOutcome, ReportGenerator};

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    #[serde(default)]
    pub force_regenerate: bool,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub report_date: NaiveDate,
    pub survey_id: Uuid,
    pub outcomes: Vec<DimensionOutcome>,
}

#[derive(Serialize)]
pub struct ReportSummary {
    pub id: Uuid,
    pub dimension: String,
    pub report_date: NaiveDate,
    pub stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub has_artifacts: bool,
}

impl From<Report> for ReportSummary {
    fn from(report: Report) -> Self {
        Self {
            id: report.id,
            dimension: report.dimension.clone(),
            report_date: report.report_date,
            stage: report.stage.clone(),
            error: report.error.clone(),
            has_artifacts: report.markdown_path.is_some() && report.pdf_path.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "pdf".to_string()
}

#[derive(Serialize)]
pub struct DownloadUrlResponse {
    pub download_url: String,
    pub expires_in_secs: u64,
}

/// Generate reports for every dimension of the customer's latest submitted
/// survey. Same-day stored reports are skipped unless regeneration is forced.
pub async fn generate_reports(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(code): Path<String>,
    Query(query): Query<GenerateQuery>,
) -> Result<(StatusCode, Json<GenerateResponse>)> {
    let repo = Repository::new(state.db.clone());

    let customer = repo
        .find_customer_by_code(&code)
        .await?
        .ok_or_else(|| AppError::CustomerNotFound { code: code.clone() })?;

    auth.require_customer_scope(customer.id)?;
    if !matches!(auth.role, UserType::SystemAdmin | UserType::Cxo) {
        return Err(AppError::Forbidden {
            message: "Only administrators or CxO users can generate reports".to_string(),
        });
    }

    let survey = repo
        .find_latest_submitted_survey(customer.id)
        .await?
        .ok_or_else(|| AppError::Validation {
            message: format!("Customer {} has no submitted survey", customer.code),
            field: None,
        })?;

    let generator = build_generator(&state, &repo).await?;
    let report_date = Utc::now().date_naive();

    tracing::info!(
        customer = %customer.code,
        survey_id = %survey.id,
        force = query.force_regenerate,
        "Report generation started"
    );

    let outcomes = generator
        .generate_all(&customer, survey.id, report_date, query.force_regenerate)
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            report_date,
            survey_id: survey.id,
            outcomes,
        }),
    ))
}

/// List a customer's reports, newest first
pub async fn list_reports(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(code): Path<String>,
) -> Result<Json<Vec<ReportSummary>>> {
    let repo = Repository::new(state.db.clone());

    let customer = repo
        .find_customer_by_code(&code)
        .await?
        .ok_or_else(|| AppError::CustomerNotFound { code: code.clone() })?;

    auth.require_customer_scope(customer.id)?;

    let reports = repo.list_reports(customer.id).await?;

    Ok(Json(reports.into_iter().map(Into::into).collect()))
}

/// Download one report artifact. Cloud backends answer with a signed URL;
/// local artifacts stream back directly.
pub async fn download_report(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((code, dimension, date)): Path<(String, Dimension, NaiveDate)>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response> {
    let repo = Repository::new(state.db.clone());

    let customer = repo
        .find_customer_by_code(&code)
        .await?
        .ok_or_else(|| AppError::CustomerNotFound { code: code.clone() })?;

    auth.require_customer_scope(customer.id)?;

    let report = repo
        .find_report(customer.id, dimension, date)
        .await?
        .ok_or_else(|| AppError::ReportNotFound {
            dimension: dimension.slug().to_string(),
        })?;

    if !report.is_stored() {
        return Err(AppError::ReportNotFound {
            dimension: dimension.slug().to_string(),
        });
    }

    let format = match query.format.as_str() {
        "markdown" | "md" => ArtifactFormat::Markdown,
        "pdf" => ArtifactFormat::Pdf,
        other => {
            return Err(AppError::Validation {
                message: format!("Unknown format: {}", other),
                field: Some("format".to_string()),
            })
        }
    };

    let relative_path = artifact_path(&customer.code, dimension, date, format)?;
    let store = state.storage.for_customer(&customer)?;
    let ttl = state.config.signed_url_ttl();

    if let Some(url) = store.signed_url(&relative_path, ttl).await? {
        return Ok(Json(DownloadUrlResponse {
            download_url: url,
            expires_in_secs: ttl.as_secs(),
        })
        .into_response());
    }

    let content = store.load(&relative_path).await?;
    let filename = relative_path
        .rsplit('/')
        .next()
        .unwrap_or("report")
        .to_string();

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        content,
    )
        .into_response())
}

/// Assemble the pipeline from the active embedding config. Standards
/// retrieval degrades to an empty context when no embedding config exists.
async fn build_generator(state: &AppState, repo: &Repository) -> Result<ReportGenerator> {
    let (embedder, top_k): (Arc<dyn Embedder>, usize) = match repo
        .find_active_llm_config(LlmPurpose::Embedding)
        .await?
    {
        Some(config) => (
            create_embedder(&config, state.config.llm.timeout_secs, state.config.llm.mock)?,
            state.config.report.rag_top_k,
        ),
        None => {
            tracing::warn!("No active embedding config; reports proceed without standards context");
            (Arc::new(MockEmbedder::new(768)), 0)
        }
    };

    let retriever = Arc::new(StandardsRetriever::new(repo.clone(), embedder, top_k));

    Ok(ReportGenerator::new(
        repo.clone(),
        state.llm.clone(),
        retriever,
        state.storage.clone(),
        state.config.clone(),
    ))
}
