//! Question and survey handlers
//!
//! Surveys are tenant-scoped throughout: every read and write checks the
//! caller against the survey's customer. Scores are validated to 1-10 and
//! comments to the length cap before anything reaches the database.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use entrust_common::{
    auth::AuthContext,
    db::models::{validate_answer, Question, Survey, UserType},
    db::Repository,
    dimension::Dimension,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct QuestionQuery {
    pub dimension: Option<Dimension>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub dimension: Dimension,

    #[validate(length(min = 1, max = 2000))]
    pub text: String,

    #[serde(default)]
    pub display_order: i32,
}

#[derive(Serialize)]
pub struct QuestionResponse {
    pub id: Uuid,
    pub dimension: String,
    pub text: String,
    pub display_order: i32,
}

impl From<Question> for QuestionResponse {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            dimension: question.dimension.clone(),
            text: question.text.clone(),
            display_order: question.display_order,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSurveyRequest {
    pub customer_id: Uuid,
}

#[derive(Serialize)]
pub struct SurveyResponseBody {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub created_at: String,
    pub submitted_at: Option<String>,
}

impl From<Survey> for SurveyResponseBody {
    fn from(survey: Survey) -> Self {
        Self {
            id: survey.id,
            customer_id: survey.customer_id,
            status: survey.status.clone(),
            created_at: survey.created_at.to_rfc3339(),
            submitted_at: survey.submitted_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResponseInput {
    pub question_id: Uuid,
    pub score: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertResponsesRequest {
    pub responses: Vec<ResponseInput>,
}

#[derive(Serialize)]
pub struct UpsertResponsesResponse {
    pub saved: usize,
}

/// List active questions, optionally filtered by dimension
pub async fn list_questions(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(query): Query<QuestionQuery>,
) -> Result<Json<Vec<QuestionResponse>>> {
    let repo = Repository::new(state.db.clone());
    let questions = repo.list_questions(query.dimension).await?;

    Ok(Json(questions.into_iter().map(Into::into).collect()))
}

/// Create a question (admin only)
pub async fn create_question(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<QuestionResponse>)> {
    auth.require_admin()?;
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());
    let question = repo
        .create_question(request.dimension, request.text, request.display_order)
        .await?;

    Ok((StatusCode::CREATED, Json(question.into())))
}

/// Open a survey for a customer (admin or that customer's CxO)
pub async fn create_survey(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateSurveyRequest>,
) -> Result<(StatusCode, Json<SurveyResponseBody>)> {
    auth.require_customer_scope(request.customer_id)?;
    if !matches!(auth.role, UserType::SystemAdmin | UserType::Cxo) {
        return Err(AppError::Forbidden {
            message: "Only administrators or CxO users can open surveys".to_string(),
        });
    }

    let repo = Repository::new(state.db.clone());

    repo.find_customer_by_id(request.customer_id)
        .await?
        .ok_or_else(|| AppError::CustomerNotFound {
            code: request.customer_id.to_string(),
        })?;

    let survey = repo.create_survey(request.customer_id).await?;

    tracing::info!(survey_id = %survey.id, customer_id = %request.customer_id, "Survey opened");

    Ok((StatusCode::CREATED, Json(survey.into())))
}

/// Fetch a survey within the caller's tenant
pub async fn get_survey(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(survey_id): Path<Uuid>,
) -> Result<Json<SurveyResponseBody>> {
    let repo = Repository::new(state.db.clone());

    let survey = repo
        .find_survey_by_id(survey_id)
        .await?
        .ok_or_else(|| AppError::SurveyNotFound {
            id: survey_id.to_string(),
        })?;

    auth.require_customer_scope(survey.customer_id)?;

    Ok(Json(survey.into()))
}

/// Save or overwrite the caller's responses on an open survey.
///
/// Responses are unique on (survey, question, user); re-submitting a
/// question replaces the earlier answer.
pub async fn upsert_responses(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(survey_id): Path<Uuid>,
    Json(request): Json<UpsertResponsesRequest>,
) -> Result<Json<UpsertResponsesResponse>> {
    let repo = Repository::new(state.db.clone());

    let survey = repo
        .find_survey_by_id(survey_id)
        .await?
        .ok_or_else(|| AppError::SurveyNotFound {
            id: survey_id.to_string(),
        })?;

    auth.require_customer_scope(survey.customer_id)?;

    if survey.is_submitted() {
        return Err(AppError::SurveyAlreadySubmitted {
            id: survey_id.to_string(),
        });
    }

    // Validate the whole batch before writing any row
    let questions = repo.list_questions(None).await?;
    for input in &request.responses {
        validate_answer(input.score, input.comment.as_deref())?;
        if !questions.iter().any(|q| q.id == input.question_id) {
            return Err(AppError::NotFound {
                resource_type: "question".to_string(),
                id: input.question_id.to_string(),
            });
        }
    }

    for input in &request.responses {
        repo.upsert_response(
            survey_id,
            input.question_id,
            auth.user_id,
            input.score,
            input.comment.clone(),
        )
        .await?;
    }

    tracing::info!(
        survey_id = %survey_id,
        user_id = %auth.user_id,
        count = request.responses.len(),
        "Survey responses saved"
    );

    Ok(Json(UpsertResponsesResponse {
        saved: request.responses.len(),
    }))
}

/// Close a survey for responses (admin or that customer's CxO)
pub async fn submit_survey(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(survey_id): Path<Uuid>,
) -> Result<Json<SurveyResponseBody>> {
    let repo = Repository::new(state.db.clone());

    let survey = repo
        .find_survey_by_id(survey_id)
        .await?
        .ok_or_else(|| AppError::SurveyNotFound {
            id: survey_id.to_string(),
        })?;

    auth.require_customer_scope(survey.customer_id)?;
    if !matches!(auth.role, UserType::SystemAdmin | UserType::Cxo) {
        return Err(AppError::Forbidden {
            message: "Only administrators or CxO users can submit surveys".to_string(),
        });
    }

    let submitted = repo.submit_survey(survey).await?;

    tracing::info!(survey_id = %survey_id, "Survey submitted");

    Ok(Json(submitted.into()))
}
