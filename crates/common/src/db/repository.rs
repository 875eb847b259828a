//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling.

use crate::db::models::*;
use crate::db::DbPool;
use crate::dimension::Dimension;
use crate::errors::{AppError, Result};
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, Set, Statement,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One answered question, joined with its question text, as consumed by the
/// statistics aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRow {
    pub question_id: Uuid,
    pub question_text: String,
    pub score: i32,
    pub comment: Option<String>,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Customer Operations
    // ========================================================================

    /// Create a new customer
    pub async fn create_customer(
        &self,
        code: String,
        name: String,
        storage_backend: StorageBackend,
        storage_fallback_enabled: bool,
        s3_bucket: Option<String>,
        azure_container_sas: Option<String>,
    ) -> Result<Customer> {
        let now = Utc::now();

        let customer = CustomerActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            name: Set(name),
            storage_backend: Set(storage_backend.into()),
            storage_fallback_enabled: Set(storage_fallback_enabled),
            s3_bucket: Set(s3_bucket),
            azure_container_sas: Set(azure_container_sas),
            is_deleted: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        customer.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find a live customer by code
    pub async fn find_customer_by_code(&self, code: &str) -> Result<Option<Customer>> {
        CustomerEntity::find()
            .filter(CustomerColumn::Code.eq(code))
            .filter(CustomerColumn::IsDeleted.eq(false))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a live customer by ID
    pub async fn find_customer_by_id(&self, id: Uuid) -> Result<Option<Customer>> {
        CustomerEntity::find_by_id(id)
            .filter(CustomerColumn::IsDeleted.eq(false))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List live customers
    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        CustomerEntity::find()
            .filter(CustomerColumn::IsDeleted.eq(false))
            .order_by_asc(CustomerColumn::Code)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Update customer name and storage configuration
    #[allow(clippy::too_many_arguments)]
    pub async fn update_customer(
        &self,
        customer: Customer,
        name: Option<String>,
        storage_backend: Option<StorageBackend>,
        storage_fallback_enabled: Option<bool>,
        s3_bucket: Option<Option<String>>,
        azure_container_sas: Option<Option<String>>,
    ) -> Result<Customer> {
        let mut active: CustomerActiveModel = customer.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(backend) = storage_backend {
            active.storage_backend = Set(backend.into());
        }
        if let Some(fallback) = storage_fallback_enabled {
            active.storage_fallback_enabled = Set(fallback);
        }
        if let Some(bucket) = s3_bucket {
            active.s3_bucket = Set(bucket);
        }
        if let Some(sas) = azure_container_sas {
            active.azure_container_sas = Set(sas);
        }
        active.updated_at = Set(Utc::now().into());

        active.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Soft-delete a customer. Rows are never hard-deleted.
    pub async fn soft_delete_customer(&self, customer: Customer) -> Result<Customer> {
        let mut active: CustomerActiveModel = customer.into();
        active.is_deleted = Set(true);
        active.updated_at = Set(Utc::now().into());
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a new user with a pre-hashed password
    pub async fn create_user(
        &self,
        username: String,
        password_hash: String,
        user_type: UserType,
        customer_id: Option<Uuid>,
    ) -> Result<User> {
        let now = Utc::now();

        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username),
            password_hash: Set(password_hash),
            user_type: Set(user_type.into()),
            customer_id: Set(customer_id),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        user.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find a user by username, active or not
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a user by ID
    pub async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List users, optionally limited to one customer
    pub async fn list_users(&self, customer_id: Option<Uuid>) -> Result<Vec<User>> {
        let mut query = UserEntity::find().order_by_asc(UserColumn::Username);
        if let Some(customer_id) = customer_id {
            query = query.filter(UserColumn::CustomerId.eq(customer_id));
        }
        query.all(self.read_conn()).await.map_err(Into::into)
    }

    /// Update user activation, tenant link, or password hash
    pub async fn update_user(
        &self,
        user: User,
        is_active: Option<bool>,
        customer_id: Option<Option<Uuid>>,
        password_hash: Option<String>,
    ) -> Result<User> {
        let mut active: UserActiveModel = user.into();
        if let Some(flag) = is_active {
            active.is_active = Set(flag);
        }
        if let Some(customer_id) = customer_id {
            active.customer_id = Set(customer_id);
        }
        if let Some(hash) = password_hash {
            active.password_hash = Set(hash);
        }
        active.updated_at = Set(Utc::now().into());

        active.update(self.write_conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Question Operations
    // ========================================================================

    /// Create a question under a dimension
    pub async fn create_question(
        &self,
        dimension: Dimension,
        text: String,
        display_order: i32,
    ) -> Result<Question> {
        let question = QuestionActiveModel {
            id: Set(Uuid::new_v4()),
            dimension: Set(dimension.slug().to_string()),
            text: Set(text),
            display_order: Set(display_order),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };

        question.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// List active questions, optionally filtered by dimension
    pub async fn list_questions(&self, dimension: Option<Dimension>) -> Result<Vec<Question>> {
        let mut query = QuestionEntity::find()
            .filter(QuestionColumn::IsActive.eq(true))
            .order_by_asc(QuestionColumn::Dimension)
            .order_by_asc(QuestionColumn::DisplayOrder);
        if let Some(dimension) = dimension {
            query = query.filter(QuestionColumn::Dimension.eq(dimension.slug()));
        }
        query.all(self.read_conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Survey Operations
    // ========================================================================

    /// Open a new survey for a customer
    pub async fn create_survey(&self, customer_id: Uuid) -> Result<Survey> {
        let survey = SurveyActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            status: Set(SurveyStatus::Open.into()),
            created_at: Set(Utc::now().into()),
            submitted_at: Set(None),
        };

        survey.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find a survey by ID
    pub async fn find_survey_by_id(&self, id: Uuid) -> Result<Option<Survey>> {
        SurveyEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Latest submitted survey for a customer, if any
    pub async fn find_latest_submitted_survey(&self, customer_id: Uuid) -> Result<Option<Survey>> {
        SurveyEntity::find()
            .filter(SurveyColumn::CustomerId.eq(customer_id))
            .filter(SurveyColumn::Status.eq(String::from(SurveyStatus::Submitted)))
            .order_by_desc(SurveyColumn::SubmittedAt)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Mark a survey submitted
    pub async fn submit_survey(&self, survey: Survey) -> Result<Survey> {
        if survey.is_submitted() {
            return Err(AppError::SurveyAlreadySubmitted {
                id: survey.id.to_string(),
            });
        }

        let mut active: SurveyActiveModel = survey.into();
        active.status = Set(SurveyStatus::Submitted.into());
        active.submitted_at = Set(Some(Utc::now().into()));
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Insert or update a response, unique on (survey, question, user)
    pub async fn upsert_response(
        &self,
        survey_id: Uuid,
        question_id: Uuid,
        user_id: Uuid,
        score: i32,
        comment: Option<String>,
    ) -> Result<()> {
        let now = Utc::now();

        let response = SurveyResponseActiveModel {
            id: Set(Uuid::new_v4()),
            survey_id: Set(survey_id),
            question_id: Set(question_id),
            user_id: Set(user_id),
            score: Set(score),
            comment: Set(comment),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        SurveyResponseEntity::insert(response)
            .on_conflict(
                OnConflict::columns([
                    SurveyResponseColumn::SurveyId,
                    SurveyResponseColumn::QuestionId,
                    SurveyResponseColumn::UserId,
                ])
                .update_columns([
                    SurveyResponseColumn::Score,
                    SurveyResponseColumn::Comment,
                    SurveyResponseColumn::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec(self.write_conn())
            .await?;

        Ok(())
    }

    /// All responses for one survey and dimension, joined with question text
    pub async fn responses_for_dimension(
        &self,
        survey_id: Uuid,
        dimension: Dimension,
    ) -> Result<Vec<ResponseRow>> {
        use sea_orm::{ConnectionTrait, TryGetable};

        let sql = r#"
            SELECT r.question_id, q.text AS question_text, r.score, r.comment
            FROM survey_responses r
            INNER JOIN questions q ON r.question_id = q.id
            WHERE r.survey_id = $1
              AND q.dimension = $2
            ORDER BY q.display_order
        "#;

        let rows = self
            .read_conn()
            .query_all(Statement::from_sql_and_values(
                DbBackend::Postgres,
                sql,
                vec![survey_id.into(), dimension.slug().into()],
            ))
            .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            result.push(ResponseRow {
                question_id: Uuid::try_get(&row, "", "question_id")?,
                question_text: String::try_get(&row, "", "question_text")?,
                score: i32::try_get(&row, "", "score")?,
                comment: Option::<String>::try_get(&row, "", "comment")?,
            });
        }
        Ok(result)
    }

    // ========================================================================
    // LLM Config Operations
    // ========================================================================

    /// Create a config; activating it deactivates siblings of the same purpose
    #[allow(clippy::too_many_arguments)]
    pub async fn create_llm_config(
        &self,
        purpose: LlmPurpose,
        provider: LlmProvider,
        model: String,
        endpoint: Option<String>,
        api_key: Option<String>,
        max_tokens: i32,
        is_active: bool,
    ) -> Result<LlmConfig> {
        if is_active {
            self.deactivate_purpose(purpose).await?;
        }

        let now = Utc::now();
        let config = LlmConfigActiveModel {
            id: Set(Uuid::new_v4()),
            purpose: Set(purpose.into()),
            provider: Set(provider.into()),
            model: Set(model),
            endpoint: Set(endpoint),
            api_key: Set(api_key),
            max_tokens: Set(max_tokens),
            is_active: Set(is_active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        config.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// The single active config for a purpose
    pub async fn find_active_llm_config(&self, purpose: LlmPurpose) -> Result<Option<LlmConfig>> {
        LlmConfigEntity::find()
            .filter(LlmConfigColumn::Purpose.eq(String::from(purpose)))
            .filter(LlmConfigColumn::IsActive.eq(true))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a config by ID
    pub async fn find_llm_config_by_id(&self, id: Uuid) -> Result<Option<LlmConfig>> {
        LlmConfigEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List all configs
    pub async fn list_llm_configs(&self) -> Result<Vec<LlmConfig>> {
        LlmConfigEntity::find()
            .order_by_asc(LlmConfigColumn::Purpose)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Activate a config, deactivating siblings of the same purpose
    pub async fn activate_llm_config(&self, config: LlmConfig) -> Result<LlmConfig> {
        self.deactivate_purpose(config.llm_purpose()).await?;

        let mut active: LlmConfigActiveModel = config.into();
        active.is_active = Set(true);
        active.updated_at = Set(Utc::now().into());
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    async fn deactivate_purpose(&self, purpose: LlmPurpose) -> Result<()> {
        use sea_orm::ConnectionTrait;

        self.write_conn()
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "UPDATE llm_configs SET is_active = FALSE, updated_at = NOW() WHERE purpose = $1",
                vec![String::from(purpose).into()],
            ))
            .await?;
        Ok(())
    }

    // ========================================================================
    // Report Operations
    // ========================================================================

    /// Report row for a (customer, dimension, date) key
    pub async fn find_report(
        &self,
        customer_id: Uuid,
        dimension: Dimension,
        date: NaiveDate,
    ) -> Result<Option<Report>> {
        ReportEntity::find()
            .filter(ReportColumn::CustomerId.eq(customer_id))
            .filter(ReportColumn::Dimension.eq(dimension.slug()))
            .filter(ReportColumn::ReportDate.eq(date))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// All reports for a customer, newest first
    pub async fn list_reports(&self, customer_id: Uuid) -> Result<Vec<Report>> {
        ReportEntity::find()
            .filter(ReportColumn::CustomerId.eq(customer_id))
            .order_by_desc(ReportColumn::ReportDate)
            .order_by_asc(ReportColumn::Dimension)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Begin (or restart) a report for a key; same-day regeneration overwrites
    pub async fn begin_report(
        &self,
        customer_id: Uuid,
        dimension: Dimension,
        date: NaiveDate,
    ) -> Result<Report> {
        let now = Utc::now();

        if let Some(existing) = self.find_report(customer_id, dimension, date).await? {
            let mut active: ReportActiveModel = existing.into();
            active.stage = Set(ReportStage::Pending.into());
            active.error = Set(None);
            active.updated_at = Set(now.into());
            return active.update(self.write_conn()).await.map_err(Into::into);
        }

        let report = ReportActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            dimension: Set(dimension.slug().to_string()),
            report_date: Set(date),
            stage: Set(ReportStage::Pending.into()),
            markdown_path: Set(None),
            pdf_path: Set(None),
            error: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        report.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Advance a report's stage, enforcing the state machine
    pub async fn advance_report_stage(&self, report: Report, next: ReportStage) -> Result<Report> {
        let current = report.report_stage();
        if !current.can_advance_to(next) {
            return Err(AppError::Internal {
                message: format!("invalid report stage transition {:?} -> {:?}", current, next),
            });
        }

        let mut active: ReportActiveModel = report.into();
        active.stage = Set(next.into());
        active.updated_at = Set(Utc::now().into());
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Mark a report failed with an operator-facing message
    pub async fn fail_report(&self, report: Report, error: String) -> Result<Report> {
        let mut active: ReportActiveModel = report.into();
        active.stage = Set(ReportStage::Failed.into());
        active.error = Set(Some(error));
        active.updated_at = Set(Utc::now().into());
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Record artifact paths once stored
    pub async fn set_report_paths(
        &self,
        report: Report,
        markdown_path: String,
        pdf_path: String,
    ) -> Result<Report> {
        let mut active: ReportActiveModel = report.into();
        active.markdown_path = Set(Some(markdown_path));
        active.pdf_path = Set(Some(pdf_path));
        active.updated_at = Set(Utc::now().into());
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Standards Knowledge Base
    // ========================================================================

    /// Insert a standards passage with its embedding
    pub async fn insert_standards_chunk(
        &self,
        dimension: Dimension,
        source: String,
        content: String,
        embedding: &[f32],
        embedding_model: String,
    ) -> Result<StandardsChunk> {
        let embedding_str = format!(
            "[{}]",
            embedding
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(",")
        );

        let chunk = StandardsChunkActiveModel {
            id: Set(Uuid::new_v4()),
            dimension: Set(dimension.slug().to_string()),
            source: Set(source),
            content: Set(content),
            embedding: Set(Some(embedding_str)),
            embedding_model: Set(embedding_model),
            created_at: Set(Utc::now().into()),
        };

        chunk.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Cosine-similarity search over the standards knowledge base,
    /// filtered to one dimension
    pub async fn search_standards(
        &self,
        dimension: Dimension,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(String, String, f64)>> {
        use sea_orm::{ConnectionTrait, TryGetable};

        let embedding_str = format!(
            "[{}]",
            embedding
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(",")
        );

        let sql = format!(
            r#"
            SELECT
                source,
                content,
                1 - (embedding::vector <=> '{embedding}'::vector) AS score
            FROM standards_chunks
            WHERE dimension = $1
              AND embedding IS NOT NULL
            ORDER BY embedding::vector <=> '{embedding}'::vector
            LIMIT $2
            "#,
            embedding = embedding_str
        );

        let rows = self
            .read_conn()
            .query_all(Statement::from_sql_and_values(
                DbBackend::Postgres,
                &sql,
                vec![dimension.slug().into(), (top_k as i64).into()],
            ))
            .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            result.push((
                String::try_get(&row, "", "source")?,
                String::try_get(&row, "", "content")?,
                f64::try_get(&row, "", "score")?,
            ));
        }
        Ok(result)
    }
}
