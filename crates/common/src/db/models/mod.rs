//! SeaORM entity models
//!
//! Database entities for EnTrust

mod customer;
mod llm_config;
mod question;
mod report;
mod standards_chunk;
mod survey;
mod survey_response;
mod user;

pub use customer::{
    ActiveModel as CustomerActiveModel, Column as CustomerColumn, Entity as CustomerEntity,
    Model as Customer, StorageBackend,
};

pub use user::{
    ActiveModel as UserActiveModel, Column as UserColumn, Entity as UserEntity, Model as User,
    UserType,
};

pub use question::{
    ActiveModel as QuestionActiveModel, Column as QuestionColumn, Entity as QuestionEntity,
    Model as Question,
};

pub use survey::{
    ActiveModel as SurveyActiveModel, Column as SurveyColumn, Entity as SurveyEntity,
    Model as Survey, SurveyStatus,
};

pub use survey_response::{
    validate_answer, ActiveModel as SurveyResponseActiveModel, Column as SurveyResponseColumn,
    Entity as SurveyResponseEntity, Model as SurveyResponse, MAX_COMMENT_CHARS,
};

pub use llm_config::{
    ActiveModel as LlmConfigActiveModel, Column as LlmConfigColumn, Entity as LlmConfigEntity,
    LlmProvider, LlmPurpose, Model as LlmConfig, RedactedLlmConfig,
};

pub use report::{
    ActiveModel as ReportActiveModel, Column as ReportColumn, Entity as ReportEntity,
    Model as Report, ReportStage,
};

pub use standards_chunk::{
    ActiveModel as StandardsChunkActiveModel, Column as StandardsChunkColumn,
    Entity as StandardsChunkEntity, Model as StandardsChunk,
};
