//! LLM provider configuration entity
//!
//! One active config per purpose; looked up per request, never cached in a
//! process-wide singleton. The `api_key` column is a secret and must only be
//! serialized through [`Model::redacted`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What a configuration is used for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmPurpose {
    Report,
    Critique,
    Embedding,
}

impl From<String> for LlmPurpose {
    fn from(s: String) -> Self {
        match s.as_str() {
            "critique" => LlmPurpose::Critique,
            "embedding" => LlmPurpose::Embedding,
            _ => LlmPurpose::Report,
        }
    }
}

impl From<LlmPurpose> for String {
    fn from(purpose: LlmPurpose) -> Self {
        match purpose {
            LlmPurpose::Report => "report".to_string(),
            LlmPurpose::Critique => "critique".to_string(),
            LlmPurpose::Embedding => "embedding".to_string(),
        }
    }
}

/// Which backend serves a purpose
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Local,
    Bedrock,
    Azure,
    AzureAiFoundry,
}

impl From<String> for LlmProvider {
    fn from(s: String) -> Self {
        match s.as_str() {
            "bedrock" => LlmProvider::Bedrock,
            "azure" => LlmProvider::Azure,
            "azure_ai_foundry" => LlmProvider::AzureAiFoundry,
            _ => LlmProvider::Local,
        }
    }
}

impl From<LlmProvider> for String {
    fn from(provider: LlmProvider) -> Self {
        match provider {
            LlmProvider::Local => "local".to_string(),
            LlmProvider::Bedrock => "bedrock".to_string(),
            LlmProvider::Azure => "azure".to_string(),
            LlmProvider::AzureAiFoundry => "azure_ai_foundry".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "llm_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub purpose: String,

    #[sea_orm(column_type = "Text")]
    pub provider: String,

    #[sea_orm(column_type = "Text")]
    pub model: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub endpoint: Option<String>,

    /// Secret; never serialized to API callers
    #[sea_orm(column_type = "Text", nullable)]
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub max_tokens: i32,

    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

/// API-safe projection that structurally excludes the secret
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedLlmConfig {
    pub id: Uuid,
    pub purpose: LlmPurpose,
    pub provider: LlmProvider,
    pub model: String,
    pub endpoint: Option<String>,
    pub has_api_key: bool,
    pub max_tokens: i32,
    pub is_active: bool,
}

impl Model {
    /// Get the purpose as an enum
    pub fn llm_purpose(&self) -> LlmPurpose {
        LlmPurpose::from(self.purpose.clone())
    }

    /// Get the provider as an enum
    pub fn llm_provider(&self) -> LlmProvider {
        LlmProvider::from(self.provider.clone())
    }

    /// Projection safe to return from the API
    pub fn redacted(&self) -> RedactedLlmConfig {
        RedactedLlmConfig {
            id: self.id,
            purpose: self.llm_purpose(),
            provider: self.llm_provider(),
            model: self.model.clone(),
            endpoint: self.endpoint.clone(),
            has_api_key: self.api_key.is_some(),
            max_tokens: self.max_tokens,
            is_active: self.is_active,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_excludes_secret() {
        let model = Model {
            id: Uuid::new_v4(),
            purpose: "report".into(),
            provider: "azure".into(),
            model: "gpt-4o".into(),
            endpoint: Some("https://example.openai.azure.com".into()),
            api_key: Some("sk-secret".into()),
            max_tokens: 4096,
            is_active: true,
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        };

        let redacted = model.redacted();
        let json = serde_json::to_string(&redacted).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(json.contains("\"has_api_key\":true"));
    }

    #[test]
    fn test_entity_serialization_skips_api_key() {
        let model = Model {
            id: Uuid::new_v4(),
            purpose: "report".into(),
            provider: "local".into(),
            model: "llama3".into(),
            endpoint: None,
            api_key: Some("sk-secret".into()),
            max_tokens: 2048,
            is_active: true,
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        };

        let json = serde_json::to_string(&model).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
