//! Error types for EnTrust services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidCustomerCode,
    ScoreOutOfRange,
    CommentTooLong,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidCredentials,
    ExpiredToken,
    AccountDisabled,

    // Authorization errors (3xxx)
    Forbidden,
    TenantMismatch,

    // Resource errors (4xxx)
    NotFound,
    CustomerNotFound,
    SurveyNotFound,
    ReportNotFound,
    LlmConfigNotFound,

    // Conflict errors (5xxx)
    Conflict,
    SurveyAlreadySubmitted,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    ProviderUnreachable,
    ProviderTimeout,
    ProviderMalformed,
    CircuitBreakerOpen,
    StorageError,
    EmbeddingError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,

    // Service unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidCustomerCode => 1002,
            ErrorCode::ScoreOutOfRange => 1003,
            ErrorCode::CommentTooLong => 1004,

            // Auth (2xxx)
            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidCredentials => 2002,
            ErrorCode::ExpiredToken => 2003,
            ErrorCode::AccountDisabled => 2004,

            // Authz (3xxx)
            ErrorCode::Forbidden => 3001,
            ErrorCode::TenantMismatch => 3002,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::CustomerNotFound => 4002,
            ErrorCode::SurveyNotFound => 4003,
            ErrorCode::ReportNotFound => 4004,
            ErrorCode::LlmConfigNotFound => 4005,

            // Conflicts (5xxx)
            ErrorCode::Conflict => 5001,
            ErrorCode::SurveyAlreadySubmitted => 5002,

            // Rate limits (6xxx)
            ErrorCode::RateLimited => 6001,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // External (8xxx)
            ErrorCode::ProviderUnreachable => 8001,
            ErrorCode::ProviderTimeout => 8002,
            ErrorCode::ProviderMalformed => 8003,
            ErrorCode::CircuitBreakerOpen => 8004,
            ErrorCode::StorageError => 8005,
            ErrorCode::EmbeddingError => 8006,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,

            ErrorCode::ServiceUnavailable => 9999,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid customer code: {code}")]
    InvalidCustomerCode { code: String },

    #[error("Score {score} is outside the allowed range 1-10")]
    ScoreOutOfRange { score: i32 },

    #[error("Comment exceeds maximum length of {limit} characters")]
    CommentTooLong { limit: usize },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Account is disabled")]
    AccountDisabled,

    // Authorization errors
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Tenant mismatch")]
    TenantMismatch,

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Customer not found: {code}")]
    CustomerNotFound { code: String },

    #[error("Survey not found: {id}")]
    SurveyNotFound { id: String },

    #[error("Report not found for dimension {dimension}")]
    ReportNotFound { dimension: String },

    #[error("No active LLM configuration for purpose: {purpose}")]
    LlmConfigNotFound { purpose: String },

    // Conflict errors
    #[error("Duplicate resource: {message}")]
    Duplicate { message: String },

    #[error("Survey already submitted: {id}")]
    SurveyAlreadySubmitted { id: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Provider unreachable: {message}")]
    ProviderUnreachable { message: String },

    #[error("Provider timed out after {timeout_secs}s")]
    ProviderTimeout { timeout_secs: u64 },

    #[error("Provider returned malformed output: {message}")]
    ProviderMalformed { message: String },

    #[error("Circuit breaker open for purpose: {purpose}")]
    CircuitBreakerOpen { purpose: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidCustomerCode { .. } => ErrorCode::InvalidCustomerCode,
            AppError::ScoreOutOfRange { .. } => ErrorCode::ScoreOutOfRange,
            AppError::CommentTooLong { .. } => ErrorCode::CommentTooLong,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::AccountDisabled => ErrorCode::AccountDisabled,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::TenantMismatch => ErrorCode::TenantMismatch,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::CustomerNotFound { .. } => ErrorCode::CustomerNotFound,
            AppError::SurveyNotFound { .. } => ErrorCode::SurveyNotFound,
            AppError::ReportNotFound { .. } => ErrorCode::ReportNotFound,
            AppError::LlmConfigNotFound { .. } => ErrorCode::LlmConfigNotFound,
            AppError::Duplicate { .. } => ErrorCode::Conflict,
            AppError::SurveyAlreadySubmitted { .. } => ErrorCode::SurveyAlreadySubmitted,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::ProviderUnreachable { .. } => ErrorCode::ProviderUnreachable,
            AppError::ProviderTimeout { .. } => ErrorCode::ProviderTimeout,
            AppError::ProviderMalformed { .. } => ErrorCode::ProviderMalformed,
            AppError::CircuitBreakerOpen { .. } => ErrorCode::CircuitBreakerOpen,
            AppError::Storage { .. } => ErrorCode::StorageError,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::HttpClient(_) => ErrorCode::ProviderUnreachable,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::InvalidCustomerCode { .. }
            | AppError::ScoreOutOfRange { .. }
            | AppError::CommentTooLong { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. }
            | AppError::InvalidCredentials
            | AppError::ExpiredToken
            | AppError::AccountDisabled => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::Forbidden { .. } | AppError::TenantMismatch => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::NotFound { .. }
            | AppError::CustomerNotFound { .. }
            | AppError::SurveyNotFound { .. }
            | AppError::ReportNotFound { .. }
            | AppError::LlmConfigNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::Duplicate { .. } | AppError::SurveyAlreadySubmitted { .. } => {
                StatusCode::CONFLICT
            }

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::ProviderUnreachable { .. }
            | AppError::ProviderTimeout { .. }
            | AppError::ProviderMalformed { .. }
            | AppError::EmbeddingError { .. }
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::CircuitBreakerOpen { .. }
            | AppError::Storage { .. }
            | AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// User-facing message. Provider and storage failures collapse to a
    /// generic retry message so no upstream detail leaks to callers.
    pub fn public_message(&self) -> String {
        match self {
            AppError::ProviderUnreachable { .. }
            | AppError::ProviderTimeout { .. }
            | AppError::ProviderMalformed { .. }
            | AppError::CircuitBreakerOpen { .. }
            | AppError::HttpClient(_) => {
                "Report generation failed, please retry later".to_string()
            }
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.public_message();

        // Log based on severity; the internal message never reaches the body
        if self.is_server_error() {
            tracing::error!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: None,
                request_id: None, // Filled by middleware
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<sea_orm::TryGetError> for AppError {
    fn from(err: sea_orm::TryGetError) -> Self {
        AppError::Database(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::CustomerNotFound { code: "ACME".into() };
        assert_eq!(err.code(), ErrorCode::CustomerNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_score_out_of_range() {
        let err = AppError::ScoreOutOfRange { score: 11 };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_provider_message_is_generic() {
        let err = AppError::ProviderUnreachable {
            message: "connect refused to http://10.0.0.3:8000".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!err.public_message().contains("10.0.0.3"));
    }

    #[test]
    fn test_raw_row_decode_error_maps_to_database() {
        let err = AppError::from(sea_orm::TryGetError::Null("score".to_string()));
        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_tenant_mismatch_is_forbidden() {
        let err = AppError::TenantMismatch;
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), ErrorCode::TenantMismatch);
    }
}
