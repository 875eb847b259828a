//! Authentication and authorization utilities
//!
//! Provides:
//! - Argon2 password hashing and verification
//! - JWT token generation and validation
//! - Tenant-scoped auth context extraction

use crate::db::models::UserType;
use crate::errors::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::FromRef, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Extracted authentication context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authenticated user
    pub user_id: Uuid,

    /// Role of the user
    pub role: UserType,

    /// Tenant scope; None only for SystemAdmin
    pub customer_id: Option<Uuid>,

    /// Request ID for tracing
    pub request_id: String,
}

impl AuthContext {
    /// Require the SystemAdmin role
    pub fn require_admin(&self) -> Result<()> {
        if self.role == UserType::SystemAdmin {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                message: "Administrator role required".to_string(),
            })
        }
    }

    /// Enforce tenant isolation: admins are global, everyone else must be
    /// scoped to the target customer.
    pub fn require_customer_scope(&self, customer_id: Uuid) -> Result<()> {
        if self.role == UserType::SystemAdmin {
            return Ok(());
        }
        match self.customer_id {
            Some(own) if own == customer_id => Ok(()),
            _ => Err(AppError::TenantMismatch),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Role
    pub role: UserType,

    /// Tenant scope
    pub customer_id: Option<String>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a new JWT token
    pub fn generate_token(
        &self,
        user_id: Uuid,
        role: UserType,
        customer_id: Option<Uuid>,
    ) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            role,
            customer_id: customer_id.map(|id| id.to_string()),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::Unauthorized {
                    message: "Invalid token".to_string(),
                },
            })
    }
}

/// Hash a password with Argon2 and a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Verify a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Extract a bearer token from an Authorization header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Axum extractor for AuthContext. The app state must expose the JWT manager
/// via FromRef.
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    Arc<JwtManager>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer(auth_header).ok_or_else(|| AppError::Unauthorized {
            message: "Expected a bearer token".to_string(),
        })?;

        let jwt: Arc<JwtManager> = Arc::from_ref(state);
        let claims = jwt.validate_token(token)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized {
            message: "Invalid subject claim".to_string(),
        })?;

        let customer_id = match claims.customer_id {
            Some(ref raw) => Some(Uuid::parse_str(raw).map_err(|_| AppError::Unauthorized {
                message: "Invalid customer claim".to_string(),
            })?),
            None => None,
        };

        // Tenant-scoped roles must carry a tenant
        if claims.role.is_tenant_scoped() && customer_id.is_none() {
            return Err(AppError::Unauthorized {
                message: "Token is missing a tenant scope".to_string(),
            });
        }

        Ok(AuthContext {
            user_id,
            role: claims.role,
            customer_id,
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("abc123"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);

        let user_id = Uuid::new_v4();
        let customer_id = Uuid::new_v4();

        let token = manager
            .generate_token(user_id, UserType::Cxo, Some(customer_id))
            .unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, UserType::Cxo);
        assert_eq!(claims.customer_id, Some(customer_id.to_string()));
    }

    #[test]
    fn test_tenant_scope_enforced() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();

        let ctx = AuthContext {
            user_id: Uuid::new_v4(),
            role: UserType::Cxo,
            customer_id: Some(own),
            request_id: "test".into(),
        };

        assert!(ctx.require_customer_scope(own).is_ok());
        assert!(matches!(
            ctx.require_customer_scope(other),
            Err(AppError::TenantMismatch)
        ));
        assert!(ctx.require_admin().is_err());
    }

    #[test]
    fn test_admin_is_global() {
        let ctx = AuthContext {
            user_id: Uuid::new_v4(),
            role: UserType::SystemAdmin,
            customer_id: None,
            request_id: "test".into(),
        };

        assert!(ctx.require_admin().is_ok());
        assert!(ctx.require_customer_scope(Uuid::new_v4()).is_ok());
    }
}
