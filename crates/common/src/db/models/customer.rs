//! Customer (tenant) entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Storage backend selection per customer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Local,
    S3,
    AzureBlob,
}

impl From<String> for StorageBackend {
    fn from(s: String) -> Self {
        match s.as_str() {
            "s3" => StorageBackend::S3,
            "azure_blob" => StorageBackend::AzureBlob,
            _ => StorageBackend::Local,
        }
    }
}

impl From<StorageBackend> for String {
    fn from(backend: StorageBackend) -> Self {
        match backend {
            StorageBackend::Local => "local".to_string(),
            StorageBackend::S3 => "s3".to_string(),
            StorageBackend::AzureBlob => "azure_blob".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Unique tenant code, allow-list validated (`[A-Z0-9_-]{1,32}`)
    #[sea_orm(column_type = "Text", unique)]
    pub code: String,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub storage_backend: String,

    /// Retry cloud write failures against local disk
    pub storage_fallback_enabled: bool,

    #[sea_orm(column_type = "Text", nullable)]
    pub s3_bucket: Option<String>,

    /// Container SAS URL; a secret, excluded from API responses
    #[sea_orm(column_type = "Text", nullable)]
    #[serde(skip_serializing)]
    pub azure_container_sas: Option<String>,

    /// Soft delete only; customers are never hard-deleted
    pub is_deleted: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the storage backend as an enum
    pub fn backend(&self) -> StorageBackend {
        StorageBackend::from(self.storage_backend.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    Users,

    #[sea_orm(has_many = "super::survey::Entity")]
    Surveys,

    #[sea_orm(has_many = "super::report::Entity")]
    Reports,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::survey::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Surveys.def()
    }
}

impl Related<super::report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
