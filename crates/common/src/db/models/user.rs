//! User entity
//!
//! Passwords are stored only as Argon2 PHC strings. There is deliberately no
//! recoverable plaintext column.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a login identity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    SystemAdmin,
    Cxo,
    Participant,
    Sales,
}

impl UserType {
    /// Roles other than SystemAdmin are scoped to a single customer
    pub fn is_tenant_scoped(&self) -> bool {
        !matches!(self, UserType::SystemAdmin)
    }
}

impl From<String> for UserType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "system_admin" => UserType::SystemAdmin,
            "cxo" => UserType::Cxo,
            "sales" => UserType::Sales,
            _ => UserType::Participant,
        }
    }
}

impl From<UserType> for String {
    fn from(user_type: UserType) -> Self {
        match user_type {
            UserType::SystemAdmin => "system_admin".to_string(),
            UserType::Cxo => "cxo".to_string(),
            UserType::Participant => "participant".to_string(),
            UserType::Sales => "sales".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub username: String,

    /// Argon2 PHC string
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing)]
    pub password_hash: String,

    #[sea_orm(column_type = "Text")]
    pub user_type: String,

    /// Tenant scope; at most one customer per user
    pub customer_id: Option<Uuid>,

    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the user type as an enum
    pub fn role(&self) -> UserType {
        UserType::from(self.user_type.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,

    #[sea_orm(has_many = "super::survey_response::Entity")]
    SurveyResponses,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::survey_response::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SurveyResponses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
