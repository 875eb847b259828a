//! Survey entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Survey lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyStatus {
    Open,
    Submitted,
}

impl From<String> for SurveyStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "submitted" => SurveyStatus::Submitted,
            _ => SurveyStatus::Open,
        }
    }
}

impl From<SurveyStatus> for String {
    fn from(status: SurveyStatus) -> Self {
        match status {
            SurveyStatus::Open => "open".to_string(),
            SurveyStatus::Submitted => "submitted".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "surveys")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub customer_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub created_at: DateTimeWithTimeZone,

    pub submitted_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Get the survey status as an enum
    pub fn survey_status(&self) -> SurveyStatus {
        SurveyStatus::from(self.status.clone())
    }

    pub fn is_submitted(&self) -> bool {
        self.survey_status() == SurveyStatus::Submitted
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
