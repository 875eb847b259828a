//! Report artifact entity
//!
//! One canonical report per (customer, dimension, date); same-day
//! regeneration overwrites, older days are retained indefinitely.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stages of the report assembly pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStage {
    Pending,
    StatsComputed,
    ContextRetrieved,
    Drafted,
    Critiqued,
    Formatted,
    Stored,
    Failed,
}

impl ReportStage {
    /// Terminal states end the pipeline for this dimension
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStage::Stored | ReportStage::Failed)
    }

    /// Valid forward transition; Failed is reachable from any non-terminal
    /// stage, and Critiqued may be skipped when no critique config is active.
    pub fn can_advance_to(&self, next: ReportStage) -> bool {
        use ReportStage::*;
        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Pending, StatsComputed)
                | (StatsComputed, ContextRetrieved)
                | (ContextRetrieved, Drafted)
                | (Drafted, Critiqued)
                | (Drafted, Formatted)
                | (Critiqued, Formatted)
                | (Formatted, Stored)
        )
    }
}

impl From<String> for ReportStage {
    fn from(s: String) -> Self {
        match s.as_str() {
            "stats_computed" => ReportStage::StatsComputed,
            "context_retrieved" => ReportStage::ContextRetrieved,
            "drafted" => ReportStage::Drafted,
            "critiqued" => ReportStage::Critiqued,
            "formatted" => ReportStage::Formatted,
            "stored" => ReportStage::Stored,
            "failed" => ReportStage::Failed,
            _ => ReportStage::Pending,
        }
    }
}

impl From<ReportStage> for String {
    fn from(stage: ReportStage) -> Self {
        match stage {
            ReportStage::Pending => "pending".to_string(),
            ReportStage::StatsComputed => "stats_computed".to_string(),
            ReportStage::ContextRetrieved => "context_retrieved".to_string(),
            ReportStage::Drafted => "drafted".to_string(),
            ReportStage::Critiqued => "critiqued".to_string(),
            ReportStage::Formatted => "formatted".to_string(),
            ReportStage::Stored => "stored".to_string(),
            ReportStage::Failed => "failed".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub customer_id: Uuid,

    /// Dimension slug
    #[sea_orm(column_type = "Text")]
    pub dimension: String,

    pub report_date: Date,

    #[sea_orm(column_type = "Text")]
    pub stage: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub markdown_path: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub pdf_path: Option<String>,

    /// Last failure message, for operators; not returned to callers verbatim
    #[sea_orm(column_type = "Text", nullable)]
    pub error: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the pipeline stage as an enum
    pub fn report_stage(&self) -> ReportStage {
        ReportStage::from(self.stage.clone())
    }

    pub fn is_stored(&self) -> bool {
        self.report_stage() == ReportStage::Stored
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
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use ReportStage::*;
        let path = [
            Pending,
            StatsComputed,
            ContextRetrieved,
            Drafted,
            Critiqued,
            Formatted,
            Stored,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_critique_skippable() {
        assert!(ReportStage::Drafted.can_advance_to(ReportStage::Formatted));
    }

    #[test]
    fn test_terminal_stages_do_not_advance() {
        assert!(!ReportStage::Stored.can_advance_to(ReportStage::Failed));
        assert!(!ReportStage::Failed.can_advance_to(ReportStage::Pending));
    }

    #[test]
    fn test_failure_reachable_from_any_active_stage() {
        use ReportStage::*;
        for stage in [Pending, StatsComputed, ContextRetrieved, Drafted, Critiqued, Formatted] {
            assert!(stage.can_advance_to(Failed));
        }
    }

    #[test]
    fn test_no_backward_transition() {
        assert!(!ReportStage::Drafted.can_advance_to(ReportStage::Pending));
        assert!(!ReportStage::Formatted.can_advance_to(ReportStage::Drafted));
    }
}
