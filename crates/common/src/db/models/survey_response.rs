//! Survey response entity
//!
//! Unique on (survey, question, user); answers are upserted incrementally as
//! participants work through a dimension.

use crate::errors::AppError;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum free-text comment length
pub const MAX_COMMENT_CHARS: usize = 2000;

/// Validate one answer before anything reaches the database
pub fn validate_answer(score: i32, comment: Option<&str>) -> crate::errors::Result<()> {
    if !(1..=10).contains(&score) {
        return Err(AppError::ScoreOutOfRange { score });
    }
    if let Some(comment) = comment {
        if comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(AppError::CommentTooLong {
                limit: MAX_COMMENT_CHARS,
            });
        }
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "survey_responses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub survey_id: Uuid,

    pub question_id: Uuid,

    pub user_id: Uuid,

    /// Bounded 1-10 inclusive, validated at the API boundary
    pub score: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::survey::Entity",
        from = "Column::SurveyId",
        to = "super::survey::Column::Id",
        on_delete = "Cascade"
    )]
    Survey,

    #[sea_orm(
        belongs_to = "super::question::Entity",
        from = "Column::QuestionId",
        to = "super::question::Column::Id"
    )]
    Question,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::survey::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Survey.def()
    }
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_outside_range_rejected() {
        for score in [0, -1, 11, 100] {
            let err = validate_answer(score, None).unwrap_err();
            assert!(matches!(err, AppError::ScoreOutOfRange { .. }), "{score}");
        }
    }

    #[test]
    fn test_full_score_range_accepted() {
        for score in 1..=10 {
            assert!(validate_answer(score, None).is_ok(), "{score}");
        }
    }

    #[test]
    fn test_comment_over_cap_rejected() {
        let long = "x".repeat(MAX_COMMENT_CHARS + 1);
        let err = validate_answer(5, Some(&long)).unwrap_err();
        assert!(matches!(err, AppError::CommentTooLong { .. }));
    }

    #[test]
    fn test_comment_cap_counts_chars_not_bytes() {
        // Multibyte comment at exactly the cap
        let at_cap = "é".repeat(MAX_COMMENT_CHARS);
        assert!(validate_answer(5, Some(&at_cap)).is_ok());
    }
}
