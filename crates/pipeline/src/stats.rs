//! Survey statistics aggregation
//!
//! Aggregates the raw 1-10 responses for one dimension into the numbers
//! the report prompt and the final document both consume. All statistics
//! are computed in one pass over the rows so the prompt and the rendered
//! report can never disagree.

use entrust_common::db::ResponseRow;
use entrust_common::dimension::Dimension;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Per-question aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionStat {
    pub question_id: Uuid,
    pub question_text: String,
    pub response_count: u32,
    pub mean: f64,
}

/// Aggregated statistics for one dimension of one survey
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionStats {
    pub dimension: Dimension,
    pub response_count: u32,
    pub mean: f64,
    /// Population variance of all scores
    pub variance: f64,
    /// Count of responses per score value, index 0 holds score 1
    pub distribution: [u32; 10],
    /// Per-question means in first-seen row order
    pub questions: Vec<QuestionStat>,
    /// Questions whose mean fell below the risk threshold
    pub low_scoring: Vec<QuestionStat>,
    pub risk_threshold: f64,
    /// Set when the dimension-wide mean is below the threshold
    pub risk_flag: bool,
}

impl DimensionStats {
    pub fn is_empty(&self) -> bool {
        self.response_count == 0
    }
}

/// Aggregate response rows for a dimension.
///
/// Scores outside 1-10 never reach this point; they are rejected at
/// submission time. Rows are grouped per question while preserving the
/// order the query returned them in, so repeated runs over the same
/// survey produce identical output.
pub fn aggregate(dimension: Dimension, rows: &[ResponseRow], risk_threshold: f64) -> DimensionStats {
    let mut distribution = [0u32; 10];
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;

    let mut order: Vec<Uuid> = Vec::new();
    let mut per_question: BTreeMap<Uuid, (String, u32, f64)> = BTreeMap::new();

    for row in rows {
        let score = row.score as f64;
        sum += score;
        sum_sq += score * score;

        let bucket = (row.score.clamp(1, 10) - 1) as usize;
        distribution[bucket] += 1;

        let entry = per_question
            .entry(row.question_id)
            .or_insert_with(|| {
                order.push(row.question_id);
                (row.question_text.clone(), 0, 0.0)
            });
        entry.1 += 1;
        entry.2 += score;
    }

    let count = rows.len() as u32;
    let (mean, variance) = if count == 0 {
        (0.0, 0.0)
    } else {
        let n = count as f64;
        let mean = sum / n;
        (mean, sum_sq / n - mean * mean)
    };

    let questions: Vec<QuestionStat> = order
        .into_iter()
        .map(|id| {
            let (text, n, total) = per_question
                .remove(&id)
                .unwrap_or((String::new(), 0, 0.0));
            QuestionStat {
                question_id: id,
                question_text: text,
                response_count: n,
                mean: if n == 0 { 0.0 } else { total / n as f64 },
            }
        })
        .collect();

    let low_scoring: Vec<QuestionStat> = questions
        .iter()
        .filter(|q| q.mean < risk_threshold)
        .cloned()
        .collect();

    DimensionStats {
        dimension,
        response_count: count,
        mean,
        variance,
        distribution,
        questions,
        low_scoring,
        risk_threshold,
        risk_flag: count > 0 && mean < risk_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(question: Uuid, text: &str, score: i32) -> ResponseRow {
        ResponseRow {
            question_id: question,
            question_text: text.to_string(),
            score,
            comment: None,
        }
    }

    #[test]
    fn test_low_mean_dimension_flagged_as_risk() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let scores = [2, 3, 2, 4, 3, 2, 3, 4, 2, 3];
        let rows: Vec<ResponseRow> = scores
            .iter()
            .enumerate()
            .map(|(i, &s)| row(if i % 2 == 0 { q1 } else { q2 }, "q", s))
            .collect();

        let stats = aggregate(Dimension::DataQuality, &rows, 5.0);

        assert_eq!(stats.response_count, 10);
        assert!((stats.mean - 2.8).abs() < 1e-9);
        assert!(stats.risk_flag);
        assert_eq!(stats.low_scoring.len(), 2);
    }

    #[test]
    fn test_healthy_dimension_not_flagged() {
        let q = Uuid::new_v4();
        let rows: Vec<ResponseRow> = [8, 9, 7, 8].iter().map(|&s| row(q, "q", s)).collect();

        let stats = aggregate(Dimension::DataSecurity, &rows, 5.0);
        assert!(!stats.risk_flag);
        assert!(stats.low_scoring.is_empty());
        assert!((stats.mean - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_population_variance() {
        let q = Uuid::new_v4();
        let rows: Vec<ResponseRow> = [2, 4, 6, 8].iter().map(|&s| row(q, "q", s)).collect();

        let stats = aggregate(Dimension::DataPrivacy, &rows, 5.0);
        // mean 5, squared deviations 9+1+1+9 = 20, /4 = 5
        assert!((stats.variance - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_buckets() {
        let q = Uuid::new_v4();
        let rows: Vec<ResponseRow> = [1, 1, 5, 10].iter().map(|&s| row(q, "q", s)).collect();

        let stats = aggregate(Dimension::DataArchitecture, &rows, 5.0);
        assert_eq!(stats.distribution[0], 2);
        assert_eq!(stats.distribution[4], 1);
        assert_eq!(stats.distribution[9], 1);
        assert_eq!(stats.distribution.iter().sum::<u32>(), 4);
    }

    #[test]
    fn test_empty_rows_produce_empty_stats() {
        let stats = aggregate(Dimension::DataLiteracy, &[], 5.0);
        assert!(stats.is_empty());
        assert_eq!(stats.mean, 0.0);
        assert!(!stats.risk_flag);
    }

    #[test]
    fn test_question_order_is_first_seen() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let rows = vec![row(q2, "second", 5), row(q1, "first", 5), row(q2, "second", 7)];

        let stats = aggregate(Dimension::MetadataManagement, &rows, 5.0);
        assert_eq!(stats.questions[0].question_text, "second");
        assert_eq!(stats.questions[1].question_text, "first");
        assert!((stats.questions[0].mean - 6.0).abs() < 1e-9);
    }
}
