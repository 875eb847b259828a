//! Markdown report document assembly

use crate::stats::DimensionStats;
use chrono::NaiveDate;

/// Assemble the final markdown document around the model-written analysis
pub fn format_report(
    customer_name: &str,
    stats: &DimensionStats,
    report_date: NaiveDate,
    analysis: &str,
) -> String {
    let mut doc = String::new();

    doc.push_str(&format!(
        "# {} Assessment: {}\n\n",
        stats.dimension.title(),
        customer_name
    ));
    doc.push_str(&format!(
        "*Report date: {}*\n\n",
        report_date.format("%Y-%m-%d")
    ));

    doc.push_str("## Survey Summary\n\n");
    doc.push_str(&format!(
        "| Metric | Value |\n|---|---|\n| Responses | {} |\n| Mean score | {:.2} / 10 |\n| Score variance | {:.2} |\n",
        stats.response_count, stats.mean, stats.variance
    ));
    if stats.risk_flag {
        doc.push_str(&format!(
            "\n> **Risk area**: the overall mean falls below the {:.1} threshold.\n",
            stats.risk_threshold
        ));
    }

    doc.push_str("\n### Score Distribution\n\n| Score | Responses |\n|---|---|\n");
    for (i, count) in stats.distribution.iter().enumerate() {
        doc.push_str(&format!("| {} | {} |\n", i + 1, count));
    }

    doc.push_str("\n### Question Scores\n\n| Question | Mean | Responses |\n|---|---|---|\n");
    for q in &stats.questions {
        doc.push_str(&format!(
            "| {} | {:.1} | {} |\n",
            q.question_text.replace('|', "\\|"),
            q.mean,
            q.response_count
        ));
    }

    if !stats.low_scoring.is_empty() {
        doc.push_str("\n### Attention Areas\n\n");
        for q in &stats.low_scoring {
            doc.push_str(&format!(
                "- **{}** scored {:.1}, below the {:.1} threshold\n",
                q.question_text, q.mean, stats.risk_threshold
            ));
        }
    }

    doc.push_str("\n## Analysis\n\n");
    doc.push_str(analysis.trim());
    doc.push('\n');

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::aggregate;
    use entrust_common::db::ResponseRow;
    use entrust_common::dimension::Dimension;
    use uuid::Uuid;

    fn stats() -> DimensionStats {
        let q = Uuid::new_v4();
        let rows: Vec<ResponseRow> = [2, 3, 4]
            .iter()
            .map(|&s| ResponseRow {
                question_id: q,
                question_text: "Pipes | in question".to_string(),
                score: s,
                comment: None,
            })
            .collect();
        aggregate(Dimension::DataQuality, &rows, 5.0)
    }

    #[test]
    fn test_document_structure() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let doc = format_report("Acme Corp", &stats(), date, "Body of the analysis.");

        assert!(doc.starts_with("# Data Quality Assessment: Acme Corp"));
        assert!(doc.contains("Report date: 2026-03-14"));
        assert!(doc.contains("| Responses | 3 |"));
        assert!(doc.contains("## Analysis\n\nBody of the analysis."));
    }

    #[test]
    fn test_risk_callout_present_when_flagged() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let doc = format_report("Acme Corp", &stats(), date, "body");
        assert!(doc.contains("**Risk area**"));
        assert!(doc.contains("### Attention Areas"));
    }

    #[test]
    fn test_table_cells_escape_pipes() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let doc = format_report("Acme Corp", &stats(), date, "body");
        assert!(doc.contains("Pipes \\| in question"));
    }
}
