//! Prompt assembly for report generation
//!
//! Builds the chat payloads for drafting, chunk summarization, and the
//! critique pass. Survey payloads that exceed the provider context window
//! are split on markdown boundaries and summarized chunk by chunk before
//! the final synthesis prompt.

use crate::stats::DimensionStats;
use entrust_common::db::ResponseRow;
use entrust_common::dimension::Dimension;
use entrust_common::llm::ChatMessage;
use text_splitter::MarkdownSplitter;

const SYSTEM_PROMPT: &str = "You are a data governance consultant producing an assessment \
report from survey evidence. Write in measured, professional prose. Ground every claim in \
the survey data or the provided standards excerpts. Structure the analysis as: current \
state, key strengths, key risks, and prioritized recommendations. Output markdown body \
text only, without a top-level title.";

const CRITIQUE_SYSTEM_PROMPT: &str = "You are a senior reviewer of data governance \
assessment reports. Revise the draft for accuracy against the survey statistics, remove \
unsupported claims, and tighten the prose. Return the full revised report body and \
nothing else.";

/// Render the survey evidence block fed to the model.
///
/// One markdown section per question with its mean and each free-text
/// comment, so the splitter can cut on question boundaries when the
/// payload is chunked.
pub fn render_survey_payload(stats: &DimensionStats, rows: &[ResponseRow]) -> String {
    let mut out = String::new();

    for question in &stats.questions {
        out.push_str(&format!(
            "## {}\nMean score: {:.1}/10 across {} responses\n",
            question.question_text, question.mean, question.response_count
        ));

        let mut has_comments = false;
        for row in rows
            .iter()
            .filter(|r| r.question_id == question.question_id)
        {
            if let Some(comment) = row.comment.as_deref().filter(|c| !c.trim().is_empty()) {
                if !has_comments {
                    out.push_str("Comments:\n");
                    has_comments = true;
                }
                out.push_str(&format!("- (score {}) {}\n", row.score, comment.trim()));
            }
        }
        out.push('\n');
    }

    out
}

/// Split an oversized payload into chunks that fit the context window
pub fn chunk_payload(payload: &str, max_chars: usize) -> Vec<String> {
    MarkdownSplitter::new(max_chars)
        .chunks(payload)
        .map(str::to_string)
        .collect()
}

fn stats_summary_block(stats: &DimensionStats) -> String {
    let mut block = format!(
        "Dimension: {}\nResponses: {}\nOverall mean: {:.2}/10\nScore variance: {:.2}\n",
        stats.dimension.title(),
        stats.response_count,
        stats.mean,
        stats.variance,
    );
    if stats.risk_flag {
        block.push_str(&format!(
            "RISK: the overall mean is below the {:.1} risk threshold.\n",
            stats.risk_threshold
        ));
    }
    if !stats.low_scoring.is_empty() {
        block.push_str("Low-scoring questions:\n");
        for q in &stats.low_scoring {
            block.push_str(&format!("- {} (mean {:.1})\n", q.question_text, q.mean));
        }
    }
    block
}

/// Messages for the main drafting call
pub fn build_draft_messages(
    customer_name: &str,
    stats: &DimensionStats,
    survey_evidence: &str,
    standards_context: &str,
) -> Vec<ChatMessage> {
    let mut user = format!(
        "Write the {} assessment for {}.\n\n# Statistics\n{}\n# Survey evidence\n{}",
        stats.dimension.title(),
        customer_name,
        stats_summary_block(stats),
        survey_evidence,
    );
    if !standards_context.is_empty() {
        user.push_str(&format!(
            "\n# Relevant standards\n{}\nCite these standards where they support a finding.",
            standards_context
        ));
    }

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}

/// Messages summarizing one chunk of an oversized payload
pub fn build_chunk_summary_messages(dimension: Dimension, chunk: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "Summarize survey evidence for a data governance assessment. Preserve question \
             names, mean scores, and any concrete problems respondents describe. Be concise.",
        ),
        ChatMessage::user(format!(
            "Summarize this portion of the {} survey evidence:\n\n{}",
            dimension.title(),
            chunk
        )),
    ]
}

/// Messages for the critique pass over a finished draft
pub fn build_critique_messages(stats: &DimensionStats, draft: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(CRITIQUE_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "# Statistics\n{}\n# Draft report\n{}",
            stats_summary_block(stats),
            draft
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::aggregate;
    use uuid::Uuid;

    fn sample_rows() -> Vec<ResponseRow> {
        let q = Uuid::new_v4();
        vec![
            ResponseRow {
                question_id: q,
                question_text: "Is data quality measured?".to_string(),
                score: 3,
                comment: Some("No automated checks exist".to_string()),
            },
            ResponseRow {
                question_id: q,
                question_text: "Is data quality measured?".to_string(),
                score: 4,
                comment: None,
            },
        ]
    }

    #[test]
    fn test_payload_includes_comments_and_means() {
        let rows = sample_rows();
        let stats = aggregate(Dimension::DataQuality, &rows, 5.0);
        let payload = render_survey_payload(&stats, &rows);

        assert!(payload.contains("## Is data quality measured?"));
        assert!(payload.contains("Mean score: 3.5/10"));
        assert!(payload.contains("No automated checks exist"));
    }

    #[test]
    fn test_chunking_respects_max_chars() {
        let payload = "## Question one\ntext\n\n".repeat(50);
        let chunks = chunk_payload(&payload, 200);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 200, "chunk of {} chars", chunk.len());
        }
    }

    #[test]
    fn test_small_payload_stays_single_chunk() {
        let chunks = chunk_payload("## Q\nshort", 1000);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_draft_messages_carry_risk_flag() {
        let rows = sample_rows();
        let stats = aggregate(Dimension::DataQuality, &rows, 5.0);
        let messages = build_draft_messages("Acme Corp", &stats, "evidence", "");

        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("RISK"));
        assert!(messages[1].content.contains("Acme Corp"));
        assert!(!messages[1].content.contains("Relevant standards"));
    }

    #[test]
    fn test_draft_messages_include_standards_when_present() {
        let rows = sample_rows();
        let stats = aggregate(Dimension::DataQuality, &rows, 5.0);
        let messages =
            build_draft_messages("Acme Corp", &stats, "evidence", "[1] DAMA-DMBOK\nprofiling");

        assert!(messages[1].content.contains("Relevant standards"));
        assert!(messages[1].content.contains("DAMA-DMBOK"));
    }

    #[test]
    fn test_critique_messages_embed_draft() {
        let rows = sample_rows();
        let stats = aggregate(Dimension::DataQuality, &rows, 5.0);
        let messages = build_critique_messages(&stats, "The draft body");

        assert!(messages[1].content.contains("The draft body"));
    }
}
