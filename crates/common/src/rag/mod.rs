//! Retrieval-augmented standards lookup
//!
//! Pulls the most relevant standards passages for a dimension into the
//! maturity-assessment prompt. Retrieval failure must never fail report
//! generation: every error path degrades to an empty context string.

use crate::db::Repository;
use crate::dimension::Dimension;
use crate::embeddings::Embedder;
use crate::errors::Result;
use std::sync::Arc;

/// Retriever over the standards knowledge base
pub struct StandardsRetriever {
    repo: Repository,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl StandardsRetriever {
    pub fn new(repo: Repository, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            repo,
            embedder,
            top_k,
        }
    }

    /// Top-K passages for a dimension, formatted for prompt injection.
    /// Degrades to an empty string on any failure.
    pub async fn query(&self, dimension: Dimension, query_text: &str) -> String {
        match self.try_query(dimension, query_text).await {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(
                    dimension = %dimension,
                    error = %e,
                    "Standards retrieval unavailable, continuing without context"
                );
                crate::metrics::record_rag_degraded(dimension.slug());
                String::new()
            }
        }
    }

    async fn try_query(&self, dimension: Dimension, query_text: &str) -> Result<String> {
        let embedding = self.embedder.embed(query_text).await?;
        let passages = self
            .repo
            .search_standards(dimension, &embedding, self.top_k)
            .await?;

        Ok(format_context(&passages))
    }
}

/// Render retrieved passages as a prompt section
fn format_context(passages: &[(String, String, f64)]) -> String {
    if passages.is_empty() {
        return String::new();
    }

    let mut context = String::from("Relevant standards guidance:\n");
    for (i, (source, content, _score)) in passages.iter().enumerate() {
        context.push_str(&format!("\n[{}] {}\n{}\n", i + 1, source, content));
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_context_empty() {
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn test_format_context_numbers_passages() {
        let passages = vec![
            (
                "DAMA-DMBOK ch.13".to_string(),
                "Data quality dimensions include accuracy and completeness.".to_string(),
                0.91,
            ),
            (
                "ISO 8000-61".to_string(),
                "Data quality management requires defined processes.".to_string(),
                0.87,
            ),
        ];

        let context = format_context(&passages);
        assert!(context.starts_with("Relevant standards guidance:"));
        assert!(context.contains("[1] DAMA-DMBOK ch.13"));
        assert!(context.contains("[2] ISO 8000-61"));
    }
}
