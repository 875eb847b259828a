//! Per-dimension report generation pipeline
//!
//! Drives one report through its stage progression: aggregate statistics,
//! retrieve standards context, draft, critique, format, store. Each stage
//! transition is persisted before the next begins so an interrupted run
//! leaves an accurate record, and a failure at any point moves the report
//! to the failed stage with the cause attached.

use crate::{markdown, pdf, prompt, stats};
use entrust_common::config::AppConfig;
use entrust_common::db::models::{Customer, LlmConfig, LlmPurpose, Report, ReportStage};
use entrust_common::db::Repository;
use entrust_common::dimension::Dimension;
use entrust_common::errors::{AppError, Result};
use entrust_common::llm::LlmClient;
use entrust_common::metrics;
use entrust_common::rag::StandardsRetriever;
use entrust_common::storage::{artifact_path, ArtifactFormat, StorageFactory};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use uuid::Uuid;

/// Result of one dimension's generation attempt
#[derive(Debug, Clone, Serialize)]
pub struct DimensionOutcome {
    pub dimension: Dimension,
    pub stage: ReportStage,
    pub report_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A stored same-day report is returned as-is, with no provider call,
/// unless the caller forces regeneration. Unfinished and failed reports
/// are always retried.
fn should_reuse_existing(existing: &Report, force_regenerate: bool) -> bool {
    !force_regenerate && existing.is_stored()
}

/// Orchestrates report generation across dimensions
#[derive(Clone)]
pub struct ReportGenerator {
    repo: Repository,
    llm: Arc<LlmClient>,
    retriever: Arc<StandardsRetriever>,
    storage: Arc<StorageFactory>,
    config: Arc<AppConfig>,
}

impl ReportGenerator {
    pub fn new(
        repo: Repository,
        llm: Arc<LlmClient>,
        retriever: Arc<StandardsRetriever>,
        storage: Arc<StorageFactory>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            repo,
            llm,
            retriever,
            storage,
            config,
        }
    }

    /// Generate reports for every dimension of a submitted survey.
    ///
    /// Dimensions run concurrently, each under the configured generation
    /// timeout. One dimension failing or timing out never aborts the
    /// others; the caller gets a per-dimension outcome either way.
    pub async fn generate_all(
        &self,
        customer: &Customer,
        survey_id: Uuid,
        report_date: NaiveDate,
        force_regenerate: bool,
    ) -> Vec<DimensionOutcome> {
        let timeout = self.config.generation_timeout();
        let mut set = JoinSet::new();

        for dimension in Dimension::ALL {
            let generator = self.clone();
            let customer = customer.clone();
            set.spawn(async move {
                let outcome = match tokio::time::timeout(
                    timeout,
                    generator.generate_dimension(
                        &customer,
                        survey_id,
                        dimension,
                        report_date,
                        force_regenerate,
                    ),
                )
                .await
                {
                    Ok(Ok(report)) => DimensionOutcome {
                        dimension,
                        stage: report.report_stage(),
                        report_id: Some(report.id),
                        error: None,
                    },
                    Ok(Err(e)) => DimensionOutcome {
                        dimension,
                        stage: ReportStage::Failed,
                        report_id: None,
                        error: Some(e.public_message()),
                    },
                    Err(_) => {
                        generator
                            .mark_failed(
                                &customer,
                                dimension,
                                report_date,
                                format!(
                                    "Generation exceeded the {}s timeout",
                                    timeout.as_secs()
                                ),
                            )
                            .await;
                        DimensionOutcome {
                            dimension,
                            stage: ReportStage::Failed,
                            report_id: None,
                            error: Some("Report generation timed out".to_string()),
                        }
                    }
                };
                (dimension, outcome)
            });
        }

        let mut outcomes: Vec<(Dimension, DimensionOutcome)> = Vec::with_capacity(8);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(pair) => outcomes.push(pair),
                Err(e) => tracing::error!(error = %e, "Report generation task panicked"),
            }
        }

        // Stable dimension order regardless of completion order
        outcomes.sort_by_key(|(d, _)| Dimension::ALL.iter().position(|x| x == d));
        outcomes.into_iter().map(|(_, o)| o).collect()
    }

    /// Generate one dimension's report end to end.
    ///
    /// A same-day report already in the stored stage is returned as-is
    /// unless regeneration is forced; no provider call is made.
    pub async fn generate_dimension(
        &self,
        customer: &Customer,
        survey_id: Uuid,
        dimension: Dimension,
        report_date: NaiveDate,
        force_regenerate: bool,
    ) -> Result<Report> {
        if let Some(existing) = self
            .repo
            .find_report(customer.id, dimension, report_date)
            .await?
        {
            if should_reuse_existing(&existing, force_regenerate) {
                tracing::info!(
                    customer = %customer.code,
                    dimension = %dimension,
                    "Same-day report already stored, skipping regeneration"
                );
                return Ok(existing);
            }
        }

        let started = Instant::now();
        let report = self
            .repo
            .begin_report(customer.id, dimension, report_date)
            .await?;

        match self
            .run_stages(customer, survey_id, dimension, report_date, report)
            .await
        {
            Ok(report) => {
                metrics::record_report(started.elapsed().as_secs_f64(), dimension.slug(), true);
                tracing::info!(
                    customer = %customer.code,
                    dimension = %dimension,
                    elapsed_secs = started.elapsed().as_secs(),
                    "Report generated and stored"
                );
                Ok(report)
            }
            Err(e) => {
                metrics::record_report(started.elapsed().as_secs_f64(), dimension.slug(), false);
                tracing::error!(
                    customer = %customer.code,
                    dimension = %dimension,
                    error = %e,
                    "Report generation failed"
                );
                self.mark_failed(customer, dimension, report_date, e.to_string())
                    .await;
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        customer: &Customer,
        survey_id: Uuid,
        dimension: Dimension,
        report_date: NaiveDate,
        report: Report,
    ) -> Result<Report> {
        let rows = self
            .repo
            .responses_for_dimension(survey_id, dimension)
            .await?;
        if rows.is_empty() {
            return Err(AppError::Validation {
                message: format!("No responses recorded for dimension {}", dimension),
                field: None,
            });
        }

        let stats = stats::aggregate(dimension, &rows, self.config.report.risk_threshold);
        let report = self
            .repo
            .advance_report_stage(report, ReportStage::StatsComputed)
            .await?;

        let context = self
            .retriever
            .query(
                dimension,
                &format!("{} best practices and maturity criteria", dimension.title()),
            )
            .await;
        let report = self
            .repo
            .advance_report_stage(report, ReportStage::ContextRetrieved)
            .await?;

        let draft_config = self.active_config(LlmPurpose::Report).await?;
        let evidence = self
            .prepare_evidence(&draft_config, dimension, &stats, &rows)
            .await?;

        let messages = prompt::build_draft_messages(&customer.name, &stats, &evidence, &context);
        let mut analysis = self
            .llm
            .generate(&draft_config, &messages, self.config.report.max_output_tokens)
            .await?;
        let mut report = self
            .repo
            .advance_report_stage(report, ReportStage::Drafted)
            .await?;

        // The critique stage is optional; a draft may advance straight
        // to formatting when no critique config is active
        if self.config.report.critique_enabled {
            if let Some(critique_config) =
                self.repo.find_active_llm_config(LlmPurpose::Critique).await?
            {
                let messages = prompt::build_critique_messages(&stats, &analysis);
                analysis = self
                    .llm
                    .generate(
                        &critique_config,
                        &messages,
                        self.config.report.max_output_tokens,
                    )
                    .await?;
                report = self
                    .repo
                    .advance_report_stage(report, ReportStage::Critiqued)
                    .await?;
            }
        }

        let document = markdown::format_report(&customer.name, &stats, report_date, &analysis);
        let pdf_bytes = pdf::render_pdf(&document)?;
        let report = self
            .repo
            .advance_report_stage(report, ReportStage::Formatted)
            .await?;

        let store = self.storage.for_customer(customer)?;
        let markdown_path =
            artifact_path(&customer.code, dimension, report_date, ArtifactFormat::Markdown)?;
        let pdf_path = artifact_path(&customer.code, dimension, report_date, ArtifactFormat::Pdf)?;

        store
            .save(
                &markdown_path,
                document.as_bytes(),
                ArtifactFormat::Markdown.content_type(),
            )
            .await?;
        store
            .save(&pdf_path, &pdf_bytes, ArtifactFormat::Pdf.content_type())
            .await?;

        let report = self
            .repo
            .set_report_paths(report, markdown_path, pdf_path)
            .await?;
        self.repo
            .advance_report_stage(report, ReportStage::Stored)
            .await
    }

    /// Summarize the survey payload chunk by chunk when it exceeds the
    /// provider context window, otherwise pass it through untouched.
    async fn prepare_evidence(
        &self,
        config: &LlmConfig,
        dimension: Dimension,
        stats: &stats::DimensionStats,
        rows: &[entrust_common::db::ResponseRow],
    ) -> Result<String> {
        let payload = prompt::render_survey_payload(stats, rows);
        let window = self.config.llm.context_window_chars;
        if payload.len() <= window {
            return Ok(payload);
        }

        let chunks = prompt::chunk_payload(&payload, window);
        tracing::info!(
            dimension = %dimension,
            payload_chars = payload.len(),
            chunks = chunks.len(),
            "Survey payload exceeds context window, summarizing chunks"
        );

        let mut summaries = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let messages = prompt::build_chunk_summary_messages(dimension, chunk);
            summaries.push(
                self.llm
                    .generate(config, &messages, self.config.report.max_output_tokens)
                    .await?,
            );
        }
        Ok(summaries.join("\n\n"))
    }

    async fn active_config(&self, purpose: LlmPurpose) -> Result<LlmConfig> {
        self.repo
            .find_active_llm_config(purpose)
            .await?
            .ok_or_else(|| AppError::LlmConfigNotFound {
                purpose: String::from(purpose),
            })
    }

    async fn mark_failed(
        &self,
        customer: &Customer,
        dimension: Dimension,
        report_date: NaiveDate,
        error: String,
    ) {
        match self.repo.find_report(customer.id, dimension, report_date).await {
            Ok(Some(report)) if !report.report_stage().is_terminal() => {
                if let Err(e) = self.repo.fail_report(report, error).await {
                    tracing::error!(
                        dimension = %dimension,
                        error = %e,
                        "Could not record report failure"
                    );
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(dimension = %dimension, error = %e, "Could not load report to fail it");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn report_at(stage: ReportStage) -> Report {
        Report {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            dimension: Dimension::DataQuality.slug().to_string(),
            report_date: Utc::now().date_naive(),
            stage: String::from(stage),
            markdown_path: None,
            pdf_path: None,
            error: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_stored_same_day_report_reused_without_regeneration() {
        let stored = report_at(ReportStage::Stored);
        assert!(should_reuse_existing(&stored, false));
    }

    #[test]
    fn test_force_regenerate_overrides_stored_report() {
        let stored = report_at(ReportStage::Stored);
        assert!(!should_reuse_existing(&stored, true));
    }

    #[test]
    fn test_unfinished_and_failed_reports_always_retried() {
        for stage in [
            ReportStage::Pending,
            ReportStage::Drafted,
            ReportStage::Formatted,
            ReportStage::Failed,
        ] {
            let report = report_at(stage);
            assert!(!should_reuse_existing(&report, false), "{:?}", stage);
        }
    }
}
