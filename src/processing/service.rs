//! Claim service coordinating extraction, segmentation, retrieval, and decision rules.

use crate::{
    config::get_config,
    embedding::get_embedding_client,
    extraction::{FormatExtractor, TextExtractor},
    generative::get_generative_client,
    index::EmbeddingIndex,
    language::{HeuristicDetector, Lang, LanguageDetector},
    metrics::{ClaimMetrics, MetricsSnapshot},
    processing::{
        decision::{evaluate, DecisionRules},
        entities::QueryEntityExtractor,
        normalize::normalize,
        segment::ClauseSegmenter,
        types::{
            ClaimError, ClaimResult, Decision, QueryDetails, QueryEntities, RankedClause,
            RelevantClause,
        },
    },
    translation::{get_translation_client, TranslationService},
};
use async_trait::async_trait;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Coordinates the full claim pipeline: document extraction, clause segmentation,
/// semantic retrieval, rule evaluation, and response translation.
///
/// The service owns long-lived handles to every capability client and the metrics
/// registry so the HTTP surface reuses the same components across requests. Construct
/// it once near process start and share it through an `Arc`.
pub struct ClaimService {
    extractor: Box<dyn TextExtractor>,
    detector: Box<dyn LanguageDetector>,
    index: EmbeddingIndex,
    entity_extractor: QueryEntityExtractor,
    translator: TranslationService,
    metrics: Arc<ClaimMetrics>,
}

/// Abstraction over the claim pipeline used by the HTTP surface.
#[async_trait]
pub trait ClaimApi: Send + Sync {
    /// Evaluate one claim query against one uploaded policy document.
    async fn process_claim(
        &self,
        query: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ClaimResult, ClaimError>;

    /// Translate a pipeline error message into the language of `query`.
    async fn localize_error(&self, message: &str, query: &str) -> String;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl ClaimService {
    /// Build a service wired from configuration, with default capability clients.
    pub fn new() -> Self {
        let config = get_config();
        tracing::info!("Initializing claim service components");
        Self::with_components(
            Box::new(FormatExtractor::new()),
            Box::new(HeuristicDetector::new()),
            EmbeddingIndex::new(get_embedding_client(), config.embedding_cache_capacity),
            QueryEntityExtractor::new(get_generative_client()),
            TranslationService::new(get_translation_client(), config.translation_cache_capacity),
        )
    }

    /// Build a service from explicit components. Callers inject stubs here in tests.
    pub fn with_components(
        extractor: Box<dyn TextExtractor>,
        detector: Box<dyn LanguageDetector>,
        index: EmbeddingIndex,
        entity_extractor: QueryEntityExtractor,
        translator: TranslationService,
    ) -> Self {
        Self {
            extractor,
            detector,
            index,
            entity_extractor,
            translator,
            metrics: Arc::new(ClaimMetrics::new()),
        }
    }

    /// Run the pipeline end to end for one query/document pair.
    pub async fn process_claim(
        &self,
        query: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ClaimResult, ClaimError> {
        let config = get_config();
        let language = self.detector.detect(query);
        tracing::info!(
            filename,
            language = language.code(),
            query_chars = query.len(),
            "Processing claim"
        );

        let raw_text = self.extractor.extract(filename, bytes)?;
        let normalized = normalize(&raw_text);
        let segmenter = ClauseSegmenter::new(config.min_clause_length, config.max_clauses);
        let clauses = segmenter.segment(&normalized, filename);
        if clauses.is_empty() {
            return Err(ClaimError::EmptyDocument);
        }
        self.metrics.record_document(clauses.len() as u64);
        tracing::debug!(clauses = clauses.len(), "Segmented document");

        // All rule evaluation happens in English; the query is folded in first.
        let working_query = self.translator.translate(query, Lang::En, language).await;
        let entities = self.entity_extractor.extract(&working_query).await;

        let key = EmbeddingIndex::document_key(&normalized);
        let thresholds = [config.similarity_primary, config.similarity_fallback];
        let ranked = match self
            .index
            .retrieve(
                &working_query,
                &key,
                &clauses,
                config.top_k_clauses,
                &thresholds,
            )
            .await
        {
            Ok(ranked) => ranked,
            Err(error) => {
                tracing::warn!(%error, "Clause retrieval failed; deciding without evidence");
                Vec::new()
            }
        };
        tracing::debug!(retrieved = ranked.len(), "Retrieved candidate clauses");

        let rules = DecisionRules {
            default_coverage: config.default_coverage,
            maternity_waiting_months: config.maternity_waiting_months,
        };
        let decision = evaluate(&entities, &ranked, &working_query, &rules);
        tracing::info!(
            decision = decision.status.label(),
            confidence = decision.confidence,
            "Decision reached"
        );

        let result = self
            .render_result(language, &entities, decision, ranked)
            .await;
        self.metrics.record_claim();
        Ok(result)
    }

    /// Assemble the response payload, translating textual fields back in one batch.
    async fn render_result(
        &self,
        language: Lang,
        entities: &QueryEntities,
        decision: Decision,
        ranked: Vec<RankedClause>,
    ) -> ClaimResult {
        let mut batch = vec![
            decision.status.label().to_string(),
            decision.justification.clone(),
        ];
        let gender_at = entities.gender.map(|g| {
            batch.push(g.label().to_string());
            batch.len() - 1
        });
        let procedure_at = entities.procedure.as_ref().map(|p| {
            batch.push(p.clone());
            batch.len() - 1
        });
        let location_at = entities.location.as_ref().map(|l| {
            batch.push(l.clone());
            batch.len() - 1
        });
        let clauses_from = batch.len();
        batch.extend(ranked.iter().map(|r| r.clause.text.clone()));

        let translated = self.translator.translate_all(batch, language, Lang::En).await;

        let relevant_clauses = ranked
            .iter()
            .zip(translated[clauses_from..].iter())
            .map(|(r, text)| RelevantClause {
                text: text.clone(),
                source: r.clause.source.clone(),
                position: r.clause.position,
                confidence: round3(r.similarity),
            })
            .collect();

        ClaimResult {
            query_details: QueryDetails {
                age: entities.age,
                gender: gender_at.map(|i| translated[i].clone()),
                procedure: procedure_at.map(|i| translated[i].clone()),
                location: location_at.map(|i| translated[i].clone()),
                policy_duration: entities.policy_duration_months,
            },
            decision: translated[0].clone(),
            amount: decision.amount,
            justification: translated[1].clone(),
            confidence: round3(decision.confidence),
            relevant_clauses,
            language: language.display_name().to_string(),
            processed_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
        }
    }
}

impl Default for ClaimService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClaimApi for ClaimService {
    async fn process_claim(
        &self,
        query: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ClaimResult, ClaimError> {
        ClaimService::process_claim(self, query, filename, bytes).await
    }

    async fn localize_error(&self, message: &str, query: &str) -> String {
        let language = self.detector.detect(query);
        self.translator.translate(message, language, Lang::En).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}
