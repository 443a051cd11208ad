//! Core data types and error definitions for the claim pipeline.

use crate::extraction::ExtractionError;
use serde::Serialize;
use thiserror::Error;

/// A discrete coverage/exclusion statement segmented from policy text.
///
/// Unique per document by exact text equality and immutable once accepted; `position` is the
/// ordinal of acceptance within its document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// Clause text as it appears after normalization and joining.
    pub text: String,
    /// Identifier of the source document (upload filename).
    pub source: String,
    /// Ordinal index among accepted clauses of this document.
    pub position: usize,
    /// Character length of the clause text.
    pub length: usize,
}

/// Closed gender classification extracted from queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    /// Masculine surface forms.
    Male,
    /// Feminine surface forms.
    Female,
}

impl Gender {
    /// English label used in responses (translated downstream).
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

/// Structured fields extracted from a claim query.
///
/// Created per request, filled during extraction, and never persisted. Any field may remain
/// unset when neither the pattern rules nor the generative fallback produce a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryEntities {
    /// Claimant age in years.
    pub age: Option<u32>,
    /// Claimant gender.
    pub gender: Option<Gender>,
    /// Medical procedure named in the query.
    pub procedure: Option<String>,
    /// Location named in the query.
    pub location: Option<String>,
    /// Declared policy duration in months.
    pub policy_duration_months: Option<u32>,
}

impl QueryEntities {
    /// Whether every field has been populated.
    pub fn is_complete(&self) -> bool {
        self.age.is_some()
            && self.gender.is_some()
            && self.procedure.is_some()
            && self.location.is_some()
            && self.policy_duration_months.is_some()
    }
}

/// Outcome of the rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionStatus {
    /// Claim approved for the default coverage amount.
    Approved,
    /// Claim rejected.
    Rejected,
}

impl DecisionStatus {
    /// English label used in responses (translated downstream).
    pub fn label(self) -> &'static str {
        match self {
            DecisionStatus::Approved => "Approved",
            DecisionStatus::Rejected => "Rejected",
        }
    }
}

/// Decision record produced by the rule evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Approve/reject outcome.
    pub status: DecisionStatus,
    /// Payout amount, present only on approval.
    pub amount: Option<u64>,
    /// Human-readable justification in the processing language.
    pub justification: String,
    /// Similarity of the clause that produced the decision, 0 when none did.
    pub confidence: f32,
}

impl Decision {
    /// Default outcome before any rule fires.
    pub fn default_rejected() -> Self {
        Self {
            status: DecisionStatus::Rejected,
            amount: None,
            justification: "No relevant coverage found or insufficient policy duration."
                .to_string(),
            confidence: 0.0,
        }
    }
}

/// A clause paired with its query similarity, as returned by retrieval.
#[derive(Debug, Clone)]
pub struct RankedClause {
    /// The retrieved clause.
    pub clause: Clause,
    /// Cosine similarity against the query, in `[0, 1]`.
    pub similarity: f32,
}

/// Extracted query fields as presented in the response (translated where textual).
#[derive(Debug, Clone, Serialize)]
pub struct QueryDetails {
    /// Claimant age.
    pub age: Option<u32>,
    /// Gender label, translated into the response language.
    pub gender: Option<String>,
    /// Procedure, translated into the response language.
    pub procedure: Option<String>,
    /// Location, translated into the response language.
    pub location: Option<String>,
    /// Declared policy duration in months.
    pub policy_duration: Option<u32>,
}

/// One retrieved clause in the response payload.
#[derive(Debug, Clone, Serialize)]
pub struct RelevantClause {
    /// Clause text, translated into the response language.
    pub text: String,
    /// Source document identifier.
    pub source: String,
    /// Clause position within its document.
    pub position: usize,
    /// Similarity against the query, rounded to three decimals.
    pub confidence: f32,
}

/// Full structured result of one claim evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimResult {
    /// Extracted query fields.
    #[serde(rename = "QueryDetails")]
    pub query_details: QueryDetails,
    /// Decision label in the response language.
    #[serde(rename = "Decision")]
    pub decision: String,
    /// Payout amount, present only on approval.
    #[serde(rename = "Amount")]
    pub amount: Option<u64>,
    /// Justification in the response language.
    #[serde(rename = "Justification")]
    pub justification: String,
    /// Similarity of the deciding clause.
    #[serde(rename = "Confidence")]
    pub confidence: f32,
    /// Retrieved clauses, similarity-descending.
    #[serde(rename = "RelevantClauses")]
    pub relevant_clauses: Vec<RelevantClause>,
    /// Display name of the response language.
    #[serde(rename = "Language")]
    pub language: String,
    /// RFC 3339 timestamp of processing completion.
    #[serde(rename = "ProcessedAt")]
    pub processed_at: String,
}

/// Fatal errors surfaced by the claim pipeline.
///
/// Everything else (embedder, translator, generative extractor failures, empty retrieval)
/// degrades to a defined fallback at its call site and never crosses this boundary.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Document could not be read or contained no text.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// Segmentation produced zero acceptable clauses.
    #[error("No content extracted from document")]
    EmptyDocument,
}
