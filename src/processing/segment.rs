//! Clause segmentation for normalized policy text.
//!
//! Documents split into sections at heading markers; within a section, sub-item markers
//! (`a)`, `1)`, bullets) flush the running buffer as a clause candidate while other lines
//! join it as soft-wrapped continuations. Candidates pass an acceptance policy before they
//! become [`Clause`] records: minimum length, exact-text dedup within the document, no
//! boilerplate signature, and a global cap.

use crate::processing::types::Clause;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::LazyLock;

static SECTION_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\n\s*(?:\d+\.\s+|[A-Z]\.\s+|[ivxlc]+\.\s+)").expect("valid heading pattern")
});

static SUB_ITEM_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[0-9A-Za-z]\)\s|^\s*[-*•]\s").expect("valid sub-item pattern")
});

static BOILERPLATE_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(UIN|IRDAI|CIN:|Email:|Website:)").expect("valid signature pattern")
});

/// Clause segmenter with its acceptance thresholds.
#[derive(Debug, Clone, Copy)]
pub struct ClauseSegmenter {
    min_clause_length: usize,
    max_clauses: usize,
}

impl ClauseSegmenter {
    /// Build a segmenter accepting clauses of at least `min_clause_length` characters and at
    /// most `max_clauses` per document.
    pub fn new(min_clause_length: usize, max_clauses: usize) -> Self {
        Self {
            min_clause_length,
            max_clauses,
        }
    }

    /// Segment normalized text into accepted clauses for `source`.
    ///
    /// Deterministic: identical input yields an identical ordered clause list. Positions are
    /// assigned in acceptance order starting at zero.
    pub fn segment(&self, text: &str, source: &str) -> Vec<Clause> {
        let mut clauses = Vec::new();
        let mut seen = HashSet::new();

        for section in SECTION_HEADING.split(text) {
            if section.trim().is_empty() {
                continue;
            }

            let mut buffer = String::new();
            for line in section.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                if SUB_ITEM_MARKER.is_match(line) {
                    self.accept(&buffer, source, &mut clauses, &mut seen);
                    buffer = line.to_string();
                } else {
                    if !buffer.is_empty() {
                        buffer.push(' ');
                    }
                    buffer.push_str(line);
                }
            }
            // The trailing buffer of each section is still a candidate.
            self.accept(&buffer, source, &mut clauses, &mut seen);
        }

        tracing::debug!(source, clauses = clauses.len(), "Segmented document");
        clauses
    }

    /// Apply the acceptance policy to one candidate, recording it when it passes.
    fn accept(
        &self,
        candidate: &str,
        source: &str,
        clauses: &mut Vec<Clause>,
        seen: &mut HashSet<String>,
    ) {
        let candidate = candidate.trim();
        // Length is counted in characters, not bytes, so multibyte text is not over-accepted.
        let char_count = candidate.chars().count();
        if candidate.is_empty()
            || char_count < self.min_clause_length
            || clauses.len() >= self.max_clauses
            || BOILERPLATE_SIGNATURE.is_match(candidate)
        {
            return;
        }

        let digest = clause_digest(candidate);
        if !seen.insert(digest) {
            return;
        }

        clauses.push(Clause {
            text: candidate.to_string(),
            source: source.to_string(),
            position: clauses.len(),
            length: char_count,
        });
    }
}

/// Stable digest of clause text used for exact-duplicate detection.
fn clause_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
