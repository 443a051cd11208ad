use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing claim-processing activity.
#[derive(Default)]
pub struct ClaimMetrics {
    claims_processed: AtomicU64,
    documents_parsed: AtomicU64,
    clauses_segmented: AtomicU64,
}

impl ClaimMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a parsed document and the number of clauses it produced.
    pub fn record_document(&self, clause_count: u64) {
        self.documents_parsed.fetch_add(1, Ordering::Relaxed);
        self.clauses_segmented
            .fetch_add(clause_count, Ordering::Relaxed);
    }

    /// Record a completed claim evaluation.
    pub fn record_claim(&self) {
        self.claims_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            claims_processed: self.claims_processed.load(Ordering::Relaxed),
            documents_parsed: self.documents_parsed.load(Ordering::Relaxed),
            clauses_segmented: self.clauses_segmented.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of processing counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of claims evaluated since startup.
    pub claims_processed: u64,
    /// Number of policy documents parsed since startup.
    pub documents_parsed: u64,
    /// Total clause count accepted across all parsed documents.
    pub clauses_segmented: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_clauses() {
        let metrics = ClaimMetrics::new();
        metrics.record_document(12);
        metrics.record_document(3);
        metrics.record_claim();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_parsed, 2);
        assert_eq!(snapshot.clauses_segmented, 15);
        assert_eq!(snapshot.claims_processed, 1);
    }

    #[test]
    fn snapshot_starts_at_zero() {
        let metrics = ClaimMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.claims_processed, 0);
        assert_eq!(snapshot.documents_parsed, 0);
        assert_eq!(snapshot.clauses_segmented, 0);
    }
}
