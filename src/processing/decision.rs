//! Rule-based claim decision evaluation.
//!
//! A pure function over (entities, ranked clauses, raw query). Clauses are visited in
//! similarity-descending order; exclusion clauses are skipped, waiting-period and
//! accident/maternity branches are terminal, and the generic-coverage branch tentatively
//! approves without ending the loop; a later clause only replaces the tentative decision
//! when its similarity strictly exceeds the best generic similarity seen so far.

use crate::processing::types::{Decision, DecisionStatus, QueryEntities, RankedClause};
use regex::Regex;
use std::sync::LazyLock;

static MONTH_WAITING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\s*-?\s*month.*waiting").expect("waiting pattern"));

static DAY_WAITING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3})\s*-?\s*day.*waiting").expect("waiting pattern"));

const COVERAGE_TERMS: [&str; 4] = ["covered", "benefit", "sum insured", "reimbursement"];
const MATERNITY_TERMS: [&str; 4] = ["maternity", "pregnancy", "childbirth", "well-mother"];

/// Business constants consumed by the evaluator.
#[derive(Debug, Clone, Copy)]
pub struct DecisionRules {
    /// Payout granted on approval.
    pub default_coverage: u64,
    /// Months of policy duration required before maternity coverage applies.
    pub maternity_waiting_months: u32,
}

/// Waiting period stated by a clause, in the granularity the clause used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitingPeriod {
    Months(u32),
    Days(u32),
}

impl WaitingPeriod {
    /// Whether a policy of `duration_months` has not yet served this waiting period.
    fn blocks(self, duration_months: u32) -> bool {
        match self {
            WaitingPeriod::Months(months) => duration_months < months,
            // Day-granularity periods compare against 30-day months.
            WaitingPeriod::Days(days) => duration_months.saturating_mul(30) < days,
        }
    }

    fn describe(self) -> String {
        match self {
            WaitingPeriod::Months(months) => format!("{months}-month"),
            WaitingPeriod::Days(days) => format!("{days}-day"),
        }
    }
}

/// Parse a waiting-period qualifier from lowercased clause text.
fn waiting_period(clause_text: &str) -> Option<WaitingPeriod> {
    if let Some(captures) = MONTH_WAITING.captures(clause_text) {
        return captures[1].parse().ok().map(WaitingPeriod::Months);
    }
    if let Some(captures) = DAY_WAITING.captures(clause_text) {
        return captures[1].parse().ok().map(WaitingPeriod::Days);
    }
    None
}

/// Evaluate an approve/reject decision over the retrieved clauses.
///
/// Confidence in the returned decision equals the similarity of whichever clause produced
/// it, and zero when no clause did. An empty clause list yields the default rejection.
pub fn evaluate(
    entities: &QueryEntities,
    ranked_clauses: &[RankedClause],
    query: &str,
    rules: &DecisionRules,
) -> Decision {
    let procedure = entities
        .procedure
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let policy_duration = entities.policy_duration_months.unwrap_or(0);
    let query_lower = query.to_lowercase();

    let is_accident = procedure.contains("accident") || query_lower.contains("accident");
    let is_maternity = MATERNITY_TERMS
        .iter()
        .any(|term| procedure.contains(term))
        || procedure.contains("baby");

    let mut decision = Decision::default_rejected();
    let mut best_generic = 0.0_f32;

    for ranked in ranked_clauses {
        let clause_text = ranked.clause.text.to_lowercase();

        // Exclusion clauses carry no grant of coverage.
        if clause_text.contains("excluded") || clause_text.contains("not covered") {
            continue;
        }

        if let Some(period) = waiting_period(&clause_text) {
            if period.blocks(policy_duration) && !is_accident {
                return Decision {
                    status: DecisionStatus::Rejected,
                    amount: None,
                    justification: format!(
                        "Policy has {} waiting period. Current duration: {policy_duration} months.",
                        period.describe()
                    ),
                    confidence: ranked.similarity,
                };
            }
        }

        if COVERAGE_TERMS.iter().any(|term| clause_text.contains(term)) {
            if is_accident && clause_text.contains("accident") && waiting_period(&clause_text).is_none()
            {
                return Decision {
                    status: DecisionStatus::Approved,
                    amount: Some(rules.default_coverage),
                    justification: "Accident coverage applies. No waiting period required."
                        .to_string(),
                    confidence: ranked.similarity,
                };
            }

            if is_maternity
                && MATERNITY_TERMS.iter().any(|term| clause_text.contains(term))
                && policy_duration >= rules.maternity_waiting_months
            {
                return Decision {
                    status: DecisionStatus::Approved,
                    amount: Some(rules.default_coverage),
                    justification: "Maternity coverage applies after waiting period.".to_string(),
                    confidence: ranked.similarity,
                };
            }

            if ranked.similarity > best_generic {
                best_generic = ranked.similarity;
                decision = Decision {
                    status: DecisionStatus::Approved,
                    amount: Some(rules.default_coverage),
                    justification: "Coverage found in policy terms.".to_string(),
                    confidence: ranked.similarity,
                };
            }
        }
    }

    decision
}
