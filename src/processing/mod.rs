//! Claim pipeline: normalization, segmentation, entity extraction, and decision rules.

pub mod decision;
pub mod entities;
pub mod normalize;
pub mod segment;
mod service;
pub mod types;

pub use service::{ClaimApi, ClaimService};
pub use types::{
    ClaimError, ClaimResult, Clause, Decision, DecisionStatus, Gender, QueryDetails,
    QueryEntities, RankedClause, RelevantClause,
};
