//! Candidate pairing, match classification, and confidence scoring

pub mod candidates;
pub mod confidence;
mod core;

pub use candidates::CandidateIndex;
pub use confidence::{
    calculate_match_confidence, ConfidenceConfig, ConfidenceStatus, FieldScores, MatchConfidence,
};
pub use core::{calculate_totals, MatchEngine, MatchingConfig};
