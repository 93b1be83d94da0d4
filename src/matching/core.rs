//! Match classification: exactness and tolerance rules, status checks,
//! multi-candidate tie-breaks, date-discrepancy annotation, and totals.

use bigdecimal::BigDecimal;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::history;
use crate::matching::candidates::CandidateIndex;
use crate::matching::confidence::{self, ConfidenceConfig, MatchConfidence};
use crate::normalize::Normalizer;
use crate::types::{
    DateMismatch, DateMismatchKind, MatchedPair, MatchingError, MatchingResult,
    ReconciliationRequest, ReconciliationResult, RecordHandle, Totals, TransactionRecord,
    UnmatchedItems,
};

/// Tolerances and windows used by the classifier.
///
/// Defaults reflect cent-level amount tolerance and a one-day allowance on
/// dates before a divergence is reported.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Maximum absolute-amount difference still considered exact
    pub amount_tolerance: BigDecimal,
    /// Date divergence beyond this many days produces a date mismatch
    pub date_mismatch_days: i64,
    /// Half-credit window for the multi-candidate date tie-break
    pub tie_break_window_days: i64,
    /// Settings for the fuzzy confidence scorer
    pub confidence: ConfidenceConfig,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            amount_tolerance: BigDecimal::from(1) / BigDecimal::from(100),
            date_mismatch_days: 1,
            tie_break_window_days: 5,
            confidence: ConfidenceConfig::default(),
        }
    }
}

/// The reconciliation engine.
///
/// A pure batch computation: each call normalizes its inputs, classifies
/// every our-side record exactly once, and returns a fresh result. No state
/// survives between calls.
#[derive(Debug, Clone, Default)]
pub struct MatchEngine {
    config: MatchingConfig,
}

impl MatchEngine {
    /// Create an engine with default tolerances
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with explicit tolerances
    pub fn with_config(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// The engine's active configuration
    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Reconcile two raw record collections.
    ///
    /// The only fatal error is a malformed top-level collection; every
    /// per-record problem is absorbed during normalization.
    pub fn reconcile(
        &self,
        request: &ReconciliationRequest,
    ) -> MatchingResult<ReconciliationResult> {
        let our_raw = require_array(&request.our_records, "our_records")?;
        let their_raw = require_array(&request.their_records, "their_records")?;
        let historical_raw =
            optional_array(request.historical_records.as_ref(), "historical_records")?;

        let mut next_handle = 0;
        let ours = Normalizer::new(request.our_date_format.as_deref())
            .normalize_collection(our_raw, &mut next_handle);
        let theirs = Normalizer::new(request.their_date_format.as_deref())
            .normalize_collection(their_raw, &mut next_handle);
        // The archive shares our side's shape and date conventions.
        let historical = historical_raw
            .map(|records| {
                Normalizer::new(request.our_date_format.as_deref())
                    .normalize_collection(records, &mut next_handle)
            })
            .unwrap_or_default();

        Ok(self.reconcile_normalized(&ours, &theirs, &historical))
    }

    /// Reconcile collections that are already in canonical form
    pub fn reconcile_normalized(
        &self,
        ours: &[TransactionRecord],
        theirs: &[TransactionRecord],
        historical: &[TransactionRecord],
    ) -> ReconciliationResult {
        let index = CandidateIndex::build(theirs);
        let mut their_open: HashSet<RecordHandle> =
            theirs.iter().map(|record| record.handle).collect();

        let mut perfect_matches = Vec::new();
        let mut mismatches = Vec::new();
        let mut date_mismatches = Vec::new();
        let mut our_unmatched = Vec::new();

        for our in ours {
            let candidates = index.candidates_for(our);
            match candidates.as_slice() {
                [] => our_unmatched.push(our.clone()),
                [candidate] => {
                    their_open.remove(&candidate.handle);
                    if self.amounts_exact(our, candidate) && !status_mismatch(our, candidate) {
                        date_mismatches.extend(self.date_mismatches_for(our, candidate));
                        perfect_matches.push(MatchedPair {
                            ours: our.clone(),
                            theirs: (*candidate).clone(),
                        });
                    } else {
                        mismatches.push(MatchedPair {
                            ours: our.clone(),
                            theirs: (*candidate).clone(),
                        });
                    }
                }
                multiple => {
                    // Ambiguous pairing is never auto-accepted, even when one
                    // candidate agrees exactly; the best-scored candidate is
                    // surfaced as a mismatch for review.
                    let best = self.best_candidate(our, multiple);
                    their_open.remove(&best.handle);
                    mismatches.push(MatchedPair {
                        ours: our.clone(),
                        theirs: best.clone(),
                    });
                }
            }
        }

        let their_unmatched: Vec<TransactionRecord> = theirs
            .iter()
            .filter(|record| their_open.contains(&record.handle))
            .cloned()
            .collect();

        debug!(
            perfect = perfect_matches.len(),
            mismatched = mismatches.len(),
            unmatched_ours = our_unmatched.len(),
            unmatched_theirs = their_unmatched.len(),
            "classification complete"
        );

        let historical_insights = history::generate_insights(&their_unmatched, historical);
        let totals = calculate_totals(ours, theirs);

        ReconciliationResult {
            perfect_matches,
            mismatches,
            unmatched_items: UnmatchedItems {
                our_side: our_unmatched,
                their_side: their_unmatched,
            },
            date_mismatches,
            historical_insights,
            totals,
        }
    }

    /// Fuzzy-score a candidate pair with the engine's confidence settings.
    ///
    /// Alternate mode for sources whose identifiers are unreliable; exact
    /// classification via [`reconcile`](Self::reconcile) is unaffected.
    pub fn score_pair(
        &self,
        ours: &TransactionRecord,
        theirs: &TransactionRecord,
    ) -> MatchConfidence {
        confidence::calculate_match_confidence(ours, theirs, &self.config.confidence)
    }

    /// Absolute amounts agree within tolerance and neither side is partially
    /// paid. Absolute values tolerate opposite sign conventions between the
    /// receivable and payable ledgers.
    fn amounts_exact(&self, ours: &TransactionRecord, theirs: &TransactionRecord) -> bool {
        !ours.is_partially_paid
            && !theirs.is_partially_paid
            && (ours.amount.abs() - theirs.amount.abs()).abs() < self.config.amount_tolerance
    }

    /// Date-discrepancy annotations for an otherwise-perfect pair. Issue and
    /// due dates are compared independently; a pair may produce both.
    fn date_mismatches_for(
        &self,
        ours: &TransactionRecord,
        theirs: &TransactionRecord,
    ) -> Vec<DateMismatch> {
        let comparisons = [
            (DateMismatchKind::TransactionDate, ours.issue_date, theirs.issue_date),
            (DateMismatchKind::DueDate, ours.due_date, theirs.due_date),
        ];

        let mut found = Vec::new();
        for (kind, our_date, their_date) in comparisons {
            if let (Some(our_date), Some(their_date)) = (our_date, their_date) {
                let days_difference = (our_date - their_date).num_days().abs();
                if days_difference > self.config.date_mismatch_days {
                    found.push(DateMismatch {
                        ours: ours.clone(),
                        theirs: theirs.clone(),
                        kind,
                        our_date,
                        their_date,
                        days_difference,
                    });
                }
            }
        }
        found
    }

    /// Weighted tie-break across multiple candidates: exact amount counts
    /// most, then each exact key, then date proximity. The first candidate
    /// encountered wins ties.
    fn best_candidate<'a>(
        &self,
        ours: &TransactionRecord,
        candidates: &[&'a TransactionRecord],
    ) -> &'a TransactionRecord {
        let mut best = candidates[0];
        let mut best_score = self.tie_break_score(ours, best);
        for candidate in &candidates[1..] {
            let score = self.tie_break_score(ours, candidate);
            if score > best_score {
                best = *candidate;
                best_score = score;
            }
        }
        best
    }

    fn tie_break_score(&self, ours: &TransactionRecord, candidate: &TransactionRecord) -> f64 {
        let mut score = 0.0;
        if (ours.amount.abs() - candidate.amount.abs()).abs() < self.config.amount_tolerance {
            score += 3.0;
        }
        if !ours.transaction_number.is_empty()
            && ours.transaction_number == candidate.transaction_number
        {
            score += 2.0;
        }
        if !ours.reference.is_empty() && ours.reference == candidate.reference {
            score += 2.0;
        }
        if let (Some(our_date), Some(their_date)) = (ours.issue_date, candidate.issue_date) {
            let days = (our_date - their_date).num_days().abs();
            if days == 0 {
                score += 1.0;
            } else if days <= self.config.tie_break_window_days {
                score += 0.5;
            }
        }
        score
    }
}

/// Paid or voided flags disagree in either direction
fn status_mismatch(ours: &TransactionRecord, theirs: &TransactionRecord) -> bool {
    ours.is_paid != theirs.is_paid || ours.is_voided != theirs.is_voided
}

/// Open-item totals and variance.
///
/// Our side counts only outstanding records; settled and voided items are no
/// longer economically at risk. The counterparty side is summed in full, and
/// the variance takes absolute values twice so opposite sign conventions
/// between the two ledgers cancel out.
pub fn calculate_totals(ours: &[TransactionRecord], theirs: &[TransactionRecord]) -> Totals {
    let our_total: BigDecimal = ours
        .iter()
        .filter(|record| record.is_open())
        .map(|record| &record.amount)
        .sum();
    let their_total: BigDecimal = theirs.iter().map(|record| &record.amount).sum();
    let variance = (&our_total - their_total.abs()).abs();

    Totals {
        our_total,
        their_total,
        variance,
    }
}

fn require_array<'a>(value: &'a Value, field: &str) -> MatchingResult<&'a [Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| MatchingError::InvalidInput(format!("`{field}` must be an array of records")))
}

/// An optional collection may be absent or JSON null; anything else must be
/// an array.
fn optional_array<'a>(
    value: Option<&'a Value>,
    field: &str,
) -> MatchingResult<Option<&'a [Value]>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => require_array(value, field).map(Some),
    }
}
