//! Core types and data structures for the reconciliation engine

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable index assigned to each record at normalization time.
///
/// Unmatched-pool membership is tracked by handle rather than by value
/// equality, so records without identifiers can still be removed from the
/// pools unambiguously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordHandle(pub usize);

/// Canonical transaction record produced by the normalizer.
///
/// Both ledgers are mapped into this one shape regardless of the field
/// naming and value formatting used by the source system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Arena handle, unique across all collections in one reconciliation run
    pub handle: RecordHandle,
    /// Primary matching identifier; may be empty
    pub transaction_number: String,
    /// Free-text transaction kind (invoice, credit note, etc.)
    pub transaction_type: String,
    /// Signed amount; unparseable inputs normalize to zero
    pub amount: BigDecimal,
    /// Transaction/issue date, calendar-day granularity
    pub issue_date: Option<NaiveDate>,
    /// Due date, calendar-day granularity
    pub due_date: Option<NaiveDate>,
    /// Free-text status as supplied by the source
    pub status: String,
    /// Secondary matching identifier
    pub reference: String,
    /// Whether the record is settled
    pub is_paid: bool,
    /// Whether the record was voided
    pub is_voided: bool,
    /// Whether the record is partially settled
    pub is_partially_paid: bool,
    /// Original amount before partial payments
    pub original_amount: BigDecimal,
    /// Amount settled so far (meaningful when partially paid)
    pub amount_paid: BigDecimal,
    /// Date the record was settled, if known
    pub payment_date: Option<NaiveDate>,
    /// Date the record was voided, if known
    pub void_date: Option<NaiveDate>,
}

impl TransactionRecord {
    /// Whether the record is an open item (neither paid nor voided)
    pub fn is_open(&self) -> bool {
        !self.is_paid && !self.is_voided
    }

    /// Whether this record shares an exact identifier or reference with
    /// another. Comparison is case-sensitive and empty keys never match.
    pub fn shares_identifier(&self, other: &TransactionRecord) -> bool {
        (!self.transaction_number.is_empty()
            && self.transaction_number == other.transaction_number)
            || (!self.reference.is_empty() && self.reference == other.reference)
    }
}

/// A pair of records classified together, either as a perfect match or as a
/// match with discrepancies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    /// Our-side (receivables) record
    pub ours: TransactionRecord,
    /// Counterparty-side (payables) record
    pub theirs: TransactionRecord,
}

/// Which date field diverged on an otherwise-matched pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateMismatchKind {
    /// Issue/transaction dates differ
    TransactionDate,
    /// Due dates differ
    DueDate,
}

/// Additive annotation on a matched pair whose dates diverge by more than a
/// day; the pair still counts as a perfect match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateMismatch {
    pub ours: TransactionRecord,
    pub theirs: TransactionRecord,
    pub kind: DateMismatchKind,
    pub our_date: NaiveDate,
    pub their_date: NaiveDate,
    /// Absolute difference in calendar days
    pub days_difference: i64,
}

/// Records with no candidate counterpart on the opposite side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedItems {
    pub our_side: Vec<TransactionRecord>,
    pub their_side: Vec<TransactionRecord>,
}

/// Why an unmatched counterparty record has no open counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    /// A matching record on our side was already settled
    AlreadyPaid,
    /// A matching record on our side is partially settled
    PartiallyPaid,
    /// A matching record on our side was voided
    Voided,
    /// A matching record on our side is still a draft
    Draft,
    /// A matching record exists in history with no more specific explanation
    FoundInHistory,
}

/// Severity attached to a historical insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSeverity {
    Info,
    Warning,
    Error,
}

/// Explanation derived from the historical archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    /// Human-readable explanation with formatted currency and dates
    pub message: String,
    pub severity: InsightSeverity,
}

/// Links an unmatched counterparty record to the historical record that
/// explains it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalInsight {
    pub their_record: TransactionRecord,
    pub historical_record: TransactionRecord,
    pub insight: Insight,
}

/// Open-item totals and the variance between the two ledgers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of our-side open items only (paid and voided records are excluded)
    pub our_total: BigDecimal,
    /// Sum of all counterparty-side records
    pub their_total: BigDecimal,
    /// `|our_total - |their_total||`, tolerant of opposite sign conventions
    pub variance: BigDecimal,
}

/// Complete result of one reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Identifier and amount agree within tolerance, no status divergence
    pub perfect_matches: Vec<MatchedPair>,
    /// Paired but failing exactness, tie-break, or status checks
    pub mismatches: Vec<MatchedPair>,
    /// Records with no counterpart at all
    pub unmatched_items: UnmatchedItems,
    /// Date divergence annotations on otherwise-matched pairs
    pub date_mismatches: Vec<DateMismatch>,
    /// Explanations for unmatched counterparty records
    pub historical_insights: Vec<HistoricalInsight>,
    pub totals: Totals,
}

/// Raw inputs for one reconciliation run.
///
/// Collections arrive as loosely-typed JSON values; the engine validates the
/// top-level shape and normalizes every element. Date format hints use
/// `DD`/`MM`/`YYYY` tokens, e.g. `"DD/MM/YYYY"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationRequest {
    pub our_records: Value,
    pub their_records: Value,
    /// Optional archive of previously closed our-side records
    pub historical_records: Option<Value>,
    pub our_date_format: Option<String>,
    pub their_date_format: Option<String>,
}

/// Errors surfaced at the engine boundary.
///
/// Per-record problems never reach this type; they are logged and the record
/// proceeds with defaults, or is dropped when it carries neither an
/// identifier nor an amount.
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for reconciliation operations
pub type MatchingResult<T> = Result<T, MatchingError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn record(number: &str, reference: &str) -> TransactionRecord {
        TransactionRecord {
            handle: RecordHandle(0),
            transaction_number: number.to_string(),
            transaction_type: "invoice".to_string(),
            amount: BigDecimal::from(100),
            issue_date: None,
            due_date: None,
            status: String::new(),
            reference: reference.to_string(),
            is_paid: false,
            is_voided: false,
            is_partially_paid: false,
            original_amount: BigDecimal::from(0),
            amount_paid: BigDecimal::from(0),
            payment_date: None,
            void_date: None,
        }
    }

    #[test]
    fn test_shares_identifier_by_number() {
        let a = record("INV-1", "");
        let b = record("INV-1", "PO-9");
        assert!(a.shares_identifier(&b));
    }

    #[test]
    fn test_shares_identifier_by_reference() {
        let a = record("INV-1", "PO-9");
        let b = record("INV-2", "PO-9");
        assert!(a.shares_identifier(&b));
    }

    #[test]
    fn test_empty_identifiers_never_match() {
        let a = record("", "");
        let b = record("", "");
        assert!(!a.shares_identifier(&b));
    }

    #[test]
    fn test_is_open() {
        let mut a = record("INV-1", "");
        assert!(a.is_open());
        a.is_paid = true;
        assert!(!a.is_open());
        a.is_paid = false;
        a.is_voided = true;
        assert!(!a.is_open());
    }
}
