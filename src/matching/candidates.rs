//! Candidate pairing: exact identifier and reference lookups.
//!
//! Fuzziness is deliberately confined to the confidence scorer; this stage
//! only answers "which counterparty records share an exact key with this
//! record".

use std::collections::{HashMap, HashSet};

use crate::types::TransactionRecord;

/// Counterparty records pre-indexed by `transaction_number` and by
/// `reference` for near-linear candidate lookup.
///
/// A bucket with more than one entry is what signals the multi-candidate
/// classification path, so buckets keep every record rather than the first.
#[derive(Debug)]
pub struct CandidateIndex<'a> {
    records: &'a [TransactionRecord],
    by_number: HashMap<&'a str, Vec<usize>>,
    by_reference: HashMap<&'a str, Vec<usize>>,
}

impl<'a> CandidateIndex<'a> {
    /// Build the index over one side's records. Empty keys are never indexed.
    pub fn build(records: &'a [TransactionRecord]) -> Self {
        let mut by_number: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut by_reference: HashMap<&str, Vec<usize>> = HashMap::new();

        for (position, record) in records.iter().enumerate() {
            if !record.transaction_number.is_empty() {
                by_number
                    .entry(record.transaction_number.as_str())
                    .or_default()
                    .push(position);
            }
            if !record.reference.is_empty() {
                by_reference
                    .entry(record.reference.as_str())
                    .or_default()
                    .push(position);
            }
        }

        Self {
            records,
            by_number,
            by_reference,
        }
    }

    /// Every indexed record whose `transaction_number` or `reference`
    /// exactly equals the given record's corresponding key (case-sensitive),
    /// in input order, de-duplicated when a record matches on both keys.
    ///
    /// Keys are matched cross-wise as well: a counterparty record whose
    /// `reference` carries our transaction number still pairs.
    pub fn candidates_for(&self, record: &TransactionRecord) -> Vec<&'a TransactionRecord> {
        let mut positions = Vec::new();

        for key in [
            record.transaction_number.as_str(),
            record.reference.as_str(),
        ] {
            if key.is_empty() {
                continue;
            }
            if let Some(matches) = self.by_number.get(key) {
                positions.extend_from_slice(matches);
            }
            if let Some(matches) = self.by_reference.get(key) {
                positions.extend_from_slice(matches);
            }
        }

        positions.sort_unstable();
        let mut seen = HashSet::new();
        positions
            .into_iter()
            .filter(|position| seen.insert(*position))
            .map(|position| &self.records[position])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordHandle;
    use bigdecimal::BigDecimal;

    fn record(handle: usize, number: &str, reference: &str) -> TransactionRecord {
        TransactionRecord {
            handle: RecordHandle(handle),
            transaction_number: number.to_string(),
            transaction_type: String::new(),
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
    fn test_no_candidates() {
        let theirs = vec![record(0, "INV-1", "")];
        let index = CandidateIndex::build(&theirs);
        assert!(index.candidates_for(&record(9, "INV-2", "")).is_empty());
    }

    #[test]
    fn test_match_by_number() {
        let theirs = vec![record(0, "INV-1", ""), record(1, "INV-2", "")];
        let index = CandidateIndex::build(&theirs);
        let candidates = index.candidates_for(&record(9, "INV-2", ""));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].handle, RecordHandle(1));
    }

    #[test]
    fn test_match_number_against_reference() {
        // Their side recorded our invoice number in its reference field.
        let theirs = vec![record(0, "BILL-77", "INV-1")];
        let index = CandidateIndex::build(&theirs);
        let candidates = index.candidates_for(&record(9, "INV-1", ""));
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_case_sensitive_exact_match_only() {
        let theirs = vec![record(0, "inv-1", "")];
        let index = CandidateIndex::build(&theirs);
        assert!(index.candidates_for(&record(9, "INV-1", "")).is_empty());
    }

    #[test]
    fn test_empty_keys_never_match() {
        let theirs = vec![record(0, "", "")];
        let index = CandidateIndex::build(&theirs);
        assert!(index.candidates_for(&record(9, "", "")).is_empty());
    }

    #[test]
    fn test_duplicate_bucket_yields_multiple_candidates() {
        let theirs = vec![
            record(0, "INV-1", ""),
            record(1, "INV-1", ""),
            record(2, "INV-2", ""),
        ];
        let index = CandidateIndex::build(&theirs);
        let candidates = index.candidates_for(&record(9, "INV-1", ""));
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_record_matching_both_keys_deduplicated() {
        let theirs = vec![record(0, "INV-1", "INV-1")];
        let index = CandidateIndex::build(&theirs);
        let candidates = index.candidates_for(&record(9, "INV-1", "INV-1"));
        assert_eq!(candidates.len(), 1);
    }
}
