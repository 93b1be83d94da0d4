//! Historical insight generation: explains why counterparty records are
//! unmatched by correlating them against an archive of previously seen
//! our-side records (closed, voided, or still in draft).

use std::cmp::Reverse;

use crate::types::{
    HistoricalInsight, Insight, InsightKind, InsightSeverity, TransactionRecord,
};
use crate::utils::format::{format_amount, format_date};

/// Correlate unmatched counterparty records against the historical archive.
///
/// Records with no historical counterpart produce no insight; they stay
/// plain unmatched items.
pub fn generate_insights(
    unmatched_theirs: &[TransactionRecord],
    historical: &[TransactionRecord],
) -> Vec<HistoricalInsight> {
    if historical.is_empty() {
        return Vec::new();
    }

    unmatched_theirs
        .iter()
        .filter_map(|their_record| {
            best_historical_match(their_record, historical).map(|historical_record| {
                HistoricalInsight {
                    their_record: their_record.clone(),
                    historical_record: historical_record.clone(),
                    insight: classify(historical_record),
                }
            })
        })
        .collect()
}

/// Pick the most informative historical record sharing an identifier or
/// reference: settled records first, then most recent issue date, dates
/// missing last.
fn best_historical_match<'a>(
    their_record: &TransactionRecord,
    historical: &'a [TransactionRecord],
) -> Option<&'a TransactionRecord> {
    let mut matches: Vec<&TransactionRecord> = historical
        .iter()
        .filter(|candidate| candidate.shares_identifier(their_record))
        .collect();

    matches.sort_by_key(|candidate| {
        (Reverse(candidate.is_paid), Reverse(candidate.issue_date))
    });
    matches.into_iter().next()
}

fn classify(historical: &TransactionRecord) -> Insight {
    if historical.is_paid && !historical.is_partially_paid {
        return Insight {
            kind: InsightKind::AlreadyPaid,
            message: format!(
                "A matching transaction for {} was already paid on {}",
                format_amount(&historical.amount),
                format_date(historical.payment_date),
            ),
            severity: InsightSeverity::Warning,
        };
    }

    if historical.is_partially_paid {
        return Insight {
            kind: InsightKind::PartiallyPaid,
            message: format!(
                "A matching transaction was partially paid: {} of {} settled",
                format_amount(&historical.amount_paid),
                format_amount(&historical.original_amount),
            ),
            severity: InsightSeverity::Warning,
        };
    }

    if historical.is_voided {
        return Insight {
            kind: InsightKind::Voided,
            message: format!(
                "A matching transaction was voided on {}",
                format_date(historical.void_date),
            ),
            severity: InsightSeverity::Error,
        };
    }

    if historical.status.eq_ignore_ascii_case("DRAFT") {
        return Insight {
            kind: InsightKind::Draft,
            message: format!(
                "A matching transaction for {} exists but is still a draft",
                format_amount(&historical.amount),
            ),
            severity: InsightSeverity::Info,
        };
    }

    Insight {
        kind: InsightKind::FoundInHistory,
        message: format!(
            "A matching transaction for {} dated {} was found in history",
            format_amount(&historical.amount),
            format_date(historical.issue_date),
        ),
        severity: InsightSeverity::Info,
    }
}
