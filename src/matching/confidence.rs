//! Fuzzy confidence scoring for pairs whose identifiers are unreliable
//! (OCR'd or manually keyed data).
//!
//! Four field similarities are combined with fixed weights into a 0-100
//! confidence. Reasons and insights are generated deterministically from the
//! same thresholds, so callers and tests can rely on stable wording classes.

use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::types::TransactionRecord;
use crate::utils::format::{format_amount, format_days};

/// Field weights: identifier 35%, amount 30%, date 20%, reference 15%
const IDENTIFIER_WEIGHT: f64 = 0.35;
const AMOUNT_WEIGHT: f64 = 0.30;
const DATE_WEIGHT: f64 = 0.20;
const REFERENCE_WEIGHT: f64 = 0.15;

/// Tolerances for the fuzzy scorer
#[derive(Debug, Clone)]
pub struct ConfidenceConfig {
    /// Percentage difference still considered near-exact for amounts
    pub amount_tolerance_pct: f64,
    /// Days either side of the expected date that still score highly
    pub date_window_days: i64,
    /// Confidence at or above which a pair is auto-matchable
    pub auto_match_threshold: u8,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            amount_tolerance_pct: 1.0,
            date_window_days: 3,
            auto_match_threshold: 90,
        }
    }
}

/// Qualitative classification of a confidence score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceStatus {
    /// At or above the auto-match threshold
    Matched,
    /// Plausibly the same event but with discrepancies
    Mismatched,
    /// Unlikely to be the same event
    NoMatch,
}

/// Per-field similarity scores, each 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldScores {
    pub identifier: u8,
    pub amount: u8,
    pub date: u8,
    pub reference: u8,
}

/// Result of scoring one candidate pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfidence {
    /// Weighted overall confidence, 0-100
    pub confidence: u8,
    pub status: ConfidenceStatus,
    pub scores: FieldScores,
    /// What disagreed, in fixed field order
    pub reasons: Vec<String>,
    /// What the disagreement probably means
    pub insights: Vec<String>,
}

/// Score a candidate pair.
///
/// An identical record compared with itself always scores 100 / `Matched`.
pub fn calculate_match_confidence(
    ours: &TransactionRecord,
    theirs: &TransactionRecord,
    config: &ConfidenceConfig,
) -> MatchConfidence {
    let scores = FieldScores {
        identifier: text_similarity(&ours.transaction_number, &theirs.transaction_number),
        amount: amount_similarity(&ours.amount, &theirs.amount, config.amount_tolerance_pct),
        date: date_similarity(ours, theirs, config.date_window_days),
        reference: text_similarity(&ours.reference, &theirs.reference),
    };

    let weighted = f64::from(scores.identifier) * IDENTIFIER_WEIGHT
        + f64::from(scores.amount) * AMOUNT_WEIGHT
        + f64::from(scores.date) * DATE_WEIGHT
        + f64::from(scores.reference) * REFERENCE_WEIGHT;
    let confidence = weighted.round().clamp(0.0, 100.0) as u8;

    let status = if confidence >= config.auto_match_threshold {
        ConfidenceStatus::Matched
    } else if confidence >= 50 {
        ConfidenceStatus::Mismatched
    } else {
        ConfidenceStatus::NoMatch
    };

    let reasons = build_reasons(ours, theirs, &scores);
    let insights = build_insights(&scores, status, confidence);

    MatchConfidence {
        confidence,
        status,
        scores,
        reasons,
        insights,
    }
}

/// Identifier and reference similarity.
///
/// Equality scores 100 even for two empty values: absence on both sides is
/// agreement, not disagreement. Near-equality after case and whitespace
/// normalization scores 95; everything else maps normalized edit distance
/// through graduated bands.
fn text_similarity(a: &str, b: &str) -> u8 {
    if a == b {
        return 100;
    }
    let normalize = |s: &str| s.to_lowercase().split_whitespace().collect::<String>();
    if normalize(a) == normalize(b) {
        return 95;
    }
    let similarity = strsim::normalized_levenshtein(a, b);
    if similarity > 0.9 {
        90
    } else if similarity > 0.8 {
        75
    } else if similarity > 0.7 {
        60
    } else if similarity > 0.5 {
        40
    } else {
        0
    }
}

/// Amount similarity via percentage difference over the larger magnitude
fn amount_similarity(a: &BigDecimal, b: &BigDecimal, tolerance_pct: f64) -> u8 {
    if a == b {
        return 100;
    }
    let base = a.abs().max(b.abs());
    let Some(base) = base.to_f64().filter(|base| *base > 0.0) else {
        return 0;
    };
    let Some(difference) = (a - b).abs().to_f64() else {
        return 0;
    };
    let pct_difference = difference / base * 100.0;

    if pct_difference <= tolerance_pct {
        95
    } else if pct_difference <= tolerance_pct * 2.0 {
        85
    } else if pct_difference <= tolerance_pct * 3.0 {
        70
    } else if pct_difference <= tolerance_pct * 5.0 {
        50
    } else if pct_difference <= 10.0 {
        30
    } else {
        0
    }
}

/// Date similarity over the issue dates. A date missing on both sides is
/// agreement-by-absence; missing on one side only scores zero.
fn date_similarity(ours: &TransactionRecord, theirs: &TransactionRecord, window_days: i64) -> u8 {
    match (ours.issue_date, theirs.issue_date) {
        (None, None) => 100,
        (Some(a), Some(b)) => {
            let days = (a - b).num_days().abs();
            if days == 0 {
                100
            } else if days <= window_days {
                90
            } else if days <= window_days * 2 {
                75
            } else if days <= window_days * 3 {
                60
            } else if days <= 30 {
                40
            } else if days <= 90 {
                20
            } else {
                0
            }
        }
        _ => 0,
    }
}

fn build_reasons(
    ours: &TransactionRecord,
    theirs: &TransactionRecord,
    scores: &FieldScores,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if scores.identifier < 100 {
        reasons.push(format!(
            "Transaction numbers differ: \"{}\" vs \"{}\"",
            ours.transaction_number, theirs.transaction_number
        ));
    }
    if scores.amount < 100 {
        reasons.push(format!(
            "Amounts differ: {} vs {}",
            format_amount(&ours.amount),
            format_amount(&theirs.amount)
        ));
    }
    if scores.date < 100 {
        match (ours.issue_date, theirs.issue_date) {
            (Some(a), Some(b)) => {
                reasons.push(format!(
                    "Dates are {} apart",
                    format_days((a - b).num_days().abs())
                ));
            }
            _ => reasons.push("Date missing on one side".to_string()),
        }
    }
    if scores.reference < 100 {
        reasons.push(format!(
            "References differ: \"{}\" vs \"{}\"",
            ours.reference, theirs.reference
        ));
    }

    reasons
}

fn build_insights(scores: &FieldScores, status: ConfidenceStatus, confidence: u8) -> Vec<String> {
    let mut insights = Vec::new();

    if scores.identifier >= 90 && scores.amount < 50 {
        insights.push(
            "Same transaction number with a large amount difference; \
             possible partial payment or adjustment"
                .to_string(),
        );
    }
    if scores.amount == 100 && scores.identifier < 60 {
        insights.push(
            "Amounts agree exactly; the transaction number may have been re-keyed".to_string(),
        );
    }
    if scores.date <= 20 && confidence >= 50 {
        insights
            .push("Dates fall in different periods; check for a re-issued document".to_string());
    }

    match status {
        ConfidenceStatus::Matched => {
            insights.push("High confidence; the records describe the same event".to_string());
        }
        ConfidenceStatus::Mismatched => {
            insights.push(
                "Likely the same event recorded with discrepancies; review before accepting"
                    .to_string(),
            );
        }
        ConfidenceStatus::NoMatch => {
            insights.push("Low confidence; treat as unrelated records".to_string());
        }
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordHandle;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn record(number: &str, amount: &str, date: Option<NaiveDate>) -> TransactionRecord {
        TransactionRecord {
            handle: RecordHandle(0),
            transaction_number: number.to_string(),
            transaction_type: "invoice".to_string(),
            amount: BigDecimal::from_str(amount).unwrap(),
            issue_date: date,
            due_date: None,
            status: String::new(),
            reference: String::new(),
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
    fn test_identical_record_scores_100() {
        let config = ConfidenceConfig::default();
        let a = record("INV-1", "1000", NaiveDate::from_ymd_opt(2024, 1, 1));
        let result = calculate_match_confidence(&a, &a.clone(), &config);
        assert_eq!(result.confidence, 100);
        assert_eq!(result.status, ConfidenceStatus::Matched);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_identical_record_without_dates_scores_100() {
        let config = ConfidenceConfig::default();
        let a = record("INV-1", "1000", None);
        let result = calculate_match_confidence(&a, &a.clone(), &config);
        assert_eq!(result.confidence, 100);
    }

    #[test]
    fn test_case_difference_scores_near_exact() {
        let config = ConfidenceConfig::default();
        let a = record("INV-1", "1000", None);
        let b = record("inv-1", "1000", None);
        let result = calculate_match_confidence(&a, &b, &config);
        assert_eq!(result.scores.identifier, 95);
        assert_eq!(result.status, ConfidenceStatus::Matched);
    }

    #[test]
    fn test_unrelated_records_score_no_match() {
        let config = ConfidenceConfig::default();
        let a = record("INV-1", "1000", NaiveDate::from_ymd_opt(2024, 1, 1));
        let b = record("ZZZZZZ-999", "17.50", NaiveDate::from_ymd_opt(2022, 6, 1));
        let result = calculate_match_confidence(&a, &b, &config);
        assert_eq!(result.status, ConfidenceStatus::NoMatch);
        assert!(result.confidence < 50);
    }

    #[test]
    fn test_amount_bands() {
        // 1% tolerance: 0.5% -> 95, 1.5% -> 85, 2.5% -> 70, 4% -> 50, 8% -> 30, 20% -> 0
        let tolerance = 1.0;
        let base = BigDecimal::from(1000);
        let cases = [
            ("1005", 95),
            ("1015", 85),
            ("1025", 70),
            ("1040", 50),
            ("1080", 30),
            ("1200", 0),
        ];
        for (amount, expected) in cases {
            let score =
                amount_similarity(&base, &BigDecimal::from_str(amount).unwrap(), tolerance);
            assert_eq!(score, expected, "amount {amount}");
        }
    }

    #[test]
    fn test_date_bands() {
        let window = 3;
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let cases = [
            (0, 100),
            (2, 90),
            (5, 75),
            (8, 60),
            (25, 40),
            (60, 20),
            (200, 0),
        ];
        for (days, expected) in cases {
            let a = record("INV-1", "1", Some(base));
            let b = record(
                "INV-1",
                "1",
                Some(base + chrono::Duration::days(days)),
            );
            assert_eq!(date_similarity(&a, &b, window), expected, "{days} days");
        }
    }

    #[test]
    fn test_date_missing_on_one_side_scores_zero() {
        let a = record("INV-1", "1", NaiveDate::from_ymd_opt(2024, 1, 1));
        let b = record("INV-1", "1", None);
        assert_eq!(date_similarity(&a, &b, 3), 0);
    }

    #[test]
    fn test_reasons_follow_field_order() {
        let config = ConfidenceConfig::default();
        let mut a = record("INV-1", "1000", NaiveDate::from_ymd_opt(2024, 1, 1));
        a.reference = "PO-1".to_string();
        let mut b = record("INV-2", "900", NaiveDate::from_ymd_opt(2024, 3, 1));
        b.reference = "PO-2".to_string();

        let result = calculate_match_confidence(&a, &b, &config);
        assert_eq!(result.reasons.len(), 4);
        assert!(result.reasons[0].starts_with("Transaction numbers differ"));
        assert!(result.reasons[1].starts_with("Amounts differ"));
        assert!(result.reasons[2].starts_with("Dates are"));
        assert!(result.reasons[3].starts_with("References differ"));
    }

    #[test]
    fn test_partial_payment_insight() {
        let config = ConfidenceConfig::default();
        let a = record("INV-1", "1000", NaiveDate::from_ymd_opt(2024, 1, 1));
        let b = record("INV-1", "400", NaiveDate::from_ymd_opt(2024, 1, 1));
        let result = calculate_match_confidence(&a, &b, &config);
        assert!(result
            .insights
            .iter()
            .any(|insight| insight.contains("partial payment")));
    }

    #[test]
    fn test_custom_auto_match_threshold() {
        let config = ConfidenceConfig {
            auto_match_threshold: 80,
            ..Default::default()
        };
        let a = record("INV-1", "1000", None);
        let b = record("inv-1", "1000", None);
        // 95*0.35 + 100*0.30 + 100*0.20 + 100*0.15 = 98 rounded
        let result = calculate_match_confidence(&a, &b, &config);
        assert_eq!(result.status, ConfidenceStatus::Matched);
    }
}
