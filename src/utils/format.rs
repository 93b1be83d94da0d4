//! Formatting helpers for human-readable messages

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

/// Format a monetary amount to two decimal places
pub fn format_amount(amount: &BigDecimal) -> String {
    amount.round(2).to_string()
}

/// Format an optional date, falling back to a placeholder
pub fn format_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => "an unknown date".to_string(),
    }
}

/// Format a day count with the right plural
pub fn format_days(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_format_amount_two_decimals() {
        assert_eq!(format_amount(&BigDecimal::from_str("1234.5").unwrap()), "1234.50");
        assert_eq!(format_amount(&BigDecimal::from_str("0.006").unwrap()), "0.01");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(
            format_date(NaiveDate::from_ymd_opt(2024, 1, 5)),
            "2024-01-05"
        );
        assert_eq!(format_date(None), "an unknown date");
    }

    #[test]
    fn test_format_days_plural() {
        assert_eq!(format_days(1), "1 day");
        assert_eq!(format_days(3), "3 days");
    }
}
