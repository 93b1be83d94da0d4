//! Field normalization: maps heterogeneous raw record shapes into the
//! canonical [`TransactionRecord`] schema.
//!
//! Source systems disagree on field naming (`transactionNumber`,
//! `invoice_number`, `id`), amount formatting (currency symbols, thousands
//! separators, parenthesised negatives) and date formats. The normalizer
//! resolves all of that defensively: per-record problems are logged and the
//! record proceeds with a default value, never aborting the batch.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::types::{RecordHandle, TransactionRecord};

/// Canonical fields the normalizer extracts from raw records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    TransactionNumber,
    TransactionType,
    Amount,
    IssueDate,
    DueDate,
    Status,
    Reference,
    IsPaid,
    IsVoided,
    IsPartiallyPaid,
    OriginalAmount,
    AmountPaid,
    PaymentDate,
    VoidDate,
}

/// Known field-name aliases, keyed by their squashed form (lowercase with
/// separators removed), so `transactionNumber`, `transaction_number` and
/// `Transaction-Number` all resolve identically. Applied per record; the
/// first record of a collection gets no special treatment.
const FIELD_ALIASES: &[(&str, Field)] = &[
    ("transactionnumber", Field::TransactionNumber),
    ("invoicenumber", Field::TransactionNumber),
    ("documentnumber", Field::TransactionNumber),
    ("number", Field::TransactionNumber),
    ("id", Field::TransactionNumber),
    ("transactiontype", Field::TransactionType),
    ("type", Field::TransactionType),
    ("amount", Field::Amount),
    ("total", Field::Amount),
    ("totalamount", Field::Amount),
    ("grossamount", Field::Amount),
    ("issuedate", Field::IssueDate),
    ("invoicedate", Field::IssueDate),
    ("transactiondate", Field::IssueDate),
    ("date", Field::IssueDate),
    ("duedate", Field::DueDate),
    ("status", Field::Status),
    ("state", Field::Status),
    ("reference", Field::Reference),
    ("referencenumber", Field::Reference),
    ("ref", Field::Reference),
    ("ispaid", Field::IsPaid),
    ("paid", Field::IsPaid),
    ("isvoided", Field::IsVoided),
    ("voided", Field::IsVoided),
    ("ispartiallypaid", Field::IsPartiallyPaid),
    ("partiallypaid", Field::IsPartiallyPaid),
    ("originalamount", Field::OriginalAmount),
    ("amountpaid", Field::AmountPaid),
    ("paidamount", Field::AmountPaid),
    ("paymentdate", Field::PaymentDate),
    ("paiddate", Field::PaymentDate),
    ("voiddate", Field::VoidDate),
    ("voideddate", Field::VoidDate),
];

/// Currency symbols stripped before amount parsing
const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '₹', '¥'];

/// Formats attempted by the generic date-parse fallback, in order
const GENERIC_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
];

/// Datetime formats attempted when the value carries a time component
const GENERIC_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Normalizer for one collection, carrying that collection's date-format hint
#[derive(Debug, Clone)]
pub struct Normalizer {
    date_format: String,
}

impl Normalizer {
    /// Default hint applied when a source supplies none
    pub const DEFAULT_DATE_FORMAT: &'static str = "YYYY-MM-DD";

    /// Create a normalizer with a date-format hint such as `"DD/MM/YYYY"`
    pub fn new(date_format: Option<&str>) -> Self {
        Self {
            date_format: date_format.unwrap_or(Self::DEFAULT_DATE_FORMAT).to_string(),
        }
    }

    /// Normalize a collection of raw records.
    ///
    /// Elements that are not JSON objects, or that carry neither an
    /// identifier nor a parseable amount, are dropped with a log entry;
    /// every other element yields one canonical record. Handles are drawn
    /// from `next_handle`, which is shared across collections so handles
    /// stay unique for the whole run.
    pub fn normalize_collection(
        &self,
        records: &[Value],
        next_handle: &mut usize,
    ) -> Vec<TransactionRecord> {
        let alias_map: HashMap<&str, Field> = FIELD_ALIASES.iter().copied().collect();

        let mut normalized = Vec::with_capacity(records.len());
        for raw in records {
            let Some(object) = raw.as_object() else {
                debug!("dropping non-object record from input collection");
                continue;
            };

            // Resolve aliases for this record only; a collection may mix shapes.
            let mut fields: HashMap<Field, &Value> = HashMap::new();
            for (key, value) in object {
                if let Some(field) = alias_map.get(squash_key(key).as_str()) {
                    fields.entry(*field).or_insert(value);
                }
            }

            if let Some(record) = self.normalize_record(&fields, next_handle) {
                normalized.push(record);
            }
        }
        normalized
    }

    fn normalize_record(
        &self,
        fields: &HashMap<Field, &Value>,
        next_handle: &mut usize,
    ) -> Option<TransactionRecord> {
        let transaction_number = string_field(fields, Field::TransactionNumber);
        let reference = string_field(fields, Field::Reference);
        let raw_amount = fields.get(&Field::Amount).copied();
        let parsed_amount = raw_amount.and_then(parse_amount);

        // A record with neither an identifier nor an amount cannot
        // participate in matching or totals; drop it rather than pollute the
        // unmatched sets.
        if transaction_number.is_empty() && reference.is_empty() && parsed_amount.is_none() {
            debug!("dropping record with neither identifier nor amount");
            return None;
        }

        let amount = match (raw_amount, parsed_amount) {
            (_, Some(amount)) => amount,
            (Some(raw), None) => {
                warn!(value = %raw, "unparseable amount, defaulting to 0");
                BigDecimal::from(0)
            }
            (None, None) => BigDecimal::from(0),
        };

        let status = string_field(fields, Field::Status);
        let status_upper = status.to_uppercase();

        let is_paid = bool_field(fields, Field::IsPaid).unwrap_or(status_upper == "PAID");
        let is_voided = bool_field(fields, Field::IsVoided).unwrap_or(status_upper == "VOIDED");
        let is_partially_paid = bool_field(fields, Field::IsPartiallyPaid).unwrap_or(false);

        let handle = RecordHandle(*next_handle);
        *next_handle += 1;

        Some(TransactionRecord {
            handle,
            transaction_number,
            transaction_type: string_field(fields, Field::TransactionType),
            amount,
            issue_date: self.date_field(fields, Field::IssueDate),
            due_date: self.date_field(fields, Field::DueDate),
            status,
            reference,
            is_paid,
            is_voided,
            is_partially_paid,
            original_amount: self.amount_field(fields, Field::OriginalAmount),
            amount_paid: self.amount_field(fields, Field::AmountPaid),
            payment_date: self.date_field(fields, Field::PaymentDate),
            void_date: self.date_field(fields, Field::VoidDate),
        })
    }

    fn amount_field(&self, fields: &HashMap<Field, &Value>, field: Field) -> BigDecimal {
        match fields.get(&field) {
            Some(value) => parse_amount(value).unwrap_or_else(|| {
                warn!(value = %value, "unparseable amount, defaulting to 0");
                BigDecimal::from(0)
            }),
            None => BigDecimal::from(0),
        }
    }

    fn date_field(&self, fields: &HashMap<Field, &Value>, field: Field) -> Option<NaiveDate> {
        let value = fields.get(&field)?;
        let text = value.as_str()?.trim();
        if text.is_empty() {
            return None;
        }
        let parsed = self.parse_date(text);
        if parsed.is_none() {
            warn!(value = text, "unparseable date, defaulting to null");
        }
        parsed
    }

    /// Date parsing fallback chain; first success wins, exhaustion yields
    /// `None` rather than an error.
    fn parse_date(&self, text: &str) -> Option<NaiveDate> {
        // Day-first sources are the ambiguous case, so the hint takes
        // priority over everything else.
        if self.date_format == "DD/MM/YYYY" && text.contains('/') {
            if let Some(date) = parse_day_first(text) {
                return Some(date);
            }
        }

        // Already ISO, possibly with a trailing time component.
        if looks_like_iso(text) {
            if let Ok(date) = NaiveDate::parse_from_str(&text[..10], "%Y-%m-%d") {
                return Some(date);
            }
        }

        // The supplied hint, translated to chrono tokens.
        if let Ok(date) = NaiveDate::parse_from_str(text, &hint_to_chrono(&self.date_format)) {
            return Some(date);
        }

        // Generic fallbacks.
        for format in GENERIC_DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(text, format) {
                return Some(date);
            }
        }
        for format in GENERIC_DATETIME_FORMATS {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
                return Some(datetime.date());
            }
        }

        None
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Lowercase a key and strip separators so naming-convention variants
/// collapse to one lookup key
fn squash_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn string_field(fields: &HashMap<Field, &Value>, field: Field) -> String {
    match fields.get(&field) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn bool_field(fields: &HashMap<Field, &Value>, field: Field) -> Option<bool> {
    match fields.get(&field)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

/// Parse an amount from a JSON number or a formatted string.
///
/// Strings may carry currency symbols, thousands separators and whitespace;
/// a parenthesis-wrapped value is treated as negative. Returns `None` when
/// nothing numeric can be recovered.
pub fn parse_amount(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => parse_amount_str(s),
        _ => None,
    }
}

fn parse_amount_str(text: &str) -> Option<BigDecimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (body, negate) = match trimmed.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (inner, true),
        None => (trimmed, false),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();

    let amount = BigDecimal::from_str(&cleaned).ok()?;
    if negate {
        Some(-amount.abs())
    } else {
        Some(amount)
    }
}

/// Explicit day/month/year split for `DD/MM/YYYY` sources
fn parse_day_first(text: &str) -> Option<NaiveDate> {
    let mut parts = text.splitn(3, '/');
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().get(..4).unwrap_or("").parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Whether the value starts with a `YYYY-MM-DD` prefix
fn looks_like_iso(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}

/// Translate `DD`/`MM`/`YYYY` hint tokens into chrono format codes
fn hint_to_chrono(hint: &str) -> String {
    hint.replace("YYYY", "%Y").replace("DD", "%d").replace("MM", "%m")
}
