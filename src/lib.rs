//! # Reconcile Core
//!
//! A reconciliation/matching engine for two independently-sourced ledgers of
//! financial transactions: an our-side receivables set and a
//! counterparty-side payables set.
//!
//! ## Features
//!
//! - **Field normalization**: maps heterogeneous raw record shapes into one
//!   canonical schema, parsing amounts and dates defensively
//! - **Candidate pairing**: exact identifier/reference lookup over
//!   pre-indexed counterparty records
//! - **Match classification**: perfect matches, discrepancy matches, date
//!   divergence annotations, and residual unmatched sets on both sides
//! - **Historical insights**: explains unmatched counterparty records from
//!   an optional archive (already paid, partially paid, voided, draft)
//! - **Totals and variance**: open-item totals with sign-tolerant variance
//! - **Confidence scoring**: weighted fuzzy similarity for sources where
//!   exact identifiers are unreliable
//!
//! The engine is a pure batch computation: it performs no I/O, holds no
//! state between calls, and surfaces only one fatal error (malformed
//! top-level input). Per-record problems are logged via `tracing` and the
//! record proceeds with defaults.
//!
//! ## Quick Start
//!
//! ```rust
//! use reconcile_core::{MatchEngine, ReconciliationRequest};
//! use serde_json::json;
//!
//! let engine = MatchEngine::new();
//! let request = ReconciliationRequest {
//!     our_records: json!([{"id": "INV-1", "amount": 1000, "date": "2024-01-01"}]),
//!     their_records: json!([{"reference": "INV-1", "amount": "1,000.00"}]),
//!     ..Default::default()
//! };
//! let result = engine.reconcile(&request).unwrap();
//! assert_eq!(result.perfect_matches.len(), 1);
//! ```

pub mod history;
pub mod matching;
pub mod normalize;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use matching::*;
pub use normalize::Normalizer;
pub use types::*;
