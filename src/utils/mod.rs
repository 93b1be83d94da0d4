//! Shared utilities for the reconciliation engine

pub mod format;

pub use format::*;
