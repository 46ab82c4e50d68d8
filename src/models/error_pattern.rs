//! Aggregated failure signatures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Category;

/// A recurring failure signature with its fix suggestion.
///
/// `pattern` is the natural key. The store replaces the whole row on upsert
/// and never increments `frequency` on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPattern {
    pub pattern: String,
    pub error_type: Category,
    pub frequency: u64,
    pub last_seen: DateTime<Utc>,
    pub suggested_fix: String,
}
